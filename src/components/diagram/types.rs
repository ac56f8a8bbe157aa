use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::SpecError;

/// Flow direction of a layered layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
	/// Top to bottom.
	#[default]
	#[serde(alias = "TB", alias = "UD")]
	TD,
	/// Bottom to top.
	#[serde(alias = "DU")]
	BT,
	/// Left to right.
	LR,
	/// Right to left.
	RL,
}

impl Direction {
	/// Layers advance along the x axis.
	pub fn is_horizontal(self) -> bool {
		matches!(self, Direction::LR | Direction::RL)
	}

	/// Layers advance towards negative coordinates.
	pub fn is_reversed(self) -> bool {
		matches!(self, Direction::BT | Direction::RL)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeShape {
	#[default]
	Rect,
	Rounded,
	Stadium,
	Diamond,
	Circle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgeKind {
	#[default]
	Arrow,
	Open,
	DottedArrow,
	DottedOpen,
	ThickArrow,
	ThickOpen,
}

impl EdgeKind {
	pub fn has_arrow(self) -> bool {
		matches!(
			self,
			EdgeKind::Arrow | EdgeKind::DottedArrow | EdgeKind::ThickArrow
		)
	}

	pub fn is_dotted(self) -> bool {
		matches!(self, EdgeKind::DottedArrow | EdgeKind::DottedOpen)
	}

	pub fn is_thick(self) -> bool {
		matches!(self, EdgeKind::ThickArrow | EdgeKind::ThickOpen)
	}
}

/// Colours applied to nodes that reference a style class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassStyle {
	pub fill: Option<String>,
	pub stroke: Option<String>,
	pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeSpec {
	pub id: String,
	pub label: String,
	pub class: Option<String>,
	pub shape: NodeShape,
	pub position: Option<(f64, f64)>,
}

impl NodeSpec {
	pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			class: None,
			shape: NodeShape::default(),
			position: None,
		}
	}

	pub fn class(mut self, class: impl Into<String>) -> Self {
		self.class = Some(class.into());
		self
	}

	pub fn shape(mut self, shape: NodeShape) -> Self {
		self.shape = shape;
		self
	}

	pub fn at(mut self, x: f64, y: f64) -> Self {
		self.position = Some((x, y));
		self
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSpec {
	pub source: String,
	pub target: String,
	pub label: Option<String>,
	pub kind: EdgeKind,
}

/// An immutable node/edge declaration. Construct it with [`GraphSpec::builder`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphSpec {
	direction: Direction,
	nodes: IndexMap<String, NodeSpec>,
	edges: Vec<EdgeSpec>,
	classes: IndexMap<String, ClassStyle>,
}

impl GraphSpec {
	pub fn builder() -> GraphSpecBuilder {
		GraphSpecBuilder::default()
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	/// Nodes in declaration order.
	pub fn nodes(&self) -> impl ExactSizeIterator<Item = &NodeSpec> {
		self.nodes.values()
	}

	pub fn node(&self, id: &str) -> Option<&NodeSpec> {
		self.nodes.get(id)
	}

	pub fn node_index(&self, id: &str) -> Option<usize> {
		self.nodes.get_index_of(id)
	}

	pub fn edges(&self) -> &[EdgeSpec] {
		&self.edges
	}

	pub fn class_style(&self, class: &str) -> Option<&ClassStyle> {
		self.classes.get(class)
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn has_positions(&self) -> bool {
		self.nodes.values().any(|n| n.position.is_some())
	}
}

#[derive(Clone, Debug, Default)]
pub struct GraphSpecBuilder {
	direction: Direction,
	nodes: Vec<NodeSpec>,
	edges: Vec<EdgeSpec>,
	classes: IndexMap<String, ClassStyle>,
}

impl GraphSpecBuilder {
	pub fn direction(mut self, direction: Direction) -> Self {
		self.direction = direction;
		self
	}

	pub fn node(mut self, node: NodeSpec) -> Self {
		self.nodes.push(node);
		self
	}

	pub fn edge(self, source: impl Into<String>, target: impl Into<String>) -> Self {
		self.edge_with(source, target, None, EdgeKind::Arrow)
	}

	pub fn edge_with(
		mut self,
		source: impl Into<String>,
		target: impl Into<String>,
		label: Option<String>,
		kind: EdgeKind,
	) -> Self {
		self.edges.push(EdgeSpec {
			source: source.into(),
			target: target.into(),
			label,
			kind,
		});
		self
	}

	pub fn class(mut self, name: impl Into<String>, style: ClassStyle) -> Self {
		self.classes.insert(name.into(), style);
		self
	}

	/// Validates identifiers and edge endpoints.
	pub fn build(self) -> Result<GraphSpec, SpecError> {
		let mut nodes = IndexMap::with_capacity(self.nodes.len());
		for node in self.nodes {
			if node.id.is_empty() {
				return Err(SpecError::EmptyId);
			}
			if nodes.contains_key(&node.id) {
				return Err(SpecError::DuplicateNode(node.id));
			}
			nodes.insert(node.id.clone(), node);
		}

		for edge in &self.edges {
			for endpoint in [&edge.source, &edge.target] {
				if !nodes.contains_key(endpoint) {
					return Err(SpecError::UnknownEndpoint {
						from: edge.source.clone(),
						to: edge.target.clone(),
						missing: endpoint.clone(),
					});
				}
			}
		}

		Ok(GraphSpec {
			direction: self.direction,
			nodes,
			edges: self.edges,
			classes: self.classes,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn build_keeps_declaration_order() {
		let spec = GraphSpec::builder()
			.node(NodeSpec::new("b", "B"))
			.node(NodeSpec::new("a", "A"))
			.edge("b", "a")
			.build()
			.unwrap();
		let ids: Vec<_> = spec.nodes().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["b", "a"]);
		assert_eq!(spec.node_index("a"), Some(1));
	}

	#[test]
	fn build_rejects_duplicates_and_dangling_edges() {
		let dup = GraphSpec::builder()
			.node(NodeSpec::new("a", "A"))
			.node(NodeSpec::new("a", "again"))
			.build();
		assert_eq!(dup, Err(SpecError::DuplicateNode("a".into())));

		let dangling = GraphSpec::builder()
			.node(NodeSpec::new("a", "A"))
			.edge("a", "z")
			.build();
		assert!(matches!(
			dangling,
			Err(SpecError::UnknownEndpoint { ref missing, .. }) if missing == "z"
		));

		let empty = GraphSpec::builder().node(NodeSpec::new("", "x")).build();
		assert_eq!(empty, Err(SpecError::EmptyId));
	}

	#[test]
	fn edge_kind_flags() {
		assert!(EdgeKind::ThickArrow.has_arrow() && EdgeKind::ThickArrow.is_thick());
		assert!(!EdgeKind::DottedOpen.has_arrow() && EdgeKind::DottedOpen.is_dotted());
	}
}
