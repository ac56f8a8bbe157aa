use std::collections::HashMap;

/// Prefix of the DOM ids given to rendered nodes.
pub const ELEMENT_ID_PREFIX: &str = "flowchart-";

/// Dense index of a node inside one rendered scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(pub(crate) usize);

/// A rendered element paired with the graph identifier it was drawn for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedNodeHandle {
	pub key: ElementKey,
	pub node_id: String,
}

impl RenderedNodeHandle {
	pub fn element_id(&self) -> String {
		format!("{ELEMENT_ID_PREFIX}{}-{}", self.node_id, self.key.0)
	}
}

/// Everything a binder needs from one render: which element stands for which node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderHandle {
	generation: u64,
	nodes: Vec<RenderedNodeHandle>,
	by_element_id: HashMap<String, ElementKey>,
}

impl RenderHandle {
	pub(crate) fn new<'a>(generation: u64, ids: impl IntoIterator<Item = &'a str>) -> Self {
		let nodes: Vec<RenderedNodeHandle> = ids
			.into_iter()
			.enumerate()
			.map(|(i, id)| RenderedNodeHandle {
				key: ElementKey(i),
				node_id: id.to_owned(),
			})
			.collect();
		let by_element_id = nodes.iter().map(|n| (n.element_id(), n.key)).collect();
		Self {
			generation,
			nodes,
			by_element_id,
		}
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn nodes(&self) -> &[RenderedNodeHandle] {
		&self.nodes
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[cfg(test)]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	#[cfg(test)]
	pub fn node_id(&self, key: ElementKey) -> Option<&str> {
		self.nodes.get(key.0).map(|n| n.node_id.as_str())
	}

	pub fn key_of(&self, node_id: &str) -> Option<ElementKey> {
		self.nodes.iter().find(|n| n.node_id == node_id).map(|n| n.key)
	}

	pub fn element_id(&self, key: ElementKey) -> Option<String> {
		self.nodes.get(key.0).map(RenderedNodeHandle::element_id)
	}

	/// Exact lookup of a DOM id produced by this render. Never splits the id.
	pub fn resolve_element_id(&self, element_id: &str) -> Option<ElementKey> {
		self.by_element_id.get(element_id).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn element_ids_round_trip_with_hyphenated_node_ids() {
		let handle = RenderHandle::new(3, ["step-one", "step", "one"]);
		assert_eq!(handle.generation(), 3);

		let key = handle.key_of("step-one").unwrap();
		let dom_id = handle.element_id(key).unwrap();
		assert_eq!(dom_id, "flowchart-step-one-0");
		assert_eq!(handle.resolve_element_id(&dom_id), Some(key));
		assert_eq!(handle.node_id(key), Some("step-one"));

		assert_eq!(
			handle.resolve_element_id("flowchart-step-1"),
			handle.key_of("step")
		);
	}

	#[test]
	fn foreign_ids_do_not_resolve() {
		let handle = RenderHandle::new(1, ["A"]);
		assert_eq!(handle.resolve_element_id("flowchart-A-7"), None);
		assert_eq!(handle.resolve_element_id("A"), None);
		assert_eq!(handle.node_id(ElementKey(4)), None);
	}
}
