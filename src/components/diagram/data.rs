//! The `data.json` contract: nodes and edges with optional groups,
//! descriptions and saved positions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Response, Url};

use super::annotations::AnnotationMap;
use super::config::DiagramConfig;
use super::error::{DiagramError, Result};
use super::scene::Scene;
use super::types::{ClassStyle, Direction, EdgeKind, GraphSpec, NodeShape, NodeSpec};

/// Node identifiers may be written as numbers or strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeKey {
	Number(i64),
	Text(String),
}

impl NodeKey {
	pub fn as_id(&self) -> String {
		match self {
			NodeKey::Number(n) => n.to_string(),
			NodeKey::Text(s) => s.clone(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
	pub id: NodeKey,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group: Option<NodeKey>,
	/// Hover text. `description` is accepted as well.
	#[serde(default, alias = "description", skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shape: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
	/// Fields this crate does not interpret, kept for saving.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentEdge {
	pub from: NodeKey,
	pub to: NodeKey,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramDocument {
	#[serde(default)]
	pub direction: Direction,
	pub nodes: Vec<DocumentNode>,
	#[serde(default)]
	pub edges: Vec<DocumentEdge>,
	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub groups: IndexMap<String, ClassStyle>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub config: Option<DiagramConfig>,
}

fn shape_from_name(name: &str) -> NodeShape {
	match name {
		"dot" | "circle" => NodeShape::Circle,
		"diamond" => NodeShape::Diamond,
		"box" => NodeShape::Rounded,
		"ellipse" => NodeShape::Stadium,
		_ => NodeShape::Rect,
	}
}

impl DiagramDocument {
	pub fn parse(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	/// Splits the document into the graph to render and its hover texts.
	pub fn to_parts(&self) -> Result<(GraphSpec, AnnotationMap)> {
		let mut builder = GraphSpec::builder().direction(self.direction);
		for node in &self.nodes {
			let id = node.id.as_id();
			let mut spec = NodeSpec::new(id.clone(), node.label.clone().unwrap_or(id));
			if let Some(group) = &node.group {
				spec = spec.class(group.as_id());
			}
			if let Some(shape) = &node.shape {
				spec = spec.shape(shape_from_name(shape));
			}
			if let (Some(x), Some(y)) = (node.x, node.y) {
				spec = spec.at(x, y);
			}
			builder = builder.node(spec);
		}
		for edge in &self.edges {
			builder = builder.edge_with(
				edge.from.as_id(),
				edge.to.as_id(),
				edge.label.clone(),
				EdgeKind::Arrow,
			);
		}
		for (name, style) in &self.groups {
			builder = builder.class(name.clone(), style.clone());
		}

		let annotations = self
			.nodes
			.iter()
			.filter_map(|n| Some((n.id.as_id(), n.title.clone()?)))
			.collect();
		Ok((builder.build()?, annotations))
	}

	/// Pretty JSON of this document with node positions taken from `scene`.
	pub fn export_positions(&self, scene: &Scene) -> Result<String> {
		let mut doc = self.clone();
		for node in &mut doc.nodes {
			let placed = scene
				.handle()
				.key_of(&node.id.as_id())
				.and_then(|key| scene.node(key));
			if let Some(placed) = placed {
				node.x = Some(placed.x.round());
				node.y = Some(placed.y.round());
			}
		}
		Ok(serde_json::to_string_pretty(&doc)?)
	}
}

#[derive(Serialize)]
struct SavedPosition {
	x: f64,
	y: f64,
}

/// Rounded positions of every rendered node, keyed by node id.
pub fn positions_json(scene: &Scene) -> Result<String> {
	let positions: IndexMap<&str, SavedPosition> = scene
		.nodes()
		.iter()
		.map(|n| {
			let pos = SavedPosition {
				x: n.x.round(),
				y: n.y.round(),
			};
			(n.id.as_str(), pos)
		})
		.collect();
	Ok(serde_json::to_string_pretty(&positions)?)
}

fn js_error(err: JsValue) -> DiagramError {
	DiagramError::Fetch(format!("{err:?}"))
}

/// One-shot fetch of a data document. No retry.
pub async fn fetch_document(url: &str) -> Result<DiagramDocument> {
	let window = web_sys::window().ok_or_else(|| DiagramError::Fetch("no window".into()))?;
	let response: Response = JsFuture::from(window.fetch_with_str(url))
		.await
		.map_err(js_error)?
		.dyn_into()
		.map_err(js_error)?;
	if !response.ok() {
		return Err(DiagramError::Fetch(format!(
			"HTTP error! status: {}",
			response.status()
		)));
	}
	let body = JsFuture::from(response.text().map_err(js_error)?)
		.await
		.map_err(js_error)?;
	let text = body
		.as_string()
		.ok_or_else(|| DiagramError::Fetch("response body is not text".into()))?;
	DiagramDocument::parse(&text)
}

/// Offers `json` to the user as a file download.
pub fn download_json(filename: &str, json: &str) -> std::result::Result<(), JsValue> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let options = BlobPropertyBag::new();
	options.set_type("application/json");
	let blob = Blob::new_with_str_sequence_and_options(
		&js_sys::Array::of1(&JsValue::from_str(json)),
		&options,
	)?;
	let url = Url::create_object_url_with_blob(&blob)?;

	let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
	anchor.set_href(&url);
	anchor.set_download(filename);
	let body = document.body().ok_or_else(|| JsValue::from_str("no body"))?;
	body.append_child(&anchor)?;
	anchor.click();
	body.remove_child(&anchor)?;
	Url::revoke_object_url(&url)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::mermaid::parse_flowchart;
	use crate::components::diagram::scene::SceneRenderer;

	const LEARNING_GRAPH: &str = r##"{
		"nodes": [
			{"id": 1, "label": "Artificial\nIntelligence", "group": "found", "title": "Foundational concept", "x": 0, "y": -100},
			{"id": 2, "label": "Claude AI", "group": "inter", "title": "Depends on AI fundamentals", "x": 0, "y": 20, "font": {"size": 13}},
			{"id": "three", "label": "Prompt\nEngineering", "shape": "dot"}
		],
		"edges": [
			{"from": 1, "to": 2, "arrows": "to"},
			{"from": 2, "to": "three", "label": "enables"}
		],
		"groups": {"found": {"fill": "#ef4444", "stroke": "#991b1b", "color": "#fff"}}
	}"##;

	#[test]
	fn document_splits_into_graph_and_annotations() {
		let doc = DiagramDocument::parse(LEARNING_GRAPH).unwrap();
		let (spec, annotations) = doc.to_parts().unwrap();

		let first = spec.node("1").unwrap();
		assert_eq!(first.label, "Artificial\nIntelligence");
		assert_eq!(first.class.as_deref(), Some("found"));
		assert_eq!(first.position, Some((0.0, -100.0)));
		assert_eq!(spec.node("three").unwrap().shape, NodeShape::Circle);
		assert_eq!(spec.edges()[1].label.as_deref(), Some("enables"));
		assert!(spec.class_style("found").is_some());

		assert_eq!(annotations.get("2"), Some("Depends on AI fundamentals"));
		assert_eq!(annotations.get("three"), None);
		assert_eq!(annotations.len(), 2);
	}

	#[test]
	fn malformed_documents_are_errors() {
		assert!(matches!(
			DiagramDocument::parse("{\"nodes\": [{\"label\": \"no id\"}]}"),
			Err(DiagramError::Json(_))
		));
		assert!(matches!(DiagramDocument::parse("not json"), Err(DiagramError::Json(_))));

		let dangling =
			DiagramDocument::parse(r#"{"nodes": [{"id": 1}], "edges": [{"from": 1, "to": 9}]}"#)
				.unwrap()
				.to_parts();
		assert!(matches!(dangling, Err(DiagramError::Spec(_))));
	}

	#[test]
	fn export_rounds_positions_and_keeps_unknown_fields() {
		let doc = DiagramDocument::parse(LEARNING_GRAPH).unwrap();
		let (spec, _) = doc.to_parts().unwrap();
		let mut scene = SceneRenderer::default().render(&spec);
		let key = scene.handle().key_of("1").unwrap();
		scene.move_node(key, 12.4, -99.6);

		let saved = DiagramDocument::parse(&doc.export_positions(&scene).unwrap()).unwrap();
		assert_eq!((saved.nodes[0].x, saved.nodes[0].y), (Some(12.0), Some(-100.0)));
		assert!(saved.nodes[2].x.is_some());
		assert_eq!(saved.nodes[1].extra.get("font"), doc.nodes[1].extra.get("font"));
		assert_eq!(saved.edges[0].extra.get("arrows"), Some(&Value::from("to")));
		assert_eq!(saved.nodes[0].id, NodeKey::Number(1));
	}

	#[test]
	fn numeric_groups_become_classes() {
		let doc = DiagramDocument::parse(
			r##"{"nodes": [{"id": 2, "group": 3}], "groups": {"3": {"fill": "#22c55e"}}}"##,
		)
		.unwrap();
		assert_eq!(doc.nodes[0].group, Some(NodeKey::Number(3)));

		let (spec, _) = doc.to_parts().unwrap();
		assert_eq!(spec.node("2").unwrap().class.as_deref(), Some("3"));
		assert!(spec.class_style("3").is_some());
	}

	#[test]
	fn bare_positions_follow_declaration_order() {
		let spec = parse_flowchart("flowchart LR\nb --> a").unwrap();
		let mut scene = SceneRenderer::default().render(&spec);
		scene.move_node(scene.handle().key_of("a").unwrap(), 40.2, 7.7);

		let saved: IndexMap<String, Value> =
			serde_json::from_str(&positions_json(&scene).unwrap()).unwrap();
		assert_eq!(saved.keys().collect::<Vec<_>>(), ["b", "a"]);
		assert_eq!(saved["a"], serde_json::json!({"x": 40.0, "y": 8.0}));
	}
}
