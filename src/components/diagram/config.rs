use serde::{Deserialize, Serialize};

use super::panel::{DEFAULT_PANEL_TEXT, FALLBACK_PANEL_TEXT, PanelState};

const PALETTE: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
	/// Longest-path layers along the graph direction.
	#[default]
	Layered,
	/// Declared positions, layered placement for the rest.
	Fixed,
	/// Layered start, then a live force simulation.
	Force,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
	pub mode: LayoutMode,
	/// Gap between neighbouring nodes of one layer.
	pub node_spacing: f64,
	/// Gap between consecutive layers.
	pub layer_spacing: f64,
	/// Inner padding around a node label.
	pub padding: f64,
	pub font_px: f64,
}

impl Default for LayoutOptions {
	fn default() -> Self {
		Self {
			mode: LayoutMode::Layered,
			node_spacing: 40.0,
			layer_spacing: 60.0,
			padding: 10.0,
			font_px: 14.0,
		}
	}
}

impl LayoutOptions {
	pub fn line_height(&self) -> f64 {
		self.font_px * 1.3
	}

	/// Rough advance width of one glyph; labels are measured without a canvas.
	pub fn glyph_width(&self) -> f64 {
		self.font_px * 0.6
	}
}

/// Per-diagram settings. Every field has a default, so partial JSON is fine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
	pub default_text: String,
	pub fallback_text: String,
	pub layout: LayoutOptions,
	pub palette: Vec<String>,
	pub background: String,
	/// Moves the detail panel text level with the pointer while hovering nodes.
	pub panel_follows_pointer: bool,
}

impl Default for DiagramConfig {
	fn default() -> Self {
		Self {
			default_text: DEFAULT_PANEL_TEXT.into(),
			fallback_text: FALLBACK_PANEL_TEXT.into(),
			layout: LayoutOptions::default(),
			palette: PALETTE.iter().map(|c| c.to_string()).collect(),
			background: "#f8fafc".into(),
			panel_follows_pointer: false,
		}
	}
}

impl DiagramConfig {
	pub fn panel(&self) -> PanelState {
		PanelState::new(&self.default_text, &self.fallback_text)
	}

	pub fn palette_color(&self, i: usize) -> &str {
		match self.palette.len() {
			0 => PALETTE[i % PALETTE.len()],
			n => &self.palette[i % n],
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config: DiagramConfig =
			serde_json::from_str(r#"{"default_text": "Pick a step.", "layout": {"mode": "force"}}"#)
				.unwrap();
		assert_eq!(config.default_text, "Pick a step.");
		assert_eq!(config.fallback_text, FALLBACK_PANEL_TEXT);
		assert_eq!(config.layout.mode, LayoutMode::Force);
		assert_eq!(config.layout.node_spacing, 40.0);
		assert_eq!(config.panel().text(), "Pick a step.");
		assert!(!config.panel_follows_pointer);
	}

	#[test]
	fn empty_palette_falls_back() {
		let config = DiagramConfig {
			palette: Vec::new(),
			..Default::default()
		};
		assert_eq!(config.palette_color(11), PALETTE[1]);
	}
}
