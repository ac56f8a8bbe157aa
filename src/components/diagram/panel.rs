use leptos::prelude::*;

pub const DEFAULT_PANEL_TEXT: &str = "Hover a node for details.";
pub const FALLBACK_PANEL_TEXT: &str = "detail unavailable";

/// Distance kept between the panel text and the top and bottom of its container.
const PANEL_INSET: f64 = 8.0;
/// How far above the pointer the panel text starts.
const POINTER_LEAD: f64 = 20.0;

/// Top offset that keeps the panel text level with the pointer and inside its container.
pub fn follow_offset(pointer_y: f64, container_height: f64, text_height: f64) -> f64 {
	(pointer_y - POINTER_LEAD)
		.min(container_height - text_height - PANEL_INSET)
		.max(PANEL_INSET)
}

/// The single mutable display string of a diagram's detail panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelState {
	text: String,
	default_text: String,
	fallback_text: String,
}

impl Default for PanelState {
	fn default() -> Self {
		Self::new(DEFAULT_PANEL_TEXT, FALLBACK_PANEL_TEXT)
	}
}

impl PanelState {
	pub fn new(default_text: impl Into<String>, fallback_text: impl Into<String>) -> Self {
		let default_text = default_text.into();
		Self {
			text: default_text.clone(),
			default_text,
			fallback_text: fallback_text.into(),
		}
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn show(&mut self, text: &str) {
		self.text.clear();
		self.text.push_str(text);
	}

	pub fn show_fallback(&mut self) {
		self.text.clone_from(&self.fallback_text);
	}

	pub fn reset(&mut self) {
		self.text.clone_from(&self.default_text);
	}

	#[cfg(test)]
	pub fn is_default(&self) -> bool {
		self.text == self.default_text
	}
}

/// Projects the panel text into its region. Every update replaces the text content.
///
/// With an `offset`, the text box is pushed down by that many pixels.
#[component]
pub fn DetailPanel(
	#[prop(into)] text: Signal<String>,
	#[prop(default = None)] title: Option<String>,
	#[prop(optional, into)] offset: Option<Signal<f64>>,
) -> impl IntoView {
	let margin = move || offset.map(|o| format!("{}px", o.get())).unwrap_or_default();
	view! {
		<aside class="detail-panel">
			{title.map(|t| view! { <h3 class="detail-panel-title">{t}</h3> })}
			<div class="detail-panel-text" style:margin-top=margin>
				{move || text.get()}
			</div>
		</aside>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_at_default_and_resets() {
		let mut panel = PanelState::default();
		assert_eq!(panel.text(), DEFAULT_PANEL_TEXT);

		panel.show("desc A");
		assert_eq!(panel.text(), "desc A");
		assert!(!panel.is_default());

		panel.show_fallback();
		assert_eq!(panel.text(), FALLBACK_PANEL_TEXT);

		panel.reset();
		assert!(panel.is_default());
	}

	#[test]
	fn follow_offset_tracks_the_pointer_within_the_container() {
		assert_eq!(follow_offset(200.0, 600.0, 100.0), 180.0);
		assert_eq!(follow_offset(5.0, 600.0, 100.0), PANEL_INSET);
		assert_eq!(follow_offset(590.0, 600.0, 100.0), 492.0);
		assert_eq!(follow_offset(300.0, 90.0, 100.0), PANEL_INSET);
	}
}
