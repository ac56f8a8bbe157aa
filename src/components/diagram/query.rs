//! Opt-in interaction flags read from the page URL.
//!
//! Embedded diagrams must not capture wheel scrolling, so zoom, pan and node
//! dragging stay off unless the page is opened with `?enable-interaction=true`
//! or `?enable-save=true`.

pub const INTERACTION_FLAG: &str = "enable-interaction";
pub const SAVE_FLAG: &str = "enable-save";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionFlags {
	pub interaction: bool,
	pub save: bool,
}

impl InteractionFlags {
	/// Parses a query string, with or without its leading `?`.
	/// Only the literal `true` enables a flag.
	pub fn from_query(query: &str) -> Self {
		let mut flags = Self::default();
		for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
			let on = value == "true";
			match &*key {
				INTERACTION_FLAG => flags.interaction = on,
				SAVE_FLAG => flags.save = on,
				_ => {}
			}
		}
		flags
	}

	/// Flags of the current page. Off when there is no window.
	pub fn from_location() -> Self {
		web_sys::window()
			.and_then(|w| w.location().search().ok())
			.map(|q| Self::from_query(&q))
			.unwrap_or_default()
	}

	pub fn allows_zoom_and_pan(&self) -> bool {
		self.interaction || self.save
	}

	pub fn allows_node_drag(&self) -> bool {
		self.save
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn absent_flags_are_off() {
		let flags = InteractionFlags::from_query("");
		assert_eq!(flags, InteractionFlags::default());
		assert!(!flags.allows_zoom_and_pan());
	}

	#[test]
	fn only_literal_true_enables() {
		let flags = InteractionFlags::from_query("?enable-interaction=true&enable-save=1");
		assert!(flags.interaction && !flags.save);
		assert!(flags.allows_zoom_and_pan() && !flags.allows_node_drag());

		let flags = InteractionFlags::from_query("enable-save=true&other=x");
		assert!(flags.save && flags.allows_zoom_and_pan() && flags.allows_node_drag());

		assert!(!InteractionFlags::from_query("enable-interaction=TRUE").interaction);
	}
}
