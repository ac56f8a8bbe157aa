use std::collections::HashMap;

use log::{debug, info, warn};

use super::annotations::{AnnotationDrift, AnnotationMap};
use super::handle::{ElementKey, RenderHandle};
use super::panel::PanelState;

/// Outcome of one bind pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindReport {
	pub generation: u64,
	pub bound: usize,
	pub drift: AnnotationDrift,
}

/// Connects rendered elements to their annotations and drives the panel text.
#[derive(Clone, Debug)]
pub struct AnnotationBinder {
	annotations: AnnotationMap,
	panel: PanelState,
	generation: Option<u64>,
	bindings: HashMap<ElementKey, String>,
	selected: Option<ElementKey>,
}

impl AnnotationBinder {
	pub fn new(annotations: AnnotationMap, panel: PanelState) -> Self {
		Self {
			annotations,
			panel,
			generation: None,
			bindings: HashMap::new(),
			selected: None,
		}
	}

	/// Binds every node of `handle`. Re-binding replaces earlier bindings.
	pub fn bind(&mut self, handle: &RenderHandle) -> BindReport {
		if self.generation != Some(handle.generation()) {
			self.bindings.clear();
			self.selected = None;
			self.panel.reset();
		}
		self.generation = Some(handle.generation());
		for node in handle.nodes() {
			self.bindings.insert(node.key, node.node_id.clone());
		}

		let drift = self
			.annotations
			.drift(handle.nodes().iter().map(|n| n.node_id.as_str()));
		if !drift.is_clean() {
			warn!(
				"annotation drift: unannotated {:?}, not rendered {:?}",
				drift.unannotated, drift.orphaned
			);
		}
		info!(
			"bound {} nodes (render generation {})",
			self.bindings.len(),
			handle.generation()
		);

		BindReport {
			generation: handle.generation(),
			bound: self.bindings.len(),
			drift,
		}
	}

	pub fn pointer_enter(&mut self, key: ElementKey) -> Option<&str> {
		let id = self.bindings.get(&key)?;
		match self.annotations.get(id) {
			Some(text) => self.panel.show(text),
			None => self.panel.show_fallback(),
		}
		debug!("enter {id}");
		Some(self.panel.text())
	}

	pub fn pointer_leave(&mut self, _key: ElementKey) -> &str {
		self.panel.reset();
		self.panel.text()
	}

	/// Toggles the focus selection. Returns the node id now selected.
	pub fn select(&mut self, key: Option<ElementKey>) -> Option<&str> {
		let key = key.filter(|k| self.bindings.contains_key(k));
		self.selected = if self.selected == key { None } else { key };
		let id = self.selected.and_then(|k| self.bindings.get(&k)).map(String::as_str);
		debug!("selected {:?}", id);
		id
	}

	pub fn selected(&self) -> Option<ElementKey> {
		self.selected
	}

	pub fn panel(&self) -> &PanelState {
		&self.panel
	}

	#[cfg(test)]
	pub fn binding_count(&self) -> usize {
		self.bindings.len()
	}

	#[cfg(test)]
	pub fn is_bound(&self, key: ElementKey) -> bool {
		self.bindings.contains_key(&key)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::panel::{DEFAULT_PANEL_TEXT, FALLBACK_PANEL_TEXT};

	fn binder() -> AnnotationBinder {
		let annotations = [("A", "desc A"), ("B", "desc B")].into_iter().collect();
		AnnotationBinder::new(annotations, PanelState::default())
	}

	#[test]
	fn hover_scenario() {
		let handle = RenderHandle::new(1, ["A", "B", "C"]);
		let mut binder = binder();
		let report = binder.bind(&handle);
		assert_eq!(report.bound, 3);
		assert_eq!(report.drift.unannotated, ["C"]);

		let (a, c) = (handle.key_of("A").unwrap(), handle.key_of("C").unwrap());
		assert_eq!(binder.pointer_enter(a), Some("desc A"));
		assert_eq!(binder.pointer_leave(a), DEFAULT_PANEL_TEXT);
		assert_eq!(binder.pointer_enter(c), Some(FALLBACK_PANEL_TEXT));
		assert_eq!(binder.panel().text(), FALLBACK_PANEL_TEXT);
	}

	#[test]
	fn leave_always_resets_regardless_of_target() {
		let handle = RenderHandle::new(1, ["A", "B"]);
		let mut binder = binder();
		binder.bind(&handle);
		let (a, b) = (handle.key_of("A").unwrap(), handle.key_of("B").unwrap());

		binder.pointer_enter(a);
		assert_eq!(binder.pointer_leave(b), DEFAULT_PANEL_TEXT);
		assert_eq!(binder.pointer_leave(ElementKey(99)), DEFAULT_PANEL_TEXT);
	}

	#[test]
	fn double_bind_is_idempotent() {
		let handle = RenderHandle::new(4, ["A", "B"]);
		let mut binder = binder();
		let first = binder.bind(&handle);
		let a = handle.key_of("A").unwrap();
		binder.pointer_enter(a);
		let second = binder.bind(&handle);

		assert_eq!(first, second);
		assert_eq!(binder.binding_count(), 2);
		assert_eq!(binder.pointer_enter(a), Some("desc A"));
	}

	#[test]
	fn newer_render_replaces_stale_bindings() {
		let mut binder = binder();
		binder.bind(&RenderHandle::new(1, ["A", "B", "C"]));
		let next = RenderHandle::new(2, ["B"]);
		binder.bind(&next);

		assert_eq!(binder.binding_count(), 1);
		assert!(!binder.is_bound(ElementKey(2)));
		assert_eq!(binder.pointer_enter(ElementKey(0)), Some("desc B"));
		assert_eq!(binder.pointer_enter(ElementKey(1)), None);
	}

	#[test]
	fn select_toggles() {
		let handle = RenderHandle::new(1, ["A", "B"]);
		let mut binder = binder();
		binder.bind(&handle);
		let a = handle.key_of("A").unwrap();

		assert_eq!(binder.select(Some(a)), Some("A"));
		assert_eq!(binder.select(Some(a)), None);
		assert_eq!(binder.select(Some(ElementKey(7))), None);
		assert_eq!(binder.selected(), None);
		assert_eq!(binder.panel().text(), DEFAULT_PANEL_TEXT);
	}
}
