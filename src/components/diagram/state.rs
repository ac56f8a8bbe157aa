use std::collections::{HashMap, HashSet};

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::annotations::AnnotationMap;
use super::binder::AnnotationBinder;
use super::config::{DiagramConfig, LayoutMode};
use super::handle::ElementKey;
use super::query::InteractionFlags;
use super::scene::{Scene, SceneRenderer};
use super::types::GraphSpec;

const FIT_MARGIN: f64 = 24.0;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}
const MAX_FIT_SCALE: f64 = 1.5;

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<ElementKey>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<ElementKey>,
	pub neighbors: HashSet<ElementKey>,
	pub highlight_t: f64,
	pub prev_node: Option<ElementKey>,
	pub prev_neighbors: HashSet<ElementKey>,
	delay_t: f64,
}

/// Force relaxation seeded from the layered positions.
pub struct ForceLayout {
	graph: ForceGraph<ElementKey, ()>,
	indices: HashMap<ElementKey, DefaultNodeIdx>,
}

impl ForceLayout {
	fn new(scene: &Scene) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});
		let mut indices = HashMap::new();
		for node in scene.nodes() {
			let idx = graph.add_node(NodeData {
				x: node.x as f32,
				y: node.y as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: node.key,
			});
			indices.insert(node.key, idx);
		}
		for edge in scene.edges() {
			if let (Some(&src), Some(&tgt)) = (indices.get(&edge.from), indices.get(&edge.to)) {
				graph.add_edge(src, tgt, EdgeData::default());
			}
		}
		Self { graph, indices }
	}

	fn step(&mut self, dt: f32, scene: &mut Scene) {
		self.graph.update(dt);
		self.graph.visit_nodes(|node| {
			scene.move_node(node.data.user_data, node.x() as f64, node.y() as f64);
		});
	}

	fn pin(&mut self, key: ElementKey, x: f64, y: f64) {
		let Some(&idx) = self.indices.get(&key) else {
			return;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = x as f32;
				node.data.y = y as f32;
				node.data.is_anchor = true;
			}
		});
	}
}

/// Everything one mounted canvas diagram owns.
pub struct DiagramState {
	pub scene: Scene,
	pub binder: AnnotationBinder,
	pub flags: InteractionFlags,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub focus: Option<ElementKey>,
	pub focus_neighbors: HashSet<ElementKey>,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	renderer: SceneRenderer,
	force: Option<ForceLayout>,
}

impl DiagramState {
	pub fn new(
		spec: &GraphSpec,
		annotations: AnnotationMap,
		config: DiagramConfig,
		flags: InteractionFlags,
		width: f64,
		height: f64,
	) -> Self {
		let binder = AnnotationBinder::new(annotations, config.panel());
		let mut state = Self {
			scene: Scene::default(),
			binder,
			flags,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			focus: None,
			focus_neighbors: HashSet::new(),
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
			renderer: SceneRenderer::new(config),
			force: None,
		};
		state.set_spec(spec);
		state
	}

	/// Renders `spec` and binds the result, replacing the previous scene.
	pub fn set_spec(&mut self, spec: &GraphSpec) {
		self.scene = self.renderer.render(spec);
		self.binder.bind(self.scene.handle());
		self.force =
			(self.scene.mode() == LayoutMode::Force).then(|| ForceLayout::new(&self.scene));
		self.drag = DragState::default();
		self.hover = HoverState::default();
		self.focus = None;
		self.focus_neighbors.clear();
		self.fit_to_view();
	}

	/// Takes effect with the next [`set_spec`](Self::set_spec) or
	/// [`set_annotations`](Self::set_annotations).
	pub fn set_config(&mut self, config: DiagramConfig) {
		self.renderer.set_config(config);
	}

	pub fn set_annotations(&mut self, annotations: AnnotationMap) {
		let panel = self.renderer.config().panel();
		self.binder = AnnotationBinder::new(annotations, panel);
		self.binder.bind(self.scene.handle());
	}

	pub fn config(&self) -> &DiagramConfig {
		self.renderer.config()
	}

	pub fn panel_text(&self) -> &str {
		self.binder.panel().text()
	}

	pub fn fit_to_view(&mut self) {
		let bounds = self.scene.bounds();
		let (cx, cy) = bounds.center();
		let k = if bounds.width() > 0.0 && bounds.height() > 0.0 {
			((self.width - 2.0 * FIT_MARGIN) / bounds.width())
				.min((self.height - 2.0 * FIT_MARGIN) / bounds.height())
				.clamp(0.1, MAX_FIT_SCALE)
		} else {
			1.0
		};
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		};
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Node under a screen point, in reverse drawing order: hovered, then
	/// highlighted, then the rest. Highlighted nodes are hit at their drawn size.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<ElementKey> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		if self.has_active_highlight() {
			let hit = |key: ElementKey| {
				self.scene
					.node(key)
					.is_some_and(|n| n.contains_scaled(gx, gy, self.node_scale(key)))
			};
			let on_top = self.scene.nodes().iter().rev().map(|n| n.key);
			let found = on_top
				.clone()
				.filter(|&k| self.is_hovered(k))
				.chain(on_top.filter(|&k| self.is_highlighted(k)))
				.find(|&k| hit(k));
			if found.is_some() {
				return found;
			}
		}
		self.scene.node_at(gx, gy)
	}

	pub fn highlight_ease(&self) -> f64 {
		ease_out_cubic(self.hover.highlight_t)
	}

	/// Scale a node is drawn at while the hover highlight is easing in or out.
	pub fn node_scale(&self, key: ElementKey) -> f64 {
		let t = self.highlight_ease();
		if !self.has_active_highlight() {
			1.0
		} else if self.is_hovered(key) {
			1.0 + 0.08 * t
		} else if self.is_highlighted(key) {
			1.0 + 0.04 * t
		} else {
			1.0
		}
	}

	/// Moves the hover to `node`, driving the binder. Returns true when the panel text changed.
	pub fn set_hover(&mut self, node: Option<ElementKey>) -> bool {
		if self.hover.node == node {
			return false;
		}
		let was_hovering = self.hover.node.is_some();

		if let Some(prev) = self.hover.node {
			self.binder.pointer_leave(prev);
		}
		if let Some(key) = node {
			self.binder.pointer_enter(key);
		}

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(key) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			self.hover.neighbors = self.scene.neighbors(key);
		}
		true
	}

	/// Click-to-focus: dims everything outside the clicked node's neighbourhood.
	pub fn click(&mut self, node: Option<ElementKey>) -> Option<String> {
		let selected = self.binder.select(node).map(str::to_owned);
		self.focus = self.binder.selected();
		self.focus_neighbors = self.focus.map(|k| self.scene.neighbors(k)).unwrap_or_default();
		selected
	}

	pub fn is_focused(&self, key: ElementKey) -> bool {
		match self.focus {
			None => true,
			Some(f) => f == key || self.focus_neighbors.contains(&key),
		}
	}

	pub fn is_highlighted(&self, key: ElementKey) -> bool {
		self.hover.node == Some(key)
			|| self.hover.neighbors.contains(&key)
			|| self.hover.prev_node == Some(key)
			|| self.hover.prev_neighbors.contains(&key)
	}

	pub fn is_hovered(&self, key: ElementKey) -> bool {
		self.hover.node == Some(key) || self.hover.prev_node == Some(key)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn begin_drag(&mut self, key: ElementKey, sx: f64, sy: f64) {
		let Some(node) = self.scene.node(key) else {
			return;
		};
		self.drag = DragState {
			active: true,
			node: Some(key),
			start_x: sx,
			start_y: sy,
			node_start_x: node.x,
			node_start_y: node.y,
		};
	}

	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		let Some(key) = self.drag.node.filter(|_| self.drag.active) else {
			return;
		};
		let (dx, dy) = (
			(sx - self.drag.start_x) / self.transform.k,
			(sy - self.drag.start_y) / self.transform.k,
		);
		let (nx, ny) = (self.drag.node_start_x + dx, self.drag.node_start_y + dy);
		self.scene.move_node(key, nx, ny);
		if let Some(force) = self.force.as_mut() {
			force.pin(key, nx, ny);
		}
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.pan = PanState {
			active: true,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
	}

	pub fn end_gestures(&mut self) {
		self.drag.active = false;
		self.drag.node = None;
		self.pan.active = false;
	}

	/// Zooms around the screen point `(sx, sy)`.
	pub fn zoom(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn tick(&mut self, dt: f32) {
		if let Some(force) = self.force.as_mut() {
			force.step(dt, &mut self.scene);
		}
		self.flow_time += dt as f64;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.fit_to_view();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::mermaid::parse_flowchart;
	use crate::components::diagram::panel::{DEFAULT_PANEL_TEXT, FALLBACK_PANEL_TEXT};
	use crate::components::diagram::types::NodeSpec;

	fn state(config: DiagramConfig) -> DiagramState {
		let spec = parse_flowchart("flowchart TD\nA --> B\nB --> C").unwrap();
		let annotations = [("A", "desc A"), ("B", "desc B")].into_iter().collect();
		DiagramState::new(
			&spec,
			annotations,
			config,
			InteractionFlags::default(),
			800.0,
			600.0,
		)
	}

	fn screen_pos(s: &DiagramState, id: &str) -> (f64, f64) {
		let key = s.scene.handle().key_of(id).unwrap();
		let node = s.scene.node(key).unwrap();
		(
			node.x * s.transform.k + s.transform.x,
			node.y * s.transform.k + s.transform.y,
		)
	}

	#[test]
	fn hovering_through_screen_coordinates_drives_the_panel() {
		let mut s = state(DiagramConfig::default());
		let (ax, ay) = screen_pos(&s, "A");
		let (cx, cy) = screen_pos(&s, "C");

		assert!(s.set_hover(s.node_at_position(ax, ay)));
		assert_eq!(s.panel_text(), "desc A");
		assert!(s.is_highlighted(s.scene.handle().key_of("B").unwrap()));
		assert!(!s.set_hover(s.node_at_position(ax, ay)));

		s.set_hover(s.node_at_position(cx, cy));
		assert_eq!(s.panel_text(), FALLBACK_PANEL_TEXT);

		s.set_hover(None);
		assert_eq!(s.panel_text(), DEFAULT_PANEL_TEXT);
		assert!(s.has_active_highlight());
	}

	#[test]
	fn fit_keeps_the_scene_on_screen() {
		let s = state(DiagramConfig::default());
		for id in ["A", "B", "C"] {
			let (x, y) = screen_pos(&s, id);
			assert!((0.0..=800.0).contains(&x) && (0.0..=600.0).contains(&y));
		}
	}

	#[test]
	fn click_focuses_the_neighbourhood() {
		let mut s = state(DiagramConfig::default());
		let key = |s: &DiagramState, id| s.scene.handle().key_of(id).unwrap();
		let a = key(&s, "A");

		assert_eq!(s.click(Some(a)).as_deref(), Some("A"));
		assert!(s.is_focused(key(&s, "B")));
		assert!(!s.is_focused(key(&s, "C")));

		assert_eq!(s.click(Some(a)), None);
		assert!(s.is_focused(key(&s, "C")));
	}

	#[test]
	fn drag_moves_the_node_in_world_space() {
		let mut s = state(DiagramConfig::default());
		let a = s.scene.handle().key_of("A").unwrap();
		let before = s.scene.node(a).unwrap().x;
		let k = s.transform.k;

		s.begin_drag(a, 100.0, 100.0);
		s.drag_to(100.0 + 10.0 * k, 100.0);
		s.end_gestures();
		s.drag_to(500.0, 500.0);

		assert!((s.scene.node(a).unwrap().x - (before + 10.0)).abs() < 1e-9);
	}

	#[test]
	fn hovered_node_wins_hit_tests_at_its_drawn_size() {
		let spec = GraphSpec::builder()
			.node(NodeSpec::new("A", "A").at(0.0, 0.0))
			.node(NodeSpec::new("B", "B").at(20.0, 0.0))
			.build()
			.unwrap();
		let mut s = DiagramState::new(
			&spec,
			AnnotationMap::default(),
			DiagramConfig::default(),
			InteractionFlags::default(),
			800.0,
			600.0,
		);
		let to_screen = |s: &DiagramState, x: f64, y: f64| {
			(x * s.transform.k + s.transform.x, y * s.transform.k + s.transform.y)
		};
		let a = s.scene.handle().key_of("A").unwrap();
		let b = s.scene.handle().key_of("B").unwrap();
		let half_width = s.scene.node(a).unwrap().width / 2.0;

		let (ox, oy) = to_screen(&s, 10.0, 0.0);
		let (ex, ey) = to_screen(&s, -half_width - 0.5, 0.0);
		assert_eq!(s.node_at_position(ox, oy), Some(b));
		assert_eq!(s.node_at_position(ex, ey), None);

		s.set_hover(Some(a));
		for _ in 0..200 {
			s.tick(0.016);
		}
		assert!(s.node_scale(a) > 1.07);
		assert_eq!(s.node_at_position(ox, oy), Some(a));
		assert_eq!(s.node_at_position(ex, ey), Some(a));
	}

	#[test]
	fn respec_rebinds_with_a_new_generation() {
		let mut config = DiagramConfig::default();
		config.layout.mode = LayoutMode::Force;
		let mut s = state(config);
		let first = s.scene.handle().generation();
		s.tick(0.016);

		s.set_spec(&parse_flowchart("flowchart LR\nB --> A").unwrap());
		assert_eq!(s.scene.handle().generation(), first + 1);
		assert_eq!(s.binder.binding_count(), 2);
		let b = s.scene.handle().key_of("B").unwrap();
		s.set_hover(Some(b));
		assert_eq!(s.panel_text(), "desc B");
	}

	#[test]
	fn reconfiguring_keeps_the_live_state() {
		let mut s = state(DiagramConfig::default());
		let first = s.scene.handle().generation();
		let config = DiagramConfig {
			default_text: "Pick a concept.".into(),
			..DiagramConfig::default()
		};

		s.set_config(config);
		s.set_annotations([("C", "desc C")].into_iter().collect());
		s.set_spec(&parse_flowchart("flowchart TD\nA --> B\nB --> C").unwrap());

		assert_eq!(s.scene.handle().generation(), first + 1);
		assert_eq!(s.panel_text(), "Pick a concept.");
		let c = s.scene.handle().key_of("C").unwrap();
		s.set_hover(Some(c));
		assert_eq!(s.panel_text(), "desc C");
	}
}
