//! Layout of a [`GraphSpec`] into positioned nodes and edges.
//!
//! The layered placement assigns layers by longest path over the graph with
//! its back edges removed, orders every layer by barycenter sweeps and then
//! stacks layers along the graph direction.

use std::collections::{HashMap, HashSet, VecDeque};

use log::info;

use super::config::{DiagramConfig, LayoutMode, LayoutOptions};
use super::handle::{ElementKey, RenderHandle};
use super::types::{Direction, EdgeKind, GraphSpec, NodeShape};

const DEFAULT_FILL: &str = "#ececff";
const DEFAULT_STROKE: &str = "#9370db";
const DEFAULT_TEXT: &str = "#333333";
const BARYCENTER_SWEEPS: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
	pub key: ElementKey,
	pub id: String,
	pub lines: Vec<String>,
	pub shape: NodeShape,
	pub fill: String,
	pub stroke: String,
	pub text_color: String,
	/// Centre, world space.
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
	pub layer: usize,
}

impl SceneNode {
	pub fn contains(&self, x: f64, y: f64) -> bool {
		self.contains_scaled(x, y, 1.0)
	}

	/// Hit test against the outline drawn at `scale` around the centre.
	pub fn contains_scaled(&self, x: f64, y: f64, scale: f64) -> bool {
		let (dx, dy) = ((x - self.x).abs(), (y - self.y).abs());
		let (hw, hh) = (self.width * scale / 2.0, self.height * scale / 2.0);
		match self.shape {
			NodeShape::Diamond => dx / hw + dy / hh <= 1.0,
			NodeShape::Circle => (dx * dx + dy * dy).sqrt() <= hw,
			_ => dx <= hw && dy <= hh,
		}
	}

	/// Point where the ray from the centre towards `(tx, ty)` leaves the shape.
	pub fn boundary_toward(&self, tx: f64, ty: f64) -> (f64, f64) {
		let (dx, dy) = (tx - self.x, ty - self.y);
		if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
			return (self.x, self.y);
		}
		let (hw, hh) = (self.width / 2.0, self.height / 2.0);
		let t = match self.shape {
			NodeShape::Diamond => 1.0 / (dx.abs() / hw + dy.abs() / hh),
			NodeShape::Circle => hw / (dx * dx + dy * dy).sqrt(),
			_ => {
				let tx = if dx.abs() > 0.0 { hw / dx.abs() } else { f64::INFINITY };
				let ty = if dy.abs() > 0.0 { hh / dy.abs() } else { f64::INFINITY };
				tx.min(ty)
			}
		};
		(self.x + dx * t, self.y + dy * t)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneEdge {
	pub from: ElementKey,
	pub to: ElementKey,
	pub label: Option<String>,
	pub kind: EdgeKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl Bounds {
	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	pub fn center(&self) -> (f64, f64) {
		(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}
}

/// A laid-out graph together with the handle that identifies its elements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
	nodes: Vec<SceneNode>,
	edges: Vec<SceneEdge>,
	handle: RenderHandle,
	mode: LayoutMode,
}

impl Scene {
	pub fn nodes(&self) -> &[SceneNode] {
		&self.nodes
	}

	pub fn edges(&self) -> &[SceneEdge] {
		&self.edges
	}

	pub fn handle(&self) -> &RenderHandle {
		&self.handle
	}

	pub fn mode(&self) -> LayoutMode {
		self.mode
	}

	pub fn node(&self, key: ElementKey) -> Option<&SceneNode> {
		self.nodes.get(key.0)
	}

	pub fn move_node(&mut self, key: ElementKey, x: f64, y: f64) {
		if let Some(node) = self.nodes.get_mut(key.0) {
			node.x = x;
			node.y = y;
		}
	}

	/// Topmost node under a world-space point.
	pub fn node_at(&self, x: f64, y: f64) -> Option<ElementKey> {
		self.nodes.iter().rev().find(|n| n.contains(x, y)).map(|n| n.key)
	}

	/// Where `edge` leaves its source and meets its target, on the node outlines.
	pub fn edge_endpoints(&self, edge: &SceneEdge) -> Option<((f64, f64), (f64, f64))> {
		let (from, to) = (self.node(edge.from)?, self.node(edge.to)?);
		Some((from.boundary_toward(to.x, to.y), to.boundary_toward(from.x, from.y)))
	}

	pub fn neighbors(&self, key: ElementKey) -> HashSet<ElementKey> {
		self.edges
			.iter()
			.filter_map(|e| {
				if e.from == key {
					Some(e.to)
				} else if e.to == key {
					Some(e.from)
				} else {
					None
				}
			})
			.collect()
	}

	pub fn bounds(&self) -> Bounds {
		let mut nodes = self.nodes.iter();
		let Some(first) = nodes.next() else {
			return Bounds::default();
		};
		let init = Bounds {
			min_x: first.x - first.width / 2.0,
			min_y: first.y - first.height / 2.0,
			max_x: first.x + first.width / 2.0,
			max_y: first.y + first.height / 2.0,
		};
		nodes.fold(init, |b, n| Bounds {
			min_x: b.min_x.min(n.x - n.width / 2.0),
			min_y: b.min_y.min(n.y - n.height / 2.0),
			max_x: b.max_x.max(n.x + n.width / 2.0),
			max_y: b.max_y.max(n.y + n.height / 2.0),
		})
	}
}

/// Triangle with its tip at `to`, pointing along the segment.
pub fn arrowhead(from: (f64, f64), to: (f64, f64), size: f64) -> [(f64, f64); 3] {
	let (dx, dy) = (to.0 - from.0, to.1 - from.1);
	let dist = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
	let (ux, uy) = (dx / dist, dy / dist);
	let (back_x, back_y) = (to.0 - ux * size, to.1 - uy * size);
	let (px, py) = (-uy * size * 0.5, ux * size * 0.5);
	[to, (back_x + px, back_y + py), (back_x - px, back_y - py)]
}

/// Owns the render generation counter of one diagram instance.
#[derive(Clone, Debug, Default)]
pub struct SceneRenderer {
	config: DiagramConfig,
	generation: u64,
}

impl SceneRenderer {
	pub fn new(config: DiagramConfig) -> Self {
		Self {
			config,
			generation: 0,
		}
	}

	pub fn config(&self) -> &DiagramConfig {
		&self.config
	}

	/// Replaces the settings used by later renders. The generation keeps counting.
	pub fn set_config(&mut self, config: DiagramConfig) {
		self.config = config;
	}

	pub fn render(&mut self, spec: &GraphSpec) -> Scene {
		self.generation += 1;
		let opts = &self.config.layout;
		let mode = match opts.mode {
			LayoutMode::Layered if spec.has_positions() => LayoutMode::Fixed,
			mode => mode,
		};

		let edges: Vec<SceneEdge> = spec
			.edges()
			.iter()
			.filter_map(|e| {
				Some(SceneEdge {
					from: ElementKey(spec.node_index(&e.source)?),
					to: ElementKey(spec.node_index(&e.target)?),
					label: e.label.clone(),
					kind: e.kind,
				})
			})
			.collect();

		let mut class_order: Vec<&str> = Vec::new();
		let mut nodes: Vec<SceneNode> = spec
			.nodes()
			.enumerate()
			.map(|(i, n)| {
				let lines: Vec<String> = n.label.split('\n').map(str::to_owned).collect();
				let (width, height) = node_size(&lines, n.shape, opts);
				let (fill, stroke, text_color) = match n.class.as_deref() {
					None => (DEFAULT_FILL.into(), DEFAULT_STROKE.into(), DEFAULT_TEXT.into()),
					Some(class) => {
						let slot = class_order.iter().position(|c| *c == class).unwrap_or_else(|| {
							class_order.push(class);
							class_order.len() - 1
						});
						let style = spec.class_style(class).cloned().unwrap_or_default();
						(
							style
								.fill
								.unwrap_or_else(|| self.config.palette_color(slot).to_owned()),
							style.stroke.unwrap_or_else(|| "#1f2937".into()),
							style.color.unwrap_or_else(|| "#ffffff".into()),
						)
					}
				};
				SceneNode {
					key: ElementKey(i),
					id: n.id.clone(),
					lines,
					shape: n.shape,
					fill,
					stroke,
					text_color,
					x: 0.0,
					y: 0.0,
					width,
					height,
					layer: 0,
				}
			})
			.collect();

		place_layered(&mut nodes, &edges, spec.direction(), opts);
		if mode == LayoutMode::Fixed {
			for (node, declared) in nodes.iter_mut().zip(spec.nodes()) {
				if let Some((x, y)) = declared.position {
					node.x = x;
					node.y = y;
				}
			}
		}

		let handle = RenderHandle::new(self.generation, spec.nodes().map(|n| n.id.as_str()));
		info!(
			"rendered {} nodes, {} edges ({:?}, generation {})",
			nodes.len(),
			edges.len(),
			mode,
			self.generation
		);
		Scene {
			nodes,
			edges,
			handle,
			mode,
		}
	}
}

fn node_size(lines: &[String], shape: NodeShape, opts: &LayoutOptions) -> (f64, f64) {
	let chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f64;
	let w = chars * opts.glyph_width() + 2.0 * opts.padding;
	let h = lines.len().max(1) as f64 * opts.line_height() + 2.0 * opts.padding;
	match shape {
		NodeShape::Diamond => (w * 1.5, h * 1.5),
		NodeShape::Circle => {
			let d = w.max(h);
			(d, d)
		}
		NodeShape::Stadium => (w + h / 2.0, h),
		_ => (w, h),
	}
}

/// Edges closing a cycle in a depth-first walk, in declaration order.
fn back_edges(n: usize, edges: &[SceneEdge]) -> HashSet<usize> {
	#[derive(Clone, Copy, PartialEq)]
	enum Mark {
		New,
		Open,
		Done,
	}

	let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
	for (i, e) in edges.iter().enumerate() {
		out_edges[e.from.0].push(i);
	}

	let mut marks = vec![Mark::New; n];
	let mut back = HashSet::new();
	for root in 0..n {
		if marks[root] != Mark::New {
			continue;
		}
		marks[root] = Mark::Open;
		let mut stack = vec![(root, 0usize)];
		while let Some(top) = stack.last_mut() {
			let node = top.0;
			let Some(&ei) = out_edges[node].get(top.1) else {
				marks[node] = Mark::Done;
				stack.pop();
				continue;
			};
			top.1 += 1;
			let target = edges[ei].to.0;
			match marks[target] {
				Mark::Open => {
					back.insert(ei);
				}
				Mark::New => {
					marks[target] = Mark::Open;
					stack.push((target, 0));
				}
				Mark::Done => {}
			}
		}
	}
	back
}

fn assign_layers(n: usize, forward: &[(usize, usize)]) -> Vec<usize> {
	let mut indegree = vec![0usize; n];
	let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
	for &(a, b) in forward {
		succ[a].push(b);
		indegree[b] += 1;
	}
	let mut layers = vec![0usize; n];
	let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
	while let Some(u) = queue.pop_front() {
		for &v in &succ[u] {
			layers[v] = layers[v].max(layers[u] + 1);
			indegree[v] -= 1;
			if indegree[v] == 0 {
				queue.push_back(v);
			}
		}
	}
	layers
}

fn order_layers(layers: &[usize], forward: &[(usize, usize)]) -> Vec<Vec<usize>> {
	let depth = layers.iter().copied().max().map_or(0, |m| m + 1);
	let mut groups: Vec<Vec<usize>> = vec![Vec::new(); depth];
	for (node, &layer) in layers.iter().enumerate() {
		groups[layer].push(node);
	}

	let sweep = |groups: &mut Vec<Vec<usize>>, li: usize, fixed: usize, downward: bool| {
		let position: HashMap<usize, f64> = groups[fixed]
			.iter()
			.enumerate()
			.map(|(i, &n)| (n, i as f64))
			.collect();
		let mut scored: Vec<(usize, f64)> = groups[li]
			.iter()
			.enumerate()
			.map(|(i, &node)| {
				let linked: Vec<f64> = forward
					.iter()
					.filter_map(|&(a, b)| match downward {
						true if b == node => position.get(&a).copied(),
						false if a == node => position.get(&b).copied(),
						_ => None,
					})
					.collect();
				let score = if linked.is_empty() {
					i as f64
				} else {
					linked.iter().sum::<f64>() / linked.len() as f64
				};
				(node, score)
			})
			.collect();
		scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
		groups[li] = scored.into_iter().map(|(n, _)| n).collect();
	};

	for _ in 0..BARYCENTER_SWEEPS {
		for li in 1..groups.len() {
			sweep(&mut groups, li, li - 1, true);
		}
		for li in (0..groups.len().saturating_sub(1)).rev() {
			sweep(&mut groups, li, li + 1, false);
		}
	}
	groups
}

fn place_layered(
	nodes: &mut [SceneNode],
	edges: &[SceneEdge],
	direction: Direction,
	opts: &LayoutOptions,
) {
	let back = back_edges(nodes.len(), edges);
	let forward: Vec<(usize, usize)> = edges
		.iter()
		.enumerate()
		.filter(|(i, e)| !back.contains(i) && e.from != e.to)
		.map(|(_, e)| (e.from.0, e.to.0))
		.collect();
	let layers = assign_layers(nodes.len(), &forward);
	let groups = order_layers(&layers, &forward);

	let horizontal = direction.is_horizontal();
	// (along the layer axis, across it)
	let extents = |n: &SceneNode| {
		if horizontal {
			(n.width, n.height)
		} else {
			(n.height, n.width)
		}
	};

	let mut main = 0.0;
	for group in &groups {
		let thickness = group
			.iter()
			.map(|&i| extents(&nodes[i]).0)
			.fold(0.0, f64::max);
		let total: f64 = group.iter().map(|&i| extents(&nodes[i]).1).sum::<f64>()
			+ opts.node_spacing * group.len().saturating_sub(1) as f64;
		let mut cross = -total / 2.0;
		for &i in group {
			let (_, extent) = extents(&nodes[i]);
			let along = main + thickness / 2.0;
			let across = cross + extent / 2.0;
			let along = if direction.is_reversed() { -along } else { along };
			let node = &mut nodes[i];
			(node.x, node.y) = if horizontal {
				(along, across)
			} else {
				(across, along)
			};
			node.layer = layers[i];
			cross += extent + opts.node_spacing;
		}
		main += thickness + opts.layer_spacing;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::mermaid::parse_flowchart;
	use crate::components::diagram::types::NodeSpec;

	fn render(src: &str) -> Scene {
		SceneRenderer::default().render(&parse_flowchart(src).unwrap())
	}

	fn node<'a>(scene: &'a Scene, id: &str) -> &'a SceneNode {
		let key = scene.handle().key_of(id).unwrap();
		scene.node(key).unwrap()
	}

	#[test]
	fn layers_follow_longest_path_and_ignore_back_edges() {
		let scene = render("flowchart TD\nA --> B --> C\nA --> C\nC --> D\nD --> B");
		let layer = |id| node(&scene, id).layer;
		assert_eq!((layer("A"), layer("B"), layer("C"), layer("D")), (0, 1, 2, 3));
		assert!(node(&scene, "A").y < node(&scene, "B").y);
		assert!(node(&scene, "C").y < node(&scene, "D").y);
	}

	#[test]
	fn direction_sets_the_main_axis() {
		let lr = render("flowchart LR\nA --> B");
		assert!(node(&lr, "A").x < node(&lr, "B").x);
		assert_eq!(node(&lr, "A").y, node(&lr, "B").y);

		let bt = render("flowchart BT\nA --> B");
		assert!(node(&bt, "A").y > node(&bt, "B").y);
	}

	#[test]
	fn siblings_do_not_overlap() {
		let scene = render("flowchart TD\nR --> A\nR --> B");
		let (a, b) = (node(&scene, "A"), node(&scene, "B"));
		assert_eq!(a.y, b.y);
		assert!((a.x - b.x).abs() >= (a.width + b.width) / 2.0);
	}

	#[test]
	fn fixed_positions_win() {
		let spec = GraphSpec::builder()
			.node(NodeSpec::new("a", "A").at(300.0, -20.0))
			.node(NodeSpec::new("b", "B"))
			.edge("a", "b")
			.build()
			.unwrap();
		let scene = SceneRenderer::default().render(&spec);
		assert_eq!(scene.mode(), LayoutMode::Fixed);
		assert_eq!((node(&scene, "a").x, node(&scene, "a").y), (300.0, -20.0));
	}

	#[test]
	fn hit_testing_respects_shapes() {
		let scene = render("flowchart TD\nQ{Decide}");
		let q = node(&scene, "Q");
		assert_eq!(scene.node_at(q.x, q.y), Some(q.key));
		let corner = (q.x + q.width / 2.0 - 1.0, q.y + q.height / 2.0 - 1.0);
		assert_eq!(scene.node_at(corner.0, corner.1), None);
		assert_eq!(scene.node_at(q.x + 1000.0, q.y), None);

		let (bx, by) = q.boundary_toward(q.x + 500.0, q.y);
		assert!((bx - (q.x + q.width / 2.0)).abs() < 1e-9);
		assert_eq!(by, q.y);
	}

	#[test]
	fn edges_end_on_node_outlines() {
		let scene = render("flowchart LR\nA --> B");
		let (a, b) = (node(&scene, "A"), node(&scene, "B"));
		let ((x1, y1), (x2, y2)) = scene.edge_endpoints(&scene.edges()[0]).unwrap();
		assert!((x1 - (a.x + a.width / 2.0)).abs() < 1e-9 && (y1 - a.y).abs() < 1e-9);
		assert!((x2 - (b.x - b.width / 2.0)).abs() < 1e-9);

		let [tip, left, right] = arrowhead((0.0, 0.0), (10.0, 0.0), 4.0);
		assert_eq!(tip, (10.0, 0.0));
		assert_eq!((left.0, right.0), (6.0, 6.0));
		assert_eq!(left.1, -right.1);
	}

	#[test]
	fn each_render_advances_the_generation() {
		let spec = parse_flowchart("flowchart TD\nA --> B").unwrap();
		let mut renderer = SceneRenderer::default();
		let first = renderer.render(&spec);
		let second = renderer.render(&spec);
		assert_eq!(first.handle().generation() + 1, second.handle().generation());
		assert_eq!(second.handle().len(), 2);
		assert_eq!(second.neighbors(ElementKey(0)), HashSet::from([ElementKey(1)]));
	}

	#[test]
	fn empty_spec_renders_nothing() {
		let scene = SceneRenderer::default().render(&GraphSpec::default());
		assert!(scene.nodes().is_empty());
		assert!(scene.handle().is_empty());
		assert_eq!(scene.bounds(), Bounds::default());
	}

	#[test]
	fn class_colours() {
		let scene = render(
			"flowchart TD\nA:::hot --> B:::cold\nC\nclassDef hot fill:#f97316,color:#000",
		);
		assert_eq!(node(&scene, "A").fill, "#f97316");
		assert_eq!(node(&scene, "A").text_color, "#000");
		assert_eq!(node(&scene, "B").fill, DiagramConfig::default().palette_color(1));
		assert_eq!(node(&scene, "C").fill, DEFAULT_FILL);
	}
}
