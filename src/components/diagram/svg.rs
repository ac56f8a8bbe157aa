//! Inline SVG rendition of a diagram.
//!
//! Every node is drawn as `<g class="node" id="flowchart-…">`. Pointer events
//! are handled once on the `<svg>` root and resolved back to nodes through the
//! [`RenderHandle`](super::handle::RenderHandle) of the current scene.

use std::collections::HashSet;

use leptos::prelude::*;
use log::debug;
use wasm_bindgen::JsCast;
use web_sys::{Element, EventTarget, MouseEvent};

use super::annotations::AnnotationMap;
use super::binder::AnnotationBinder;
use super::config::DiagramConfig;
use super::handle::ElementKey;
use super::panel::DetailPanel;
use super::scene::{Scene, SceneEdge, SceneNode, SceneRenderer, arrowhead};
use super::types::{GraphSpec, NodeShape};

const VIEW_MARGIN: f64 = 16.0;
const ARROW_SIZE: f64 = 8.0;

/// DOM id of the node group enclosing `target`, if any.
fn node_element_id(target: Option<EventTarget>) -> Option<String> {
	let element: Element = target?.dyn_into().ok()?;
	Some(element.closest("g.node").ok()??.id())
}

fn fmt_points(points: &[(f64, f64)]) -> String {
	points
		.iter()
		.map(|(x, y)| format!("{x:.1},{y:.1}"))
		.collect::<Vec<_>>()
		.join(" ")
}

fn shape_view(node: &SceneNode) -> AnyView {
	let (x, y, w, h) = (node.x, node.y, node.width, node.height);
	let (fill, stroke) = (node.fill.clone(), node.stroke.clone());
	match node.shape {
		NodeShape::Rect | NodeShape::Rounded | NodeShape::Stadium => {
			let rx = match node.shape {
				NodeShape::Rect => 0.0,
				NodeShape::Rounded => 5.0,
				_ => h / 2.0,
			};
			view! {
				<rect
					x={x - w / 2.0}
					y={y - h / 2.0}
					width=w
					height=h
					rx=rx
					fill=fill
					stroke=stroke
				/>
			}
			.into_any()
		}
		NodeShape::Diamond => {
			let points = fmt_points(&[
				(x, y - h / 2.0),
				(x + w / 2.0, y),
				(x, y + h / 2.0),
				(x - w / 2.0, y),
			]);
			view! { <polygon points=points fill=fill stroke=stroke /> }.into_any()
		}
		NodeShape::Circle => {
			view! { <circle cx=x cy=y r={w / 2.0} fill=fill stroke=stroke /> }.into_any()
		}
	}
}

fn node_view<F>(
	node: &SceneNode,
	element_id: String,
	font_px: f64,
	line_height: f64,
	visible: F,
	hovered: RwSignal<Option<ElementKey>>,
) -> impl IntoView + use<F>
where
	F: Fn(ElementKey) -> bool + Send + Sync + 'static,
{
	let key = node.key;
	let top = node.y - line_height * (node.lines.len() as f64 - 1.0) / 2.0;
	let (x, color) = (node.x, node.text_color.clone());
	let lines = node
		.lines
		.iter()
		.enumerate()
		.map(|(i, line)| {
			view! {
				<text
					x=x
					y={top + i as f64 * line_height}
					text-anchor="middle"
					dominant-baseline="middle"
					font-size=font_px
					fill={color.clone()}
				>
					{line.clone()}
				</text>
			}
		})
		.collect_view();

	view! {
		<g
			class="node"
			class:hovered=move || hovered.get() == Some(key)
			id=element_id
			style:opacity=move || if visible(key) { "1" } else { "0.2" }
			style:cursor="pointer"
		>
			{shape_view(node)}
			{lines}
		</g>
	}
}

fn edge_view(scene: &Scene, edge: &SceneEdge, font_px: f64) -> Option<impl IntoView + use<>> {
	let ((x1, y1), (x2, y2)) = scene.edge_endpoints(edge)?;
	let head = edge.kind.has_arrow().then(|| {
		let points = fmt_points(&arrowhead((x1, y1), (x2, y2), ARROW_SIZE));
		view! { <polygon class="edge-arrow" points=points fill="#333333" /> }
	});
	let (lx2, ly2) = if edge.kind.has_arrow() {
		let [_, left, right] = arrowhead((x1, y1), (x2, y2), ARROW_SIZE);
		((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0)
	} else {
		(x2, y2)
	};
	let width = if edge.kind.is_thick() { 3.0 } else { 1.5 };
	let dash = edge.kind.is_dotted().then_some("3 3");
	let label = edge.label.clone().map(|text| {
		view! {
			<text
				class="edge-label"
				x={(x1 + x2) / 2.0}
				y={(y1 + y2) / 2.0}
				text-anchor="middle"
				dominant-baseline="middle"
				font-size={font_px * 0.85}
				fill="#333333"
			>
				{text}
			</text>
		}
	});
	Some(view! {
		<g class="edge">
			<line
				x1=x1
				y1=y1
				x2=lx2
				y2=ly2
				stroke="#333333"
				stroke-width=width
				stroke-dasharray=dash
			/>
			{head}
			{label}
		</g>
	})
}

/// SVG rendition of an annotated diagram with its detail panel.
#[component]
pub fn SvgDiagram(
	#[prop(into)] spec: Signal<GraphSpec>,
	#[prop(into)] annotations: Signal<AnnotationMap>,
	#[prop(optional)] config: Option<DiagramConfig>,
	#[prop(optional, into)] title: Option<String>,
) -> impl IntoView {
	let config = config.unwrap_or_default();
	let (font_px, line_height) = (config.layout.font_px, config.layout.line_height());
	let panel = config.panel();
	let panel_text = RwSignal::new(panel.text().to_owned());
	let hovered = RwSignal::new(None::<ElementKey>);
	let focused = RwSignal::new(None::<ElementKey>);

	let renderer = StoredValue::new(SceneRenderer::new(config));
	let binder = StoredValue::new(AnnotationBinder::new(AnnotationMap::default(), panel.clone()));

	// Phase one: render.
	let scene = Memo::new(move |_| {
		let spec = spec.get();
		renderer
			.try_update_value(|r| r.render(&spec))
			.unwrap_or_default()
	});

	// Phase two: bind the rendered handle to the annotations.
	Effect::new(move |_| {
		let annotations = annotations.get();
		scene.with(|scene| {
			let mut fresh = AnnotationBinder::new(annotations, panel.clone());
			fresh.bind(scene.handle());
			binder.set_value(fresh);
		});
		hovered.set(None);
		focused.set(None);
		panel_text.set(binder.with_value(|b| b.panel().text().to_owned()));
	});

	let focus_set = Memo::new(move |_| {
		focused.get().map(|key| {
			let mut set: HashSet<ElementKey> = scene.with(|s| s.neighbors(key));
			set.insert(key);
			set
		})
	});
	let visible =
		move |key: ElementKey| focus_set.with(|f| f.as_ref().is_none_or(|s| s.contains(&key)));

	let resolve = move |target: Option<EventTarget>| {
		let element_id = node_element_id(target)?;
		scene.with_untracked(|s| s.handle().resolve_element_id(&element_id))
	};

	let on_mouseover = move |ev: MouseEvent| {
		let Some(key) = resolve(ev.target()) else {
			return;
		};
		if hovered.get_untracked() == Some(key) {
			return;
		}
		let text = binder
			.try_update_value(|b| b.pointer_enter(key).map(str::to_owned))
			.flatten();
		if let Some(text) = text {
			hovered.set(Some(key));
			panel_text.set(text);
		}
	};

	let on_mouseout = move |ev: MouseEvent| {
		let Some(key) = resolve(ev.target()) else {
			return;
		};
		// Moving between children of the same node is not a leave.
		if resolve(ev.related_target()) == Some(key) {
			return;
		}
		if let Some(text) = binder.try_update_value(|b| b.pointer_leave(key).to_owned()) {
			hovered.set(None);
			panel_text.set(text);
		}
	};

	let on_click = move |ev: MouseEvent| {
		let key = resolve(ev.target());
		let selected = binder
			.try_update_value(|b| {
				let id = b.select(key).map(str::to_owned);
				(b.selected(), id)
			})
			.unwrap_or_default();
		debug!("focus {:?}", selected.1);
		focused.set(selected.0);
	};

	let view_box = move || {
		scene.with(|s| {
			let b = s.bounds();
			format!(
				"{} {} {} {}",
				b.min_x - VIEW_MARGIN,
				b.min_y - VIEW_MARGIN,
				b.width() + 2.0 * VIEW_MARGIN,
				b.height() + 2.0 * VIEW_MARGIN
			)
		})
	};

	view! {
		<div class="annotated-diagram">
			<svg
				class="annotated-diagram-svg"
				viewBox=view_box
				preserveAspectRatio="xMidYMid meet"
				on:mouseover=on_mouseover
				on:mouseout=on_mouseout
				on:click=on_click
			>
				{move || {
					scene
						.with(|s| {
							s.edges().iter().filter_map(|e| edge_view(s, e, font_px)).collect_view()
						})
				}}
				{move || {
					scene
						.with(|s| {
							s.nodes()
								.iter()
								.map(|n| {
									let element_id =
										s.handle().element_id(n.key).unwrap_or_default();
									node_view(n, element_id, font_px, line_height, visible, hovered)
								})
								.collect_view()
						})
				}}
			</svg>
			<DetailPanel text=panel_text title=title />
		</div>
	}
}
