use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::scene::{SceneNode, arrowhead};
use super::state::DiagramState;
use super::types::NodeShape;

const EDGE_COLOR: &str = "51, 51, 51";

pub fn render(state: &DiagramState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(&state.config().background);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

/// Opacity multiplier for elements outside the clicked node's neighbourhood.
fn focus_alpha(focused: bool) -> f64 {
	if focused { 1.0 } else { 0.2 }
}

fn draw_edges(state: &DiagramState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let arrow_size = 8.0 / k.max(0.5);
	let t = state.highlight_ease();
	let has_highlight = state.has_active_highlight();
	let font_px = state.config().layout.font_px * 0.85;

	for edge in state.scene.edges() {
		let Some(((x1, y1), (x2, y2))) = state.scene.edge_endpoints(edge) else {
			continue;
		};
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let is_highlighted = state.is_highlighted(edge.from) && state.is_highlighted(edge.to);
		let focused = state.is_focused(edge.from) && state.is_focused(edge.to);
		let (mut alpha, mut width) = (0.8, if edge.kind.is_thick() { 3.0 } else { 1.5 });
		if has_highlight {
			if is_highlighted {
				alpha += 0.2 * t;
				width *= 1.0 + 0.3 * t;
			} else {
				alpha -= 0.55 * t;
				width *= 1.0 - 0.3 * t;
			}
		}
		alpha *= focus_alpha(focused);

		ctx.set_stroke_style_str(&format!("rgba({EDGE_COLOR}, {alpha})"));
		ctx.set_line_width(width);
		if edge.kind.is_dotted() {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(3.0),
				&JsValue::from_f64(3.0),
			));
			ctx.set_line_dash_offset(-(state.flow_time * 12.0) % 6.0);
		}

		let (ux, uy) = (dx / dist, dy / dist);
		let inset = if edge.kind.has_arrow() { arrow_size } else { 0.0 };
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2 - ux * inset, y2 - uy * inset);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		if edge.kind.has_arrow() {
			let [tip, left, right] = arrowhead((x1, y1), (x2, y2), arrow_size);
			ctx.set_fill_style_str(&format!("rgba({EDGE_COLOR}, {alpha})"));
			ctx.begin_path();
			ctx.move_to(tip.0, tip.1);
			ctx.line_to(left.0, left.1);
			ctx.line_to(right.0, right.1);
			ctx.close_path();
			ctx.fill();
		}

		if let Some(label) = &edge.label {
			let (mx, my) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
			ctx.set_font(&format!("{font_px}px sans-serif"));
			let text_w = ctx.measure_text(label).map(|m| m.width()).unwrap_or(0.0);
			let backdrop = 0.9 * focus_alpha(focused);
			ctx.set_fill_style_str(&format!("rgba(232, 232, 232, {backdrop})"));
			ctx.fill_rect(
				mx - text_w / 2.0 - 2.0,
				my - font_px / 2.0 - 2.0,
				text_w + 4.0,
				font_px + 4.0,
			);
			ctx.set_fill_style_str(&format!("rgba({EDGE_COLOR}, {alpha})"));
			ctx.set_text_align("center");
			ctx.set_text_baseline("middle");
			let _ = ctx.fill_text(label, mx, my);
		}
	}
}

fn trace_shape(ctx: &CanvasRenderingContext2d, node: &SceneNode, scale: f64) {
	let (x, y) = (node.x, node.y);
	let (hw, hh) = (node.width * scale / 2.0, node.height * scale / 2.0);
	ctx.begin_path();
	match node.shape {
		NodeShape::Rect => ctx.rect(x - hw, y - hh, 2.0 * hw, 2.0 * hh),
		NodeShape::Rounded | NodeShape::Stadium => {
			let r = if node.shape == NodeShape::Stadium { hh } else { 5.0_f64.min(hh) };
			ctx.move_to(x - hw + r, y - hh);
			ctx.line_to(x + hw - r, y - hh);
			let _ = ctx.arc_to(x + hw, y - hh, x + hw, y - hh + r, r);
			ctx.line_to(x + hw, y + hh - r);
			let _ = ctx.arc_to(x + hw, y + hh, x + hw - r, y + hh, r);
			ctx.line_to(x - hw + r, y + hh);
			let _ = ctx.arc_to(x - hw, y + hh, x - hw, y + hh - r, r);
			ctx.line_to(x - hw, y - hh + r);
			let _ = ctx.arc_to(x - hw, y - hh, x - hw + r, y - hh, r);
			ctx.close_path();
		}
		NodeShape::Diamond => {
			ctx.move_to(x, y - hh);
			ctx.line_to(x + hw, y);
			ctx.line_to(x, y + hh);
			ctx.line_to(x - hw, y);
			ctx.close_path();
		}
		NodeShape::Circle => {
			let _ = ctx.arc(x, y, hw, 0.0, 2.0 * PI);
		}
	}
}

fn draw_label(state: &DiagramState, ctx: &CanvasRenderingContext2d, node: &SceneNode, alpha: f64) {
	let layout = &state.config().layout;
	let line_height = layout.line_height();
	ctx.set_global_alpha(alpha);
	ctx.set_fill_style_str(&node.text_color);
	ctx.set_font(&format!("{}px sans-serif", layout.font_px));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let top = node.y - line_height * (node.lines.len() as f64 - 1.0) / 2.0;
	for (i, line) in node.lines.iter().enumerate() {
		let _ = ctx.fill_text(line, node.x, top + i as f64 * line_height);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_node(
	state: &DiagramState,
	ctx: &CanvasRenderingContext2d,
	node: &SceneNode,
	scale: f64,
	alpha: f64,
) {
	let k = state.transform.k;
	ctx.set_global_alpha(alpha);
	trace_shape(ctx, node, scale);
	ctx.set_fill_style_str(&node.fill);
	ctx.fill();
	ctx.set_stroke_style_str(&node.stroke);
	ctx.set_line_width(1.0 / k.max(0.5));
	ctx.stroke();
	if state.focus == Some(node.key) {
		trace_shape(ctx, node, scale + 0.1);
		ctx.set_line_width(2.0 / k.max(0.5));
		ctx.stroke();
	}
	ctx.set_global_alpha(1.0);
	draw_label(state, ctx, node, alpha);
}

fn draw_nodes(state: &DiagramState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		state.highlight_ease(),
		state.transform.k,
	);

	for node in state.scene.nodes() {
		if has_highlight && state.is_highlighted(node.key) {
			continue;
		}
		let alpha = if has_highlight { 1.0 - 0.6 * t } else { 1.0 };
		draw_node(state, ctx, node, 1.0, alpha * focus_alpha(state.is_focused(node.key)));
	}

	if !has_highlight {
		return;
	}

	// Highlighted nodes on top, with a glow behind the hovered one.
	for node in state.scene.nodes() {
		if !state.is_highlighted(node.key) {
			continue;
		}
		let is_hovered = state.is_hovered(node.key);
		let scale = state.node_scale(node.key);

		if is_hovered && t > 0.01 {
			let glow = node.width.max(node.height) * (0.6 + 0.3 * t);
			let gradient =
				ctx.create_radial_gradient(node.x, node.y, glow * 0.3, node.x, node.y, glow);
			if let Ok(gradient) = gradient {
				let _ = gradient.add_color_stop(0.0, &format!("rgba(147, 112, 219, {})", 0.35 * t));
				let _ = gradient.add_color_stop(1.0, "rgba(147, 112, 219, 0)");
				ctx.begin_path();
				let _ = ctx.arc(node.x, node.y, glow, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		draw_node(state, ctx, node, scale, focus_alpha(state.is_focused(node.key)));

		if is_hovered && t > 0.01 {
			trace_shape(ctx, node, scale + 4.0 / (k * node.width.max(1.0)));
			ctx.set_stroke_style_str(&format!("rgba(147, 112, 219, {})", 0.8 * t));
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}
	}
}
