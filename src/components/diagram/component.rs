use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::annotations::AnnotationMap;
use super::config::DiagramConfig;
use super::data::{DiagramDocument, download_json, positions_json};
use super::panel::{DetailPanel, follow_offset};
use super::query::InteractionFlags;
use super::render;
use super::state::DiagramState;
use super::types::GraphSpec;

/// Pointer travel under which a press and release count as a click.
const CLICK_SLOP: f64 = 4.0;

/// Cells shared by the animation frame callback, the resize listener and the
/// mouse handlers of one mounted diagram.
///
/// The frame callback holds a clone of `frame`, so the loop keeps itself alive
/// until [`release`](Self::release) takes the callback out.
struct FrameLoop<S, C> {
	mounted: Arc<AtomicBool>,
	state: Rc<RefCell<Option<S>>>,
	frame: Rc<RefCell<Option<C>>>,
	resize: Rc<RefCell<Option<C>>>,
}

impl<S, C> Clone for FrameLoop<S, C> {
	fn clone(&self) -> Self {
		Self {
			mounted: self.mounted.clone(),
			state: self.state.clone(),
			frame: self.frame.clone(),
			resize: self.resize.clone(),
		}
	}
}

impl<S, C> FrameLoop<S, C> {
	fn new() -> Self {
		Self {
			mounted: Arc::new(AtomicBool::new(true)),
			state: Rc::new(RefCell::new(None)),
			frame: Rc::new(RefCell::new(None)),
			resize: Rc::new(RefCell::new(None)),
		}
	}

	/// Callback for the owner's cleanup. Only flips the flag, so it is `Send`.
	fn unmount_trigger(&self) -> impl Fn() + Send + Sync + 'static {
		let mounted = self.mounted.clone();
		move || mounted.store(false, Ordering::Release)
	}

	fn is_mounted(&self) -> bool {
		self.mounted.load(Ordering::Acquire)
	}

	/// Drops the diagram and the frame callback. Returns the resize callback
	/// so it can be detached from the window before it is dropped.
	fn release(&self) -> Option<C> {
		self.state.borrow_mut().take();
		self.frame.borrow_mut().take();
		self.resize.borrow_mut().take()
	}
}

type JsCallback = Closure<dyn FnMut()>;

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Panel offset for a pointer at `ev`, measured against the diagram wrapper.
fn panel_offset(wrap_ref: NodeRef<leptos::html::Div>, ev: &MouseEvent) -> Option<f64> {
	let wrap = wrap_ref.get()?;
	let text = wrap.query_selector(".detail-panel-text").ok()??;
	let rect = wrap.get_bounding_client_rect();
	Some(follow_offset(
		ev.client_y() as f64 - rect.top(),
		wrap.client_height() as f64,
		text.client_height() as f64,
	))
}

/// Canvas rendition of an annotated diagram with its detail panel.
///
/// Hovering a node shows its annotation in the panel; clicking focuses its
/// neighbourhood. Zoom, pan and node dragging follow the page's
/// [`InteractionFlags`] unless `flags` is given. A new `spec`, `annotations`
/// or `config` re-renders the live canvas in place.
#[component]
pub fn AnnotatedDiagram(
	#[prop(into)] spec: Signal<GraphSpec>,
	#[prop(into)] annotations: Signal<AnnotationMap>,
	#[prop(optional, into)] config: Option<Signal<DiagramConfig>>,
	/// Source document, used by "Save positions" to write a complete `data.json`.
	#[prop(optional, into)]
	document: Option<Signal<Option<DiagramDocument>>>,
	#[prop(optional)] flags: Option<InteractionFlags>,
	#[prop(optional, into)] title: Option<String>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let config = config.unwrap_or_else(|| Signal::stored(DiagramConfig::default()));
	let flags = flags.unwrap_or_else(InteractionFlags::from_location);
	let panel_text = RwSignal::new(config.with_untracked(|c| c.default_text.clone()));
	let panel_top = RwSignal::new(0.0);
	let hovering = RwSignal::new(false);

	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let wrap_ref = NodeRef::<leptos::html::Div>::new();
	let frames: FrameLoop<DiagramState, JsCallback> = FrameLoop::new();
	let state = frames.state.clone();
	let press: Rc<Cell<Option<(f64, f64)>>> = Rc::new(Cell::new(None));
	let frames_init = frames.clone();

	Effect::new(move |_| {
		let (spec, annotations, config) = (spec.get(), annotations.get(), config.get());

		// A live diagram re-renders in place and keeps its animation loop.
		if let Some(ref mut s) = *frames_init.state.borrow_mut() {
			s.set_config(config);
			s.set_annotations(annotations);
			s.set_spec(&spec);
			panel_text.set(s.panel_text().to_owned());
			hovering.set(false);
			return;
		}

		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			error!("no window to draw the diagram in");
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.filter(|w| *w > 0.0)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.filter(|h| *h > 0.0)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
		let Some(ctx) = ctx else {
			error!("canvas 2d context unavailable");
			return;
		};
		let diagram = DiagramState::new(&spec, annotations, config, flags, w, h);
		panel_text.set(diagram.panel_text().to_owned());
		*frames_init.state.borrow_mut() = Some(diagram);

		if fullscreen {
			let (state_resize, canvas_resize) = (frames_init.state.clone(), canvas.clone());
			*frames_init.resize.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *frames_init.resize.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let frames_anim = frames_init.clone();
		*frames_init.frame.borrow_mut() = Some(Closure::new(move || {
			if !frames_anim.is_mounted() {
				if let (Some(cb), Some(win)) = (frames_anim.release(), web_sys::window()) {
					let listener: &js_sys::Function = cb.as_ref().unchecked_ref();
					let _ = win.remove_event_listener_with_callback("resize", listener);
				}
				debug!("diagram unmounted, frame loop stopped");
				return;
			}
			if let Some(ref mut s) = *frames_anim.state.borrow_mut() {
				if s.animation_running {
					s.tick(0.016);
				}
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*frames_anim.frame.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *frames_init.frame.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// The next frame sees the flag, detaches the listeners and drops the loop.
	on_cleanup(frames.unmount_trigger());

	let (state_md, press_md) = (state.clone(), press.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		press_md.set(Some((x, y)));
		if let Some(ref mut s) = *state_md.borrow_mut() {
			match s.node_at_position(x, y) {
				Some(key) if s.flags.allows_node_drag() => s.begin_drag(key, x, y),
				Some(_) => {}
				None if s.flags.allows_zoom_and_pan() => s.begin_pan(x, y),
				None => {}
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.drag.active {
				s.drag_to(x, y);
				return;
			}
			let hovered = s.node_at_position(x, y);
			if s.set_hover(hovered) {
				panel_text.set(s.panel_text().to_owned());
				hovering.set(hovered.is_some());
			}
			if hovered.is_some() && s.config().panel_follows_pointer {
				if let Some(top) = panel_offset(wrap_ref, &ev) {
					panel_top.set(top);
				}
			}
			s.pan_to(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.end_gestures();
		}
	};

	let (state_cl, press_cl) = (state.clone(), press.clone());
	let on_click = move |ev: MouseEvent| {
		let (Some((x, y)), Some((px, py))) = (local_point(canvas_ref, &ev), press_cl.take()) else {
			return;
		};
		if (x - px).hypot(y - py) > CLICK_SLOP {
			return;
		}
		if let Some(ref mut s) = *state_cl.borrow_mut() {
			let target = s.node_at_position(x, y);
			let focused = s.click(target);
			debug!("focus {:?}", focused);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.end_gestures();
			if s.set_hover(None) {
				panel_text.set(s.panel_text().to_owned());
				hovering.set(false);
			}
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		if !flags.allows_zoom_and_pan() {
			return;
		}
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom(x, y, ev.delta_y() < 0.0);
		}
	};

	let state_save = state.clone();
	let save_positions = move |_: MouseEvent| {
		let Some(ref s) = *state_save.borrow() else {
			return;
		};
		let json = match document.and_then(|d| d.get()) {
			Some(doc) => doc.export_positions(&s.scene),
			None => positions_json(&s.scene),
		};
		let saved = json
			.map_err(|e| JsValue::from_str(&e.to_string()))
			.and_then(|json| download_json("data.json", &json));
		if let Err(err) = saved {
			error!("saving positions failed: {err:?}");
		}
	};

	view! {
		<div class="annotated-diagram" node_ref=wrap_ref>
			<canvas
				node_ref=canvas_ref
				class="annotated-diagram-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:click=on_click
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style:display="block"
				style:cursor=move || if hovering.get() { "pointer" } else { "default" }
			/>
			{flags.save.then(|| view! {
				<button class="save-positions" on:click=save_positions>"Save positions"</button>
			})}
			<DetailPanel text=panel_text title=title offset=panel_top />
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn released_loop_drops_its_self_reference() {
		let frames: FrameLoop<u32, Box<dyn FnMut()>> = FrameLoop::new();
		*frames.state.borrow_mut() = Some(7);
		let inner = frames.clone();
		*frames.frame.borrow_mut() = Some(Box::new(move || {
			inner.is_mounted();
		}));
		*frames.resize.borrow_mut() = Some(Box::new(|| {}));
		assert_eq!(Rc::strong_count(&frames.frame), 2);
		assert!(frames.is_mounted());

		frames.unmount_trigger()();
		assert!(!frames.is_mounted());
		assert!(frames.release().is_some());
		assert_eq!(Rc::strong_count(&frames.frame), 1);
		assert!(frames.state.borrow().is_none());
		assert!(frames.release().is_none());
	}
}
