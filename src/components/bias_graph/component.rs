use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{BiasGraphState, Release};
use crate::graph::Explorer;

/// Called with the id of the node the user clicked.
pub type NodeHandler = Rc<dyn Fn(String)>;

fn viewport(window: &Window) -> (f64, f64) {
	let size = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
	(size(window.inner_width()), size(window.inner_height()))
}

/// Canvas size from explicit props, else from the parent element.
fn fitted_size(canvas: &HtmlCanvasElement, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| parent.as_ref().map_or(800.0, |p| p.client_width() as f64)),
		height.unwrap_or_else(|| parent.as_ref().map_or(600.0, |p| p.client_height() as f64)),
	)
}

#[component]
pub fn BiasGraphCanvas(
	explorer: Rc<RefCell<Explorer>>,
	/// Click on a speculative node.
	on_expand: NodeHandler,
	/// Click on a confirmed node.
	on_select: NodeHandler,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<BiasGraphState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, explorer_init) =
		(state.clone(), animate.clone(), resize_cb.clone(), explorer.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let (w, h) = if fullscreen {
			viewport(&window)
		} else {
			fitted_size(&canvas, width, height)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();
		*state_init.borrow_mut() = Some(BiasGraphState::new(w, h));

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = viewport(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner, explorer_anim) =
			(state_init.clone(), animate_init.clone(), explorer_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				let (graph, expanding) = {
					let explorer = explorer_anim.borrow();
					(explorer.graph(), explorer.gate().in_flight())
				};
				render::render(s, &graph, expanding.as_deref(), &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = web_sys::window()
					.unwrap()
					.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// client coordinates relative to the canvas origin
	let pointer = move |ev: &MouseEvent| {
		let (left, top) = canvas_ref.get().map_or((0.0, 0.0), |c| {
			let rect = c.get_bounding_client_rect();
			(rect.left(), rect.top())
		});
		(ev.client_x() as f64 - left, ev.client_y() as f64 - top)
	};

	let (state_md, explorer_md) = (state.clone(), explorer.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let (x, y) = pointer(&ev);
		if let Some(ref mut s) = *state_md.borrow_mut() {
			let graph = explorer_md.borrow().graph();
			match s.node_at_position(&graph, x, y) {
				Some(id) => s.begin_drag(&graph, &id, x, y),
				None => s.begin_pan(x, y),
			}
		}
	};

	let (state_mm, explorer_mm) = (state.clone(), explorer.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let (x, y) = pointer(&ev);
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.drag.node.is_some() {
				s.drag_move(explorer_mm.borrow_mut().graph_mut(), x, y);
			} else if s.pan.active {
				s.pan_move(x, y);
			} else {
				let graph = explorer_mm.borrow().graph();
				let hovered = s.node_at_position(&graph, x, y);
				s.set_hover(&graph, hovered);
			}
		}
	};

	let (state_mu, explorer_mu) = (state.clone(), explorer.clone());
	let on_mouseup = move |_: MouseEvent| {
		let release = match *state_mu.borrow_mut() {
			Some(ref mut s) => {
				s.pan.active = false;
				s.end_drag(&explorer_mu.borrow().graph())
			}
			None => Release::None,
		};
		// handlers may touch the explorer, so no borrows are held here
		if let Release::Clicked(id) = release {
			let speculative = explorer_mu
				.borrow()
				.graph()
				.node(&id)
				.is_some_and(|n| n.kind.is_speculative());
			if speculative {
				on_expand(id);
			} else {
				on_select(id);
			}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.cancel();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let (x, y) = pointer(ev.as_ref());
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.zoom_at(x, y, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="bias-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
