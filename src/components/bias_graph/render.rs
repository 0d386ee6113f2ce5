use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{BiasGraphState, NODE_RADIUS};
use crate::graph::{EdgeTone, Graph, GraphNode, NodeKind};

const BACKGROUND: &str = "#1a1a2e";
const LABEL_CHARS: usize = 28;

pub fn node_color(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::Original => "#4f8cff",
		NodeKind::ConfirmedBias => "#e5484d",
		NodeKind::ConfirmedDebias => "#30a46c",
		NodeKind::ConfirmedControl => "#8e8c99",
		NodeKind::SpeculativeBias => "rgba(229, 72, 77, 0.35)",
		NodeKind::SpeculativeDebias => "rgba(48, 164, 108, 0.35)",
	}
}

pub fn edge_rgb(tone: EdgeTone) -> (u8, u8, u8) {
	match tone {
		EdgeTone::Bias => (229, 72, 77),
		EdgeTone::Debias => (48, 164, 108),
		EdgeTone::Neutral => (100, 180, 255),
	}
}

fn short_label(node: &GraphNode) -> String {
	let label = node.label().unwrap_or(&node.id);
	if label.chars().count() > LABEL_CHARS {
		let cut: String = label.chars().take(LABEL_CHARS - 1).collect();
		format!("{cut}…")
	} else {
		label.to_string()
	}
}

pub fn render(
	state: &BiasGraphState,
	graph: &Graph,
	expanding: Option<&str>,
	ctx: &CanvasRenderingContext2d,
) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, graph, ctx);
	draw_nodes(state, graph, expanding, ctx);
	ctx.restore();
}

fn draw_edges(state: &BiasGraphState, graph: &Graph, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let highlight = state.has_active_highlight();

	for edge in &graph.edges {
		let Some(target) = edge.target.as_deref() else {
			continue;
		};
		let (Some(n1), Some(n2)) = (graph.node(&edge.source), graph.node(target)) else {
			continue;
		};
		let (x1, y1, x2, y2) = (n1.position.x, n1.position.y, n2.position.x, n2.position.y);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let lit = state.is_highlighted(&edge.source) && state.is_highlighted(target);
		let alpha = match (highlight, lit) {
			(false, _) => 0.6,
			(true, true) => 0.9,
			(true, false) => 0.15,
		};
		let (r, g, b) = edge_rgb(edge.style.tone);
		ctx.set_stroke_style_str(&format!("rgba({r}, {g}, {b}, {alpha})"));
		ctx.set_line_width(if lit { line_width * 1.3 } else { line_width });
		if edge.style.dashed {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(-(state.time * 30.0) % (dash + gap));
		}

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * NODE_RADIUS, y1 + uy * NODE_RADIUS);
		ctx.line_to(
			x2 - ux * (NODE_RADIUS + arrow_size),
			y2 - uy * (NODE_RADIUS + arrow_size),
		);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		ctx.set_fill_style_str(&format!("rgba({r}, {g}, {b}, {})", alpha + 0.1));
		let (tip_x, tip_y) = (x2 - ux * NODE_RADIUS, y2 - uy * NODE_RADIUS);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if let Some(label) = &edge.label {
			ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.7));
			ctx.set_font(&format!("{}px sans-serif", 9.0 / k.max(0.5)));
			let _ = ctx.fill_text(label, (x1 + x2) / 2.0 + 4.0, (y1 + y2) / 2.0 - 4.0);
		}
	}
}

fn draw_nodes(
	state: &BiasGraphState,
	graph: &Graph,
	expanding: Option<&str>,
	ctx: &CanvasRenderingContext2d,
) {
	let (highlight, k) = (state.has_active_highlight(), state.transform.k);

	// sorted so overlapping nodes stack the same way every frame
	let mut nodes: Vec<&GraphNode> = graph.nodes.values().collect();
	nodes.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.id.cmp(&b.id)));

	for node in nodes {
		let (x, y) = (node.position.x, node.position.y);
		let lit = state.is_highlighted(&node.id);
		let alpha = if highlight && !lit { 0.35 } else { 1.0 };
		let radius = if state.hover.node.as_deref() == Some(node.id.as_str()) {
			NODE_RADIUS * 1.15
		} else {
			NODE_RADIUS
		};

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node_color(node.kind));
		ctx.fill();

		if node.kind.is_speculative() {
			ctx.set_stroke_style_str(node_color(node.kind.confirmed()));
			ctx.set_line_width(1.5 / k);
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(4.0 / k),
				&JsValue::from_f64(3.0 / k),
			));
			ctx.stroke();
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}

		if expanding == Some(node.id.as_str()) {
			let pulse = 0.5 + 0.5 * (state.time * 6.0).sin();
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + (3.0 + 4.0 * pulse) / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.4 + 0.5 * pulse));
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}
		ctx.set_global_alpha(1.0);

		ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.9));
		ctx.set_font(&format!("{}px sans-serif", 11.0 / k.max(0.5)));
		let _ = ctx.fill_text(&short_label(node), x + radius + 4.0, y + 4.0);
	}
}
