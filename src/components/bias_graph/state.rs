use std::collections::HashSet;

use crate::graph::{DragGesture, Graph, Position};

pub const NODE_RADIUS: f64 = 22.0;
pub const HIT_RADIUS: f64 = 26.0;
/// Pointer travel (screen px) below which a press-release counts as a click.
pub const CLICK_SLOP: f64 = 4.0;

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Position,
	pub moved: bool,
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
	pub node: Option<String>,
	pub neighbors: HashSet<String>,
}

/// What a released pointer did.
#[derive(Clone, Debug, PartialEq)]
pub enum Release {
	Clicked(String),
	Dragged(String),
	None,
}

pub struct BiasGraphState {
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub gesture: DragGesture,
	pub width: f64,
	pub height: f64,
	pub time: f64,
}

impl BiasGraphState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 0.8,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			gesture: DragGesture::new(),
			width,
			height,
			time: 0.0,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under a screen point. Later ids win ties so the result
	/// does not depend on hash order.
	pub fn node_at_position(&self, graph: &Graph, sx: f64, sy: f64) -> Option<String> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		graph
			.nodes
			.values()
			.filter(|n| {
				let (dx, dy) = (n.position.x - gx, n.position.y - gy);
				(dx * dx + dy * dy).sqrt() < HIT_RADIUS
			})
			.map(|n| n.id.clone())
			.max()
	}

	pub fn set_hover(&mut self, graph: &Graph, node: Option<String>) {
		if self.hover.node == node {
			return;
		}
		self.hover.neighbors.clear();
		if let Some(id) = &node {
			for edge in &graph.edges {
				let Some(target) = edge.target.as_ref() else {
					continue;
				};
				if &edge.source == id {
					self.hover.neighbors.insert(target.clone());
				} else if target == id {
					self.hover.neighbors.insert(edge.source.clone());
				}
			}
		}
		self.hover.node = node;
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id) || self.hover.neighbors.contains(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some()
	}

	/// Press on a node: remember where it and the pointer started.
	pub fn begin_drag(&mut self, graph: &Graph, id: &str, sx: f64, sy: f64) {
		let Some(node) = graph.node(id) else {
			return;
		};
		self.drag = DragState {
			node: Some(id.to_string()),
			start_x: sx,
			start_y: sy,
			node_start: node.position,
			moved: false,
		};
	}

	/// Pointer moved while a node is held: move it and its subtree.
	pub fn drag_move(&mut self, graph: &mut Graph, sx: f64, sy: f64) {
		let Some(id) = self.drag.node.clone() else {
			return;
		};
		let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
		if !self.drag.moved && dx.hypot(dy) < CLICK_SLOP {
			return;
		}
		self.drag.moved = true;
		let target = self
			.drag
			.node_start
			.offset(dx / self.transform.k, dy / self.transform.k);
		self.gesture.drag_to(graph, &id, target);
	}

	pub fn end_drag(&mut self, graph: &Graph) -> Release {
		let drag = std::mem::take(&mut self.drag);
		let Some(id) = drag.node else {
			return Release::None;
		};
		self.gesture.end(graph, &id);
		if drag.moved {
			Release::Dragged(id)
		} else {
			Release::Clicked(id)
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

	pub fn pan_move(&mut self, sx: f64, sy: f64) {
		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
	}

	/// Zoom by `factor` keeping the graph point under (sx, sy) fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Abandon any pointer interaction, e.g. when the pointer leaves.
	pub fn cancel(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
		self.gesture.clear();
		self.hover = HoverState::default();
	}

	pub fn tick(&mut self, dt: f64) {
		self.time += dt;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}
