//! Moving a node's subtree along with it while it is dragged.

use std::collections::HashMap;

use log::debug;

use super::traverse::{descendants, strict_descendants};
use super::types::{Graph, Position};

/// Movement below this on both axes is not propagated yet.
pub const DRAG_EPSILON: f64 = 0.1;

/// Last propagated position of each node touched by the current pointer
/// gesture. Owned by whoever handles the gesture and cleared when it ends.
#[derive(Clone, Debug, Default)]
pub struct DragGesture {
	last: HashMap<String, Position>,
}

impl DragGesture {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn last_position(&self, id: &str) -> Option<Position> {
		self.last.get(id).copied()
	}

	pub fn is_idle(&self) -> bool {
		self.last.is_empty()
	}

	/// Handle one movement event for `node_id`, whose position has already
	/// been set to where the pointer put it. Returns how many descendants
	/// were moved.
	pub fn on_drag(&mut self, graph: &mut Graph, node_id: &str) -> usize {
		let Some(current) = graph.node(node_id).map(|n| n.position) else {
			return 0;
		};
		let Some(last) = self.last.get(node_id).copied() else {
			self.last.insert(node_id.to_string(), current);
			return 0;
		};

		let (dx, dy) = (current.x - last.x, current.y - last.y);
		if dx.abs() <= DRAG_EPSILON && dy.abs() <= DRAG_EPSILON {
			return 0;
		}

		let moved = strict_descendants(node_id, &graph.edges);
		for id in &moved {
			if let Some(node) = graph.nodes.get_mut(id) {
				node.position = node.position.offset(dx, dy);
				self.last.insert(id.clone(), node.position);
			}
		}
		self.last.insert(node_id.to_string(), current);
		debug!("drag {}: delta=({:.1}, {:.1}) moved={}", node_id, dx, dy, moved.len());
		moved.len()
	}

	/// Set `node_id` to `position` and propagate to its subtree.
	pub fn drag_to(&mut self, graph: &mut Graph, node_id: &str, position: Position) -> usize {
		match graph.nodes.get_mut(node_id) {
			Some(node) => node.position = position,
			None => return 0,
		}
		self.on_drag(graph, node_id)
	}

	/// Forget the dragged node and its subtree so the next gesture starts
	/// without a stale delta.
	pub fn end(&mut self, graph: &Graph, node_id: &str) {
		for id in descendants(node_id, &graph.edges) {
			self.last.remove(&id);
		}
	}

	pub fn clear(&mut self) {
		self.last.clear();
	}
}
