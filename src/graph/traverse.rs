use std::collections::{HashMap, HashSet, VecDeque};

use super::types::{Graph, GraphEdge, NodeKind};
use crate::error::{GraphError, GraphResult};

/// Every node reachable from `start` along directed edges, `start` included.
/// The visited set keeps this finite even if the edges contain a cycle.
pub fn descendants(start: &str, edges: &[GraphEdge]) -> HashSet<String> {
	let mut visited = HashSet::from([start.to_string()]);
	let mut queue = VecDeque::from([start.to_string()]);

	while let Some(current) = queue.pop_front() {
		for edge in edges.iter().filter(|e| e.source == current) {
			let Some(target) = edge.target.as_ref() else {
				continue;
			};
			if visited.insert(target.clone()) {
				queue.push_back(target.clone());
			}
		}
	}
	visited
}

/// Descendants of `start`, without `start` itself.
pub fn strict_descendants(start: &str, edges: &[GraphEdge]) -> HashSet<String> {
	let mut found = descendants(start, edges);
	found.remove(start);
	found
}

/// Depth of every node reachable from the original node. Orphans get no
/// entry; a graph without an original node yields an empty map.
pub fn compute_levels(graph: &Graph) -> HashMap<String, u32> {
	let mut levels = HashMap::new();
	let Some(root) = graph
		.nodes
		.values()
		.find(|n| n.kind == NodeKind::Original)
	else {
		return levels;
	};

	levels.insert(root.id.clone(), 0);
	let mut queue = VecDeque::from([(root.id.clone(), 0u32)]);
	while let Some((current, depth)) = queue.pop_front() {
		for edge in graph.edges.iter().filter(|e| e.source == current) {
			let Some(target) = edge.target.as_ref() else {
				continue;
			};
			if !graph.nodes.contains_key(target) || levels.contains_key(target) {
				continue;
			}
			levels.insert(target.clone(), depth + 1);
			queue.push_back((target.clone(), depth + 1));
		}
	}
	levels
}

impl Graph {
	/// Check the tree shape: one original root, one inbound edge per other
	/// node, and stored levels matching depth from the root.
	pub fn validate(&self) -> GraphResult<()> {
		let roots = self
			.nodes
			.values()
			.filter(|n| n.kind == NodeKind::Original)
			.count();
		if roots != 1 {
			return Err(GraphError::MissingRoot { count: roots });
		}

		let mut inbound: HashMap<&str, usize> = HashMap::new();
		for edge in &self.edges {
			if let Some(target) = edge.target.as_deref() {
				*inbound.entry(target).or_default() += 1;
			}
		}

		let levels = compute_levels(self);
		for node in self.nodes.values() {
			let parents = inbound.get(node.id.as_str()).copied().unwrap_or(0);
			if node.kind == NodeKind::Original {
				continue;
			}
			if parents > 1 {
				return Err(GraphError::MultipleParents {
					node_id: node.id.clone(),
					count: parents,
				});
			}
			match levels.get(&node.id) {
				None => {
					return Err(GraphError::MissingParent {
						node_id: node.id.clone(),
					});
				}
				Some(&expected) if expected != node.level => {
					return Err(GraphError::LevelMismatch {
						node_id: node.id.clone(),
						expected,
						found: node.level,
					});
				}
				Some(_) => {}
			}
		}
		Ok(())
	}
}
