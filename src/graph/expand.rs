//! Turning API expansion responses into positioned nodes and edges, and
//! merging them into an existing graph.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::{Map, Value};

use super::layout::{CENTER, ROOT_ANGLE, ring};
use super::types::{EdgeStyle, EdgeTone, Graph, GraphEdge, GraphNode, NodeKind, Position};
use crate::api::{ExpandAction, ExpandNodeRequest, ExpansionResponse, WireEdge, WireNode};
use crate::error::{GraphError, GraphResult};

/// Where and what the anchor node of a batch becomes.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorPlacement {
	pub position: Position,
	pub angle: f64,
	pub level: u32,
	pub parent_id: Option<String>,
	/// Kind used when the anchor arrives without a `type`.
	pub fallback_kind: NodeKind,
}

impl AnchorPlacement {
	pub fn root() -> Self {
		Self {
			position: CENTER,
			angle: ROOT_ANGLE,
			level: 0,
			parent_id: None,
			fallback_kind: NodeKind::Original,
		}
	}

	fn is_root(&self) -> bool {
		self.parent_id.is_none()
	}
}

/// Nodes and edges produced from one response, ready to merge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
	pub anchor_id: String,
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
}

/// Where an expanded node lands: on its placeholder, else on its parent,
/// else at the canvas centre.
pub fn expansion_origin(placeholder: Option<&GraphNode>, parent: Option<&GraphNode>) -> Position {
	placeholder
		.or(parent)
		.map(|n| n.position)
		.unwrap_or(CENTER)
}

pub fn placeholder_id(anchor_id: &str, edge_id: &str) -> String {
	format!("potential-{anchor_id}-{edge_id}")
}

fn speculative_action(edge: &WireEdge) -> GraphResult<ExpandAction> {
	match edge.edge_type.as_deref() {
		Some("bias" | "biased") => return Ok(ExpandAction::Bias),
		Some("debias" | "debiased") => return Ok(ExpandAction::Debias),
		_ => {}
	}
	match &edge.bias {
		None | Some(Value::Null) => Err(GraphError::MissingEdgeType {
			edge_id: edge.id.clone(),
		}),
		Some(_) if edge.bias_marker() => Ok(ExpandAction::Bias),
		Some(_) => Ok(ExpandAction::Debias),
	}
}

fn edge_tone(edge: &WireEdge) -> Option<ExpandAction> {
	match edge.edge_type.as_deref() {
		Some("bias" | "biased") => Some(ExpandAction::Bias),
		Some("debias" | "debiased") => Some(ExpandAction::Debias),
		_ => None,
	}
}

fn wire_kind(node: &WireNode) -> GraphResult<Option<NodeKind>> {
	match node.kind() {
		None => Ok(None),
		Some(kind) => NodeKind::from_wire(kind)
			.map(Some)
			.ok_or_else(|| GraphError::UnknownNodeKind {
				node_id: node.id.clone(),
				kind: kind.to_string(),
			}),
	}
}

fn anchor_kind(node: &WireNode, placement: &AnchorPlacement) -> GraphResult<NodeKind> {
	if placement.is_root() {
		return Ok(NodeKind::Original);
	}
	match wire_kind(node)? {
		Some(NodeKind::Original) => Err(GraphError::DuplicateRoot {
			node_id: node.id.clone(),
		}),
		Some(kind) => Ok(kind),
		None => Ok(placement.fallback_kind.confirmed()),
	}
}

fn placeholder_payload(edge: &WireEdge, action: ExpandAction) -> Map<String, Value> {
	let mut payload = edge.extra.clone();
	payload.insert("type".into(), Value::from("speculative"));
	payload.insert("option_id".into(), Value::from(edge.id.clone()));
	payload
		.entry("bias_type")
		.or_insert_with(|| Value::from(edge.id.clone()));
	payload.insert(
		"action".into(),
		Value::from(match action {
			ExpandAction::Bias => "bias",
			ExpandAction::Debias => "debias",
		}),
	);
	if let Some(label) = &edge.label {
		payload.insert("label".into(), Value::from(label.clone()));
	}
	if let Some(description) = &edge.description {
		payload.insert("description".into(), Value::from(description.clone()));
	}
	payload
}

/// Lay out one response around its anchor. The first node is the anchor.
/// Confirmed edges from the anchor and targetless edges share one ring
/// around it, confirmed children first.
pub fn build_batch(response: &ExpansionResponse, placement: &AnchorPlacement) -> GraphResult<Batch> {
	let anchor_wire = response.nodes.first().ok_or(GraphError::EmptyResponse)?;
	if let Some(root_id) = response.root_id.as_ref().filter(|_| placement.is_root()) {
		if root_id != &anchor_wire.id {
			return Err(GraphError::AnchorMismatch {
				expected: root_id.clone(),
				found: anchor_wire.id.clone(),
			});
		}
	}

	let anchor_id = anchor_wire.id.clone();
	let anchor = GraphNode {
		id: anchor_id.clone(),
		position: placement.position,
		kind: anchor_kind(anchor_wire, placement)?,
		level: placement.level,
		angle: placement.angle,
		parent_id: placement.parent_id.clone(),
		payload: anchor_wire.payload.clone(),
	};
	let by_id: HashMap<&str, &WireNode> = response.nodes[1..]
		.iter()
		.map(|n| (n.id.as_str(), n))
		.collect();

	let edges = response.all_edges();
	let (confirmed, speculative): (Vec<&WireEdge>, Vec<&WireEdge>) =
		edges.iter().partition(|e| e.target.is_some());

	let mut link: Option<&WireEdge> = None;
	let mut children: Vec<(&WireEdge, &WireNode)> = Vec::new();
	for edge in confirmed {
		let Some(target) = edge.target.as_deref() else {
			continue;
		};
		if target == anchor_id {
			if placement.parent_id.as_deref() == Some(edge.source.as_str()) {
				link = Some(edge);
				continue;
			}
			return Err(GraphError::DanglingEdge {
				edge_id: edge.id.clone(),
				node_id: edge.source.clone(),
			});
		}
		let Some(child) = by_id.get(target) else {
			// the parent's link may point at a node other than nodes[0]
			if placement.parent_id.as_deref() == Some(edge.source.as_str()) {
				return Err(GraphError::AnchorMismatch {
					expected: target.to_string(),
					found: anchor_id,
				});
			}
			return Err(GraphError::DanglingEdge {
				edge_id: edge.id.clone(),
				node_id: target.to_string(),
			});
		};
		if edge.source != anchor_id {
			return Err(GraphError::DanglingEdge {
				edge_id: edge.id.clone(),
				node_id: edge.source.clone(),
			});
		}
		children.push((edge, child));
	}

	let mut batch = Batch {
		anchor_id: anchor_id.clone(),
		nodes: Vec::with_capacity(1 + children.len() + speculative.len()),
		edges: Vec::with_capacity(1 + children.len() + speculative.len()),
	};

	if let Some(parent_id) = &placement.parent_id {
		batch.edges.push(GraphEdge {
			id: link
				.map(|e| e.id.clone())
				.unwrap_or_else(|| format!("{parent_id}-{anchor_id}")),
			source: parent_id.clone(),
			target: Some(anchor_id.clone()),
			label: link.and_then(|e| e.label.clone()).or_else(|| anchor.label().map(str::to_string)),
			style: EdgeStyle {
				tone: EdgeTone::from(anchor.kind.action()),
				dashed: false,
			},
		});
	}

	for edge in &speculative {
		if edge.source != anchor_id {
			return Err(GraphError::DanglingEdge {
				edge_id: edge.id.clone(),
				node_id: edge.source.clone(),
			});
		}
	}

	// confirmed children first, then placeholders, all on one ring
	let mut slots = ring(
		anchor.position,
		children.len() + speculative.len(),
		1,
		anchor.angle,
	)
	.into_iter();
	for ((edge, wire), slot) in children.into_iter().zip(slots.by_ref()) {
		let kind = match wire_kind(wire)? {
			Some(NodeKind::Original) => {
				return Err(GraphError::DuplicateRoot {
					node_id: wire.id.clone(),
				});
			}
			Some(kind) => kind,
			None => match edge_tone(edge) {
				Some(action) => NodeKind::speculative(action).confirmed(),
				None => {
					return Err(GraphError::UnknownNodeKind {
						node_id: wire.id.clone(),
						kind: String::new(),
					});
				}
			},
		};
		batch.edges.push(GraphEdge {
			id: edge.id.clone(),
			source: anchor_id.clone(),
			target: Some(wire.id.clone()),
			label: edge.label.clone(),
			style: EdgeStyle {
				tone: EdgeTone::from(edge_tone(edge).or(kind.action())),
				dashed: false,
			},
		});
		batch.nodes.push(GraphNode {
			id: wire.id.clone(),
			position: slot.position,
			kind,
			level: anchor.level + 1,
			angle: slot.angle,
			parent_id: Some(anchor_id.clone()),
			payload: wire.payload.clone(),
		});
	}

	for (edge, slot) in speculative.into_iter().zip(slots) {
		let action = speculative_action(edge)?;
		let id = placeholder_id(&anchor_id, &edge.id);
		batch.edges.push(GraphEdge {
			id: format!("{anchor_id}->{id}"),
			source: anchor_id.clone(),
			target: Some(id.clone()),
			label: edge.label.clone(),
			style: EdgeStyle {
				tone: EdgeTone::from(Some(action)),
				dashed: true,
			},
		});
		batch.nodes.push(GraphNode {
			id,
			position: slot.position,
			kind: NodeKind::speculative(action),
			level: anchor.level + 1,
			angle: slot.angle,
			parent_id: Some(anchor_id.clone()),
			payload: placeholder_payload(edge, action),
		});
	}

	let placed = batch.nodes.len() + 1;
	if placed < response.nodes.len() {
		warn!(
			"dropping {} unconnected nodes from expansion of {}",
			response.nodes.len() - placed,
			anchor_id
		);
	}

	batch.nodes.insert(0, anchor);
	debug!(
		"built batch around {}: nodes={} edges={}",
		batch.anchor_id,
		batch.nodes.len(),
		batch.edges.len()
	);
	Ok(batch)
}

/// A fresh graph from the response to a submitted prompt.
pub fn build_root(response: &ExpansionResponse) -> GraphResult<Graph> {
	let batch = build_batch(response, &AnchorPlacement::root())?;
	let mut graph = Graph::default();
	graph.edges = batch.edges;
	for node in batch.nodes {
		graph.insert_node(node);
	}
	graph.validate()?;
	Ok(graph)
}

fn parent_of(graph: &Graph, node: &GraphNode) -> GraphResult<String> {
	node.parent_id
		.clone()
		.or_else(|| {
			graph
				.edges
				.iter()
				.find(|e| e.target.as_deref() == Some(node.id.as_str()))
				.map(|e| e.source.clone())
		})
		.ok_or_else(|| GraphError::MissingParent {
			node_id: node.id.clone(),
		})
}

fn speculative_node<'a>(graph: &'a Graph, placeholder_id: &str) -> GraphResult<&'a GraphNode> {
	let node = graph
		.node(placeholder_id)
		.ok_or_else(|| GraphError::UnknownNode {
			node_id: placeholder_id.to_string(),
		})?;
	if !node.kind.is_speculative() {
		return Err(GraphError::NotSpeculative {
			node_id: placeholder_id.to_string(),
		});
	}
	Ok(node)
}

/// The request that expands `placeholder_id` under its parent.
pub fn expand_request(graph: &Graph, placeholder_id: &str) -> GraphResult<ExpandNodeRequest> {
	let placeholder = speculative_node(graph, placeholder_id)?;
	let parent_id = parent_of(graph, placeholder)?;
	let parent = graph.node(&parent_id);
	let prompt = parent
		.and_then(|p| p.prompt().or(p.label()))
		.unwrap_or_default()
		.to_string();
	let action = placeholder.kind.action().ok_or_else(|| GraphError::NotSpeculative {
		node_id: placeholder_id.to_string(),
	})?;

	Ok(ExpandNodeRequest {
		node_id: parent_id,
		prompt,
		action,
		bias_type: placeholder
			.payload
			.get("bias_type")
			.and_then(Value::as_str)
			.map(str::to_string),
	})
}

/// Replace `placeholder_id` with the response's anchor and its new ring.
/// Returns a new graph; `graph` is never touched.
pub fn merge_expansion(
	graph: &Graph,
	placeholder_id: &str,
	response: &ExpansionResponse,
) -> GraphResult<Graph> {
	let placeholder = speculative_node(graph, placeholder_id)?;
	let parent_id = parent_of(graph, placeholder)?;
	let parent = graph.node(&parent_id);
	let level = parent.map_or(placeholder.level, |p| p.level + 1);

	let placement = AnchorPlacement {
		position: expansion_origin(Some(placeholder), parent),
		angle: placeholder.angle,
		level,
		parent_id: Some(parent_id),
		fallback_kind: placeholder.kind,
	};
	let batch = build_batch(response, &placement)?;

	let mut merged = graph.clone();
	merged.nodes.remove(placeholder_id);
	merged
		.edges
		.retain(|e| e.target.as_deref() != Some(placeholder_id) && e.source != placeholder_id);

	for node in &batch.nodes {
		if merged.nodes.contains_key(&node.id) {
			return Err(GraphError::DuplicateNode {
				node_id: node.id.clone(),
			});
		}
	}
	merged.edges.extend(batch.edges);
	for node in batch.nodes {
		merged.insert_node(node);
	}
	merged.validate()?;

	debug!(
		"merged expansion of {} as {}: nodes={} edges={}",
		placeholder_id,
		batch.anchor_id,
		merged.nodes.len(),
		merged.edges.len()
	);
	Ok(merged)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::layout::radial_position;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	fn response(value: Value) -> ExpansionResponse {
		serde_json::from_value(value).unwrap()
	}

	fn submitted() -> Graph {
		build_root(&response(json!({
			"root_id": "root",
			"nodes": [{"id": "root", "type": "original", "prompt": "Are nurses caring?"}],
			"edges": [
				{"id": "7", "source": "root", "label": "Confirmation", "type": "bias"},
				{"id": "9", "source": "root", "label": "Reframe", "type": "debias",
				 "description": "Ask neutrally"}
			]
		})))
		.unwrap()
	}

	#[test]
	fn submit_builds_root_and_placeholder_ring() {
		let graph = submitted();
		assert_eq!(graph.nodes.len(), 3);
		assert_eq!(graph.edges.len(), 2);

		let root = graph.root().unwrap();
		assert_eq!(root.id, "root");
		assert_eq!(root.level, 0);
		assert_eq!(root.position, CENTER);

		let p7 = graph.node("potential-root-7").unwrap();
		assert_eq!(p7.kind, NodeKind::SpeculativeBias);
		assert_eq!(p7.level, 1);
		assert_eq!(p7.parent_id.as_deref(), Some("root"));
		assert_eq!(p7.label(), Some("Confirmation"));
		assert_eq!(p7.position, radial_position(CENTER, 0, 2, 1, ROOT_ANGLE).position);

		let p9 = graph.node("potential-root-9").unwrap();
		assert_eq!(p9.kind, NodeKind::SpeculativeDebias);
		assert_eq!(p9.payload.get("description"), Some(&json!("Ask neutrally")));
		assert!(graph.edges.iter().all(|e| e.style.dashed));
	}

	#[test]
	fn expansion_replaces_placeholder() {
		let graph = submitted();
		let placeholder = graph.node("potential-root-7").unwrap().clone();
		let merged = merge_expansion(
			&graph,
			"potential-root-7",
			&response(json!({
				"nodes": [{"id": "b1", "type": "biased", "prompt": "Nurses are caring, right?",
				           "turn2_response": "Yes"}],
				"edges": [
					{"id": "o1", "source": "b1", "label": "Anchoring", "type": "bias"},
					{"id": "o2", "source": "b1", "label": "Counter", "type": "debias"}
				]
			})),
		)
		.unwrap();

		assert!(merged.node("potential-root-7").is_none());
		assert!(!merged
			.edges
			.iter()
			.any(|e| e.target.as_deref() == Some("potential-root-7")));

		let anchor = merged.node("b1").unwrap();
		assert_eq!(anchor.kind, NodeKind::ConfirmedBias);
		assert_eq!(anchor.level, 1);
		assert_eq!(anchor.position, placeholder.position);
		assert_eq!(anchor.payload.get("turn2_response"), Some(&json!("Yes")));

		let link: Vec<_> = merged
			.edges
			.iter()
			.filter(|e| e.target.as_deref() == Some("b1"))
			.collect();
		assert_eq!(link.len(), 1);
		assert_eq!(link[0].source, "root");
		assert!(!link[0].style.dashed);

		let ring: Vec<_> = merged.children("b1").collect();
		assert_eq!(ring.len(), 2);
		for (i, id) in ["potential-b1-o1", "potential-b1-o2"].iter().enumerate() {
			let node = merged.node(id).unwrap();
			assert!(node.kind.is_speculative());
			assert_eq!(node.level, anchor.level + 1);
			let expected = radial_position(anchor.position, i, 2, 1, anchor.angle);
			assert_eq!(node.position, expected.position);
		}

		// untouched sibling
		assert_eq!(merged.node("potential-root-9"), graph.node("potential-root-9"));
		assert_eq!(merged.nodes.len(), 5);
	}

	#[test]
	fn untyped_anchor_inherits_placeholder_direction() {
		let graph = submitted();
		let merged = merge_expansion(
			&graph,
			"potential-root-9",
			&response(json!({"nodes": [{"id": "d1"}], "edges": []})),
		)
		.unwrap();
		assert_eq!(merged.node("d1").unwrap().kind, NodeKind::ConfirmedDebias);
	}

	#[test]
	fn parent_link_from_response_is_reused() {
		let graph = submitted();
		let merged = merge_expansion(
			&graph,
			"potential-root-7",
			&response(json!({
				"nodes": [{"id": "b1", "type": "biased"}],
				"edges": [{"id": "root-b1", "source": "root", "target": "b1", "type": "bias",
				           "label": "LLM Bias"}]
			})),
		)
		.unwrap();
		let link = merged.edges.iter().find(|e| e.id == "root-b1").unwrap();
		assert_eq!(link.label.as_deref(), Some("LLM Bias"));
		assert_eq!(merged.edges.len(), 2);
	}

	#[test]
	fn legacy_confirmed_children_form_a_ring() {
		let graph = build_root(&response(json!({
			"nodes": [
				{"id": "root", "type": "original"},
				{"id": "a", "type": "biased"},
				{"id": "b", "type": "debiased"},
				{"id": "c", "type": "control"}
			],
			"edges": [
				{"id": "ra", "source": "root", "target": "a", "type": "bias"},
				{"id": "rb", "source": "root", "target": "b", "type": "debias"},
				{"id": "rc", "source": "root", "target": "c"}
			]
		})))
		.unwrap();
		assert_eq!(graph.nodes.len(), 4);
		assert_eq!(graph.node("c").unwrap().kind, NodeKind::ConfirmedControl);
		assert_eq!(
			graph.node("b").unwrap().position,
			radial_position(CENTER, 1, 3, 1, ROOT_ANGLE).position
		);
		assert!(graph.edges.iter().all(|e| !e.style.dashed));
	}

	#[test]
	fn legacy_potential_edges_are_speculative() {
		let graph = build_root(&response(json!({
			"nodes": [{"id": "root"}],
			"edges": [],
			"potential_edges": [{"id": "p", "source": "root", "target": "ignored", "bias": true}]
		})))
		.unwrap();
		assert_eq!(graph.node("potential-root-p").unwrap().kind, NodeKind::SpeculativeBias);
	}

	#[test]
	fn malformed_responses_are_rejected() {
		assert_eq!(
			build_root(&response(json!({"nodes": [], "edges": []}))),
			Err(GraphError::EmptyResponse)
		);
		assert_eq!(
			build_root(&response(json!({
				"root_id": "root",
				"nodes": [{"id": "other"}, {"id": "root"}],
				"edges": []
			}))),
			Err(GraphError::AnchorMismatch {
				expected: "root".into(),
				found: "other".into()
			})
		);
		assert_eq!(
			build_root(&response(json!({
				"nodes": [{"id": "root"}],
				"edges": [{"id": "e", "source": "root", "label": "?"}]
			}))),
			Err(GraphError::MissingEdgeType { edge_id: "e".into() })
		);
		assert!(matches!(
			build_root(&response(json!({
				"nodes": [{"id": "root"}],
				"edges": [{"id": "e", "source": "root", "target": "ghost", "type": "bias"}]
			}))),
			Err(GraphError::DanglingEdge { .. })
		));
		assert_eq!(
			build_root(&response(json!({
				"nodes": [{"id": "root", "type": "original"}],
				"edges": [{"id": "7", "source": "someone-else", "type": "bias"}]
			}))),
			Err(GraphError::DanglingEdge {
				edge_id: "7".into(),
				node_id: "someone-else".into()
			})
		);
	}

	#[test]
	fn mixed_children_share_one_ring() {
		let graph = build_root(&response(json!({
			"nodes": [{"id": "root", "type": "original"}, {"id": "a", "type": "biased"}],
			"edges": [{"id": "ra", "source": "root", "target": "a", "type": "bias"}],
			"potential_edges": [
				{"id": "7", "source": "root", "type": "bias"},
				{"id": "9", "source": "root", "type": "debias"}
			]
		})))
		.unwrap();
		assert_eq!(graph.nodes.len(), 4);
		assert_eq!(
			graph.node("a").unwrap().position,
			radial_position(CENTER, 0, 3, 1, ROOT_ANGLE).position
		);
		assert_eq!(
			graph.node("potential-root-9").unwrap().position,
			radial_position(CENTER, 2, 3, 1, ROOT_ANGLE).position
		);

		let positions: Vec<Position> = graph.nodes.values().map(|n| n.position).collect();
		for (i, a) in positions.iter().enumerate() {
			for b in &positions[i + 1..] {
				assert_ne!(a, b, "two nodes share a position");
			}
		}
	}

	#[test]
	fn failed_merge_leaves_graph_alone() {
		let graph = submitted();
		let before = graph.clone();
		let err = merge_expansion(
			&graph,
			"potential-root-7",
			&response(json!({"nodes": [{"id": "x", "type": "mystery"}], "edges": []})),
		);
		assert!(matches!(err, Err(GraphError::UnknownNodeKind { .. })));
		assert_eq!(graph, before);
	}

	#[test]
	fn only_placeholders_expand() {
		let graph = submitted();
		assert_eq!(
			merge_expansion(&graph, "root", &ExpansionResponse::default()),
			Err(GraphError::NotSpeculative { node_id: "root".into() })
		);
		assert_eq!(
			expand_request(&graph, "missing"),
			Err(GraphError::UnknownNode { node_id: "missing".into() })
		);
	}

	#[test]
	fn request_uses_parent_prompt_and_option() {
		let graph = submitted();
		let request = expand_request(&graph, "potential-root-7").unwrap();
		assert_eq!(request.node_id, "root");
		assert_eq!(request.prompt, "Are nurses caring?");
		assert_eq!(request.action, ExpandAction::Bias);
		assert_eq!(request.bias_type.as_deref(), Some("7"));
	}

	#[test]
	fn origin_fallbacks() {
		let graph = submitted();
		let root = graph.root();
		let p = graph.node("potential-root-7");
		assert_eq!(expansion_origin(p, root), p.unwrap().position);
		assert_eq!(expansion_origin(None, root), CENTER);
		let mut moved = root.unwrap().clone();
		moved.position = Position::new(5.0, 5.0);
		assert_eq!(expansion_origin(None, Some(&moved)), Position::new(5.0, 5.0));
		assert_eq!(expansion_origin(None, None), CENTER);
	}
}
