//! One exploration session: the current graph plus the single-expansion gate.

use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};
use serde_json::Value;

use super::expand::{build_root, expand_request, merge_expansion};
use super::types::Graph;
use crate::api::{ExpandNodeRequest, ExpansionResponse, GraphApi};
use crate::error::{ApiResult, ExploreResult, GraphError, GraphResult};

#[derive(Debug, Default)]
struct GateState {
	in_flight: Option<(u64, String)>,
	issued: u64,
}

/// Cooperative flag allowing one expansion in flight at a time.
#[derive(Clone, Debug, Default)]
pub struct ExpansionGate {
	state: Rc<RefCell<GateState>>,
}

impl ExpansionGate {
	/// Claim the gate for `placeholder_id`, or `None` if it is taken.
	pub fn try_begin(&self, placeholder_id: &str) -> Option<ExpansionPermit> {
		let mut state = self.state.borrow_mut();
		if state.in_flight.is_some() {
			return None;
		}
		state.issued += 1;
		let ticket = state.issued;
		state.in_flight = Some((ticket, placeholder_id.to_string()));
		Some(ExpansionPermit {
			state: self.state.clone(),
			ticket,
			placeholder_id: placeholder_id.to_string(),
		})
	}

	pub fn is_expanding(&self) -> bool {
		self.state.borrow().in_flight.is_some()
	}

	/// The placeholder currently being expanded.
	pub fn in_flight(&self) -> Option<String> {
		self.state.borrow().in_flight.as_ref().map(|(_, id)| id.clone())
	}

	/// Whether `permit` still owns the gate, i.e. no reset happened since
	/// it was issued.
	pub fn is_current(&self, permit: &ExpansionPermit) -> bool {
		matches!(&self.state.borrow().in_flight, Some((ticket, _)) if *ticket == permit.ticket)
	}

	/// Reopen the gate. A permit issued before this no longer owns it.
	pub fn clear(&self) {
		self.state.borrow_mut().in_flight = None;
	}
}

/// Held while an expansion is outstanding; dropping it reopens the gate
/// on every exit path.
#[derive(Debug)]
pub struct ExpansionPermit {
	state: Rc<RefCell<GateState>>,
	ticket: u64,
	placeholder_id: String,
}

impl ExpansionPermit {
	pub fn placeholder_id(&self) -> &str {
		&self.placeholder_id
	}
}

impl Drop for ExpansionPermit {
	fn drop(&mut self) {
		let mut state = self.state.borrow_mut();
		if matches!(&state.in_flight, Some((ticket, _)) if *ticket == self.ticket) {
			state.in_flight = None;
		}
	}
}

/// What happened to an expand click.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpandOutcome {
	/// The placeholder was replaced by this node.
	Expanded { anchor_id: String },
	/// Another expansion was in flight; nothing was done.
	Busy,
	/// The graph was reset while the request was outstanding.
	Discarded,
}

#[derive(Debug, Default)]
pub struct Explorer {
	graph: Rc<Graph>,
	gate: ExpansionGate,
}

impl Explorer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot of the current graph. Mutations swap in a new snapshot, so
	/// a held snapshot never changes underneath its reader.
	pub fn graph(&self) -> Rc<Graph> {
		self.graph.clone()
	}

	pub fn gate(&self) -> &ExpansionGate {
		&self.gate
	}

	/// Direct access for drag handling, which moves nodes in place.
	pub fn graph_mut(&mut self) -> &mut Graph {
		Rc::make_mut(&mut self.graph)
	}

	/// Replace the graph with the one built from a submitted prompt. An
	/// expansion still outstanding against the old graph is discarded.
	pub fn submit(&mut self, response: &ExpansionResponse) -> GraphResult<()> {
		let graph = build_root(response)?;
		info!("submitted prompt: nodes={} edges={}", graph.nodes.len(), graph.edges.len());
		self.graph = Rc::new(graph);
		self.gate.clear();
		Ok(())
	}

	/// Claim the gate and build the request for `placeholder_id`.
	/// `Ok(None)` means another expansion is in flight.
	pub fn begin_expand(
		&self,
		placeholder_id: &str,
	) -> GraphResult<Option<(ExpansionPermit, ExpandNodeRequest)>> {
		if self.gate.is_expanding() {
			return Ok(None);
		}
		let request = expand_request(&self.graph, placeholder_id)?;
		Ok(self
			.gate
			.try_begin(placeholder_id)
			.map(|permit| (permit, request)))
	}

	/// Merge the result of an expansion, or leave the graph as it was.
	/// The permit is consumed either way, which reopens the gate.
	pub fn complete_expand(
		&mut self,
		permit: ExpansionPermit,
		outcome: ApiResult<ExpansionResponse>,
	) -> ExploreResult<ExpandOutcome> {
		if !self.gate.is_current(&permit) {
			info!("discarding expansion of {} after reset", permit.placeholder_id());
			return Ok(ExpandOutcome::Discarded);
		}
		let response = outcome.inspect_err(|e| {
			warn!("expansion of {} failed: {}", permit.placeholder_id(), e);
		})?;
		let merged = merge_expansion(&self.graph, permit.placeholder_id(), &response)?;
		let anchor_id = response
			.nodes
			.first()
			.map(|n| n.id.clone())
			.ok_or(GraphError::EmptyResponse)?;
		self.graph = Rc::new(merged);
		Ok(ExpandOutcome::Expanded { anchor_id })
	}

	/// Store an evaluation result in a node's payload.
	pub fn attach_evaluation(&mut self, node_id: &str, evaluation: Value) -> GraphResult<()> {
		if self.graph.node(node_id).is_none() {
			return Err(GraphError::UnknownNode {
				node_id: node_id.to_string(),
			});
		}
		let mut graph = (*self.graph).clone();
		if let Some(node) = graph.nodes.get_mut(node_id) {
			node.payload.insert("evaluation".into(), evaluation);
		}
		self.graph = Rc::new(graph);
		Ok(())
	}

	/// Drop the graph and reopen the gate. A request still outstanding is
	/// discarded when it settles.
	pub fn reset(&mut self) {
		info!("reset graph");
		self.graph = Rc::new(Graph::default());
		self.gate.clear();
	}
}

/// Submit `prompt` and rebuild the session's graph from the response.
pub async fn submit_prompt<A: GraphApi>(
	explorer: &RefCell<Explorer>,
	api: &A,
	prompt: &str,
) -> ExploreResult<()> {
	let response = api.expand_prompt(prompt).await?;
	explorer.borrow_mut().submit(&response)?;
	Ok(())
}

/// Expand one placeholder. A click while another expansion is in flight is
/// a no-op returning [`ExpandOutcome::Busy`]; on failure the graph is left
/// unchanged. The `RefCell` is never borrowed across the request.
pub async fn expand_placeholder<A: GraphApi>(
	explorer: &RefCell<Explorer>,
	api: &A,
	placeholder_id: &str,
) -> ExploreResult<ExpandOutcome> {
	let begun = explorer.borrow().begin_expand(placeholder_id)?;
	let Some((permit, request)) = begun else {
		return Ok(ExpandOutcome::Busy);
	};

	let outcome = api.expand_node(&request).await;
	explorer.borrow_mut().complete_expand(permit, outcome)
}

/// Fetch an evaluation for `node_id` and store it in the node's payload.
pub async fn evaluate_node<A: GraphApi>(
	explorer: &RefCell<Explorer>,
	api: &A,
	node_id: &str,
) -> ExploreResult<()> {
	let prompt = {
		let graph = explorer.borrow().graph();
		let node = graph.node(node_id).ok_or_else(|| GraphError::UnknownNode {
			node_id: node_id.to_string(),
		})?;
		node.prompt().or(node.label()).unwrap_or_default().to_string()
	};
	let response = api.evaluate(node_id, &prompt).await?;
	explorer
		.borrow_mut()
		.attach_evaluation(node_id, response.evaluation)?;
	Ok(())
}
