use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::api::ExpandAction;

/// Canvas coordinates in graph space, before the view transform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

impl Position {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// This position moved by `(dx, dy)`.
	pub fn offset(self, dx: f64, dy: f64) -> Self {
		Self::new(self.x + dx, self.y + dy)
	}
}

/// What a node stands for. Speculative kinds are unexpanded options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
	/// The submitted prompt; exactly one per graph.
	Original,
	ConfirmedBias,
	ConfirmedDebias,
	ConfirmedControl,
	SpeculativeBias,
	SpeculativeDebias,
}

impl NodeKind {
	/// Maps the API's node `type` onto a confirmed kind.
	pub fn from_wire(kind: &str) -> Option<Self> {
		match kind {
			"original" => Some(Self::Original),
			"biased" | "bias" => Some(Self::ConfirmedBias),
			"debiased" | "debias" => Some(Self::ConfirmedDebias),
			"control" => Some(Self::ConfirmedControl),
			_ => None,
		}
	}

	/// Placeholder kind for an option going in `action`'s direction.
	pub fn speculative(action: ExpandAction) -> Self {
		match action {
			ExpandAction::Bias => Self::SpeculativeBias,
			ExpandAction::Debias => Self::SpeculativeDebias,
		}
	}

	pub fn is_speculative(self) -> bool {
		matches!(self, Self::SpeculativeBias | Self::SpeculativeDebias)
	}

	/// Direction of the transformation a node represents, if any.
	pub fn action(self) -> Option<ExpandAction> {
		match self {
			Self::ConfirmedBias | Self::SpeculativeBias => Some(ExpandAction::Bias),
			Self::ConfirmedDebias | Self::SpeculativeDebias => Some(ExpandAction::Debias),
			Self::Original | Self::ConfirmedControl => None,
		}
	}

	/// What a placeholder becomes once expanded.
	pub fn confirmed(self) -> Self {
		match self {
			Self::SpeculativeBias => Self::ConfirmedBias,
			Self::SpeculativeDebias => Self::ConfirmedDebias,
			other => other,
		}
	}
}

/// A positioned node. `payload` carries the API's fields untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: String,
	pub position: Position,
	pub kind: NodeKind,
	/// Depth from the root, which is 0.
	pub level: u32,
	/// Direction from the placement anchor. Seeds the spread of this
	/// node's own children; not kept in sync when the node is dragged.
	pub angle: f64,
	/// `None` only for the root.
	pub parent_id: Option<String>,
	pub payload: Map<String, Value>,
}

impl GraphNode {
	pub fn label(&self) -> Option<&str> {
		self.payload.get("label").and_then(Value::as_str)
	}

	pub fn prompt(&self) -> Option<&str> {
		self.payload.get("prompt").and_then(Value::as_str)
	}
}

/// Colour family of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeTone {
	Bias,
	Debias,
	Neutral,
}

impl From<Option<ExpandAction>> for EdgeTone {
	fn from(action: Option<ExpandAction>) -> Self {
		match action {
			Some(ExpandAction::Bias) => Self::Bias,
			Some(ExpandAction::Debias) => Self::Debias,
			None => Self::Neutral,
		}
	}
}

/// How an edge is drawn; dashed edges lead to placeholders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeStyle {
	pub tone: EdgeTone,
	pub dashed: bool,
}

/// A directed parent-to-child edge.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	pub id: String,
	pub source: String,
	/// `None` for a potential edge with no destination node yet.
	pub target: Option<String>,
	pub label: Option<String>,
	pub style: EdgeStyle,
}

/// A rooted tree of nodes. Replaced wholesale on every mutation so readers
/// never see a half-merged state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	pub nodes: HashMap<String, GraphNode>,
	pub edges: Vec<GraphEdge>,
}

impl Graph {
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.edges.is_empty()
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.get(id)
	}

	/// The node of kind [`NodeKind::Original`].
	pub fn root(&self) -> Option<&GraphNode> {
		self.nodes.values().find(|n| n.kind == NodeKind::Original)
	}

	pub fn insert_node(&mut self, node: GraphNode) {
		self.nodes.insert(node.id.clone(), node);
	}

	/// Nodes reached by one edge out of `id`.
	pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphNode> + 'a {
		self.edges
			.iter()
			.filter(move |e| e.source == id)
			.filter_map(|e| e.target.as_deref())
			.filter_map(|t| self.nodes.get(t))
	}
}
