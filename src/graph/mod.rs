//! Graph layout and mutation engine. Plain data only; drawing lives in
//! `components::bias_graph`.

pub mod drag;
pub mod expand;
pub mod layout;
pub mod session;
pub mod traverse;
mod types;

pub use drag::DragGesture;
pub use session::{ExpandOutcome, ExpansionGate, Explorer, evaluate_node, expand_placeholder, submit_prompt};
pub use types::{EdgeStyle, EdgeTone, Graph, GraphEdge, GraphNode, NodeKind, Position};
