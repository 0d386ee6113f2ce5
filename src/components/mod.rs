pub mod bias_graph;
pub mod node_details;
