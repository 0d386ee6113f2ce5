use thiserror::Error;

/// Failures talking to the bias API.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("API error: {status} - {message}")]
	Api { status: u16, message: String },

	#[error("Invalid response: {message}")]
	InvalidResponse { message: String },

	#[error("Invalid base URL {url}: {message}")]
	InvalidBaseUrl { url: String, message: String },
}

/// Responses or graph operations that violate the tree model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
	#[error("response contained no anchor node")]
	EmptyResponse,

	#[error("first node {found} is not the declared root {expected}")]
	AnchorMismatch { expected: String, found: String },

	#[error("expansion returned a second original node {node_id}")]
	DuplicateRoot { node_id: String },

	#[error("node {node_id} already exists in the graph")]
	DuplicateNode { node_id: String },

	#[error("node {node_id} has unknown type {kind:?}")]
	UnknownNodeKind { node_id: String, kind: String },

	#[error("speculative edge {edge_id} has no bias/debias type")]
	MissingEdgeType { edge_id: String },

	#[error("edge {edge_id} references node {node_id} which is not in the batch")]
	DanglingEdge { edge_id: String, node_id: String },

	#[error("node {node_id} not found")]
	UnknownNode { node_id: String },

	#[error("node {node_id} is not a speculative placeholder")]
	NotSpeculative { node_id: String },

	#[error("node {node_id} has no parent")]
	MissingParent { node_id: String },

	#[error("graph has {count} original nodes, expected exactly one")]
	MissingRoot { count: usize },

	#[error("node {node_id} is reachable from {count} parent edges")]
	MultipleParents { node_id: String, count: usize },

	#[error("node {node_id} has level {found}, expected {expected}")]
	LevelMismatch {
		node_id: String,
		expected: u32,
		found: u32,
	},
}

/// Anything that can end a submit or expand action.
#[derive(Debug, Error)]
pub enum ExploreError {
	#[error(transparent)]
	Api(#[from] ApiError),

	#[error("malformed graph response: {0}")]
	Graph(#[from] GraphError),
}

pub type ApiResult<T> = Result<T, ApiError>;

pub type GraphResult<T> = Result<T, GraphError>;

pub type ExploreResult<T> = Result<T, ExploreError>;
