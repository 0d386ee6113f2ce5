mod client;
pub mod types;

pub use client::BiasApiClient;
pub use types::{ExpandAction, ExpandNodeRequest, ExpansionResponse, WireEdge, WireNode};

use crate::error::ApiResult;
use types::EvaluateResponse;

/// The calls the graph engine makes against the bias API.
///
/// Futures are not required to be `Send`: in the browser everything runs on
/// one thread.
#[allow(async_fn_in_trait)]
pub trait GraphApi {
	async fn expand_prompt(&self, prompt: &str) -> ApiResult<ExpansionResponse>;

	async fn expand_node(&self, request: &ExpandNodeRequest) -> ApiResult<ExpansionResponse>;

	async fn evaluate(&self, node_id: &str, prompt: &str) -> ApiResult<EvaluateResponse>;
}
