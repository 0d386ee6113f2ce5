use log::{debug, error};
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::GraphApi;
use super::types::{
	DatasetPage, DatasetQuery, DatasetStats, EvaluateRequest, EvaluateResponse, ExpandNodeRequest,
	ExpandPromptRequest, ExpansionResponse, ModelResult, ModelsAvailable,
};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Client for the bias exploration REST API.
#[derive(Clone, Debug)]
pub struct BiasApiClient {
	client: Client,
	base_url: String,
}

impl BiasApiClient {
	pub fn new(config: &ApiConfig) -> Self {
		Self {
			client: Client::new(),
			base_url: config.base_url.clone(),
		}
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Expand a starter prompt into a root node and its first ring.
	pub async fn expand_prompt(&self, prompt: &str) -> ApiResult<ExpansionResponse> {
		let body = ExpandPromptRequest {
			prompt: prompt.to_string(),
		};
		self.post(&["graph", "expand"], &body).await
	}

	/// Expand one speculative option beneath `request.node_id`.
	pub async fn expand_node(&self, request: &ExpandNodeRequest) -> ApiResult<ExpansionResponse> {
		self.post(&["graph", "expand-node"], request).await
	}

	pub async fn evaluate(&self, node_id: &str, prompt: &str) -> ApiResult<EvaluateResponse> {
		let body = EvaluateRequest {
			node_id: node_id.to_string(),
			prompt: prompt.to_string(),
		};
		self.post(&["graph", "evaluate"], &body).await
	}

	pub async fn health(&self) -> ApiResult<Value> {
		self.get(self.url(&["health"])?).await
	}

	pub async fn models_available(&self) -> ApiResult<ModelsAvailable> {
		self.get(self.url(&["models", "available"])?).await
	}

	pub async fn dataset_stats(&self) -> ApiResult<DatasetStats> {
		self.get(self.url(&["dataset", "stats"])?).await
	}

	pub async fn dataset_entries(&self, query: DatasetQuery) -> ApiResult<DatasetPage> {
		let mut url = self.url(&["dataset", "entries"])?;
		url.query_pairs_mut()
			.append_pair("limit", &query.limit.to_string())
			.append_pair("offset", &query.offset.to_string());
		self.get(url).await
	}

	/// Stored result of `model_id` on dataset entry `index`. Model ids
	/// contain `:` and `.`, so they go in as an encoded path segment.
	pub async fn model_result(&self, model_id: &str, index: usize) -> ApiResult<ModelResult> {
		let index = index.to_string();
		self.get(self.url(&["models", model_id, "result", &index])?)
			.await
	}

	fn url(&self, segments: &[&str]) -> ApiResult<Url> {
		let bad_url = |message: String| ApiError::InvalidBaseUrl {
			url: self.base_url.clone(),
			message,
		};
		let mut url = Url::parse(&self.base_url).map_err(|e| bad_url(e.to_string()))?;
		url.path_segments_mut()
			.map_err(|_| bad_url("cannot carry a path".into()))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	async fn post<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
	where
		B: Serialize + ?Sized,
		T: DeserializeOwned,
	{
		let url = self.url(segments)?;
		debug!("POST {}", url);
		let url_str = url.to_string();
		let response = self.client.post(url).json(body).send().await?;
		Self::decode(&url_str, response).await
	}

	async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
		debug!("GET {}", url);
		let url_str = url.to_string();
		let response = self.client.get(url).send().await?;
		Self::decode(&url_str, response).await
	}

	async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> ApiResult<T> {
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			let message = serde_json::from_str::<Value>(&body)
				.ok()
				.and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
				.unwrap_or(body);
			error!("{} failed: status={} message={}", url, status.as_u16(), message);
			return Err(ApiError::Api {
				status: status.as_u16(),
				message,
			});
		}

		let parsed = response
			.json::<T>()
			.await
			.map_err(|e| ApiError::InvalidResponse {
				message: format!("failed to parse response from {}: {}", url, e),
			})?;
		debug!("{} ok", url);
		Ok(parsed)
	}
}

impl GraphApi for BiasApiClient {
	async fn expand_prompt(&self, prompt: &str) -> ApiResult<ExpansionResponse> {
		BiasApiClient::expand_prompt(self, prompt).await
	}

	async fn expand_node(&self, request: &ExpandNodeRequest) -> ApiResult<ExpansionResponse> {
		BiasApiClient::expand_node(self, request).await
	}

	async fn evaluate(&self, node_id: &str, prompt: &str) -> ApiResult<EvaluateResponse> {
		BiasApiClient::evaluate(self, node_id, prompt).await
	}
}
