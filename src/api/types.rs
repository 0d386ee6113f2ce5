use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node as sent by the API. Everything but `id` is kept as opaque payload.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct WireNode {
	pub id: String,
	#[serde(flatten)]
	pub payload: Map<String, Value>,
}

impl WireNode {
	/// The `type` discriminator, if the API sent one.
	pub fn kind(&self) -> Option<&str> {
		self.payload.get("type").and_then(Value::as_str)
	}
}

/// Edge as sent by the API. A missing `target` marks a speculative option.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct WireEdge {
	pub id: String,
	pub source: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub edge_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bias: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl WireEdge {
	/// Whether the legacy `bias` marker is present and truthy.
	pub fn bias_marker(&self) -> bool {
		match &self.bias {
			Some(Value::Bool(b)) => *b,
			Some(Value::String(s)) => !s.is_empty(),
			Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
			Some(Value::Null) | None => false,
			Some(_) => true,
		}
	}
}

/// Body of `graph/expand` and `graph/expand-node`. The first node is the anchor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ExpansionResponse {
	#[serde(default)]
	pub nodes: Vec<WireNode>,
	#[serde(default)]
	pub edges: Vec<WireEdge>,
	/// Legacy responses list unexpanded options separately.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub potential_edges: Vec<WireEdge>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub root_id: Option<String>,
}

impl ExpansionResponse {
	/// All edges, with `potential_edges` folded in as targetless options.
	pub fn all_edges(&self) -> Vec<WireEdge> {
		let potential = self.potential_edges.iter().cloned().map(|mut e| {
			e.target = None;
			e
		});
		self.edges.iter().cloned().chain(potential).collect()
	}
}

/// Direction of a transformation.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpandAction {
	Bias,
	Debias,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandPromptRequest {
	pub prompt: String,
}

/// Asks the API to expand one option beneath `node_id`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandNodeRequest {
	pub node_id: String,
	pub prompt: String,
	pub action: ExpandAction,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bias_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EvaluateRequest {
	pub node_id: String,
	pub prompt: String,
}

/// An evaluation is opaque JSON stored on the node as-is.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EvaluateResponse {
	pub node_id: String,
	pub evaluation: Value,
	#[serde(default)]
	pub model: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModelInfo {
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
}

/// Models with stored results, grouped by provider.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ModelsAvailable {
	#[serde(default)]
	pub bedrock_models: Vec<ModelInfo>,
	#[serde(default)]
	pub ollama_models: Vec<ModelInfo>,
	#[serde(default)]
	pub total_models: Option<usize>,
}

impl ModelsAvailable {
	pub fn all(&self) -> impl Iterator<Item = &ModelInfo> {
		self.bedrock_models.iter().chain(&self.ollama_models)
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct DatasetStats {
	pub total_entries: usize,
	#[serde(default)]
	pub stereotype_type_counts: Map<String, Value>,
}

/// One benchmark row; unknown columns land in `extra`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DatasetEntry {
	#[serde(default)]
	pub entry_index: Option<usize>,
	pub target_question: String,
	#[serde(default)]
	pub emgsd_trait: Option<String>,
	#[serde(default)]
	pub emgsd_stereotype_type: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct DatasetPage {
	#[serde(default)]
	pub entries: Vec<DatasetEntry>,
	#[serde(default)]
	pub total: usize,
}

/// Paging for `dataset/entries`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatasetQuery {
	pub limit: usize,
	pub offset: usize,
}

impl Default for DatasetQuery {
	fn default() -> Self {
		Self {
			limit: 20,
			offset: 0,
		}
	}
}

/// A model's stored answers for one dataset entry.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModelResult {
	#[serde(default)]
	pub model_id: Option<String>,
	#[serde(default)]
	pub bias_type: Option<String>,
	pub turn1_question: String,
	pub turn1_response: String,
	pub turn2_response: String,
	pub control_response: String,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
