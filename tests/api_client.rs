//! Integration tests for the bias API client
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use std::cell::RefCell;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{body_json, method, path, query_param},
};

use bias_graph_explorer::api::types::DatasetQuery;
use bias_graph_explorer::api::{BiasApiClient, ExpandAction, ExpandNodeRequest};
use bias_graph_explorer::config::ApiConfig;
use bias_graph_explorer::error::{ApiError, ExploreError};
use bias_graph_explorer::graph::{
	ExpandOutcome, Explorer, NodeKind, expand_placeholder, submit_prompt,
};

/// Create a test client pointing at the mock server's `/api` prefix
fn create_test_client(server: &MockServer) -> BiasApiClient {
	BiasApiClient::new(&ApiConfig::new(format!("{}/api/", server.uri())))
}

fn root_body() -> serde_json::Value {
	json!({
		"root_id": "root",
		"nodes": [{"id": "root", "type": "original", "prompt": "Why are nurses women?"}],
		"edges": [
			{"id": "anchoring", "source": "root", "label": "Anchoring", "type": "bias"},
			{"id": "reframe", "source": "root", "label": "Reframe", "type": "debias"}
		]
	})
}

mod graph_tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[tokio::test]
	async fn expand_prompt_posts_prompt() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/graph/expand"))
			.and(body_json(json!({"prompt": "Why are nurses women?"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(root_body()))
			.expect(1)
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let response = client.expand_prompt("Why are nurses women?").await.unwrap();

		assert_eq!(response.root_id.as_deref(), Some("root"));
		assert_eq!(response.nodes.len(), 1);
		assert_eq!(response.nodes[0].kind(), Some("original"));
		assert_eq!(response.edges.len(), 2);
		assert!(response.edges.iter().all(|e| e.target.is_none()));
	}

	#[tokio::test]
	async fn expand_node_sends_action_and_bias_type() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/graph/expand-node"))
			.and(body_json(json!({
				"node_id": "root",
				"prompt": "Why are nurses women?",
				"action": "debias",
				"bias_type": "reframe"
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"nodes": [{"id": "d1", "type": "debiased", "prompt": "What draws people to nursing?"}],
				"edges": [{"id": "root-d1", "source": "root", "target": "d1", "type": "debias"}]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let request = ExpandNodeRequest {
			node_id: "root".into(),
			prompt: "Why are nurses women?".into(),
			action: ExpandAction::Debias,
			bias_type: Some("reframe".into()),
		};
		let response = client.expand_node(&request).await.unwrap();

		assert_eq!(response.nodes[0].id, "d1");
		assert_eq!(response.edges[0].target.as_deref(), Some("d1"));
	}

	#[tokio::test]
	async fn evaluate_returns_opaque_evaluation() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/graph/evaluate"))
			.and(body_json(json!({"node_id": "root", "prompt": "p"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"node_id": "root",
				"evaluation": {"bias_score": 0.4, "severity": "low"},
				"model": "claude"
			})))
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let response = client.evaluate("root", "p").await.unwrap();

		assert_eq!(response.evaluation["severity"], json!("low"));
		assert_eq!(response.model.as_deref(), Some("claude"));
	}
}

mod error_tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[tokio::test]
	async fn json_error_field_becomes_message() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/graph/expand"))
			.respond_with(
				ResponseTemplate::new(500).set_body_json(json!({"error": "model unavailable"})),
			)
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let err = client.expand_prompt("x").await.unwrap_err();

		match err {
			ApiError::Api { status, message } => {
				assert_eq!(status, 500);
				assert_eq!(message, "model unavailable");
			}
			other => panic!("expected Api error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn plain_error_body_is_kept() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/health"))
			.respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let err = client.health().await.unwrap_err();

		assert!(
			matches!(err, ApiError::Api { status: 503, ref message } if message == "warming up"),
			"unexpected error: {err:?}"
		);
	}

	#[tokio::test]
	async fn unparseable_body_is_invalid_response() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/dataset/stats"))
			.respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let err = client.dataset_stats().await.unwrap_err();

		assert!(matches!(err, ApiError::InvalidResponse { .. }), "unexpected error: {err:?}");
	}

	#[tokio::test]
	async fn bad_base_url_is_reported_as_config_fault() {
		let client = BiasApiClient::new(&ApiConfig::new("not a url"));
		let err = client.health().await.unwrap_err();
		assert!(
			matches!(err, ApiError::InvalidBaseUrl { ref url, .. } if url == "not a url"),
			"unexpected error: {err:?}"
		);

		let err = client.expand_prompt("x").await.unwrap_err();
		assert!(matches!(err, ApiError::InvalidBaseUrl { .. }), "unexpected error: {err:?}");

		let client = BiasApiClient::new(&ApiConfig::new("mailto:someone@example.com"));
		let err = client.dataset_stats().await.unwrap_err();
		assert!(matches!(err, ApiError::InvalidBaseUrl { .. }), "unexpected error: {err:?}");
	}

	#[tokio::test]
	async fn unreachable_server_is_http_error() {
		let client = BiasApiClient::new(&ApiConfig::new("http://127.0.0.1:9/api"));
		let err = client.health().await.unwrap_err();

		assert!(matches!(err, ApiError::Http(_)), "unexpected error: {err:?}");
	}
}

mod dataset_tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[tokio::test]
	async fn entries_are_paged_by_query() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/dataset/entries"))
			.and(query_param("limit", "20"))
			.and(query_param("offset", "40"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"entries": [{
					"entry_index": 40,
					"target_question": "Are nurses caring?",
					"emgsd_trait": "caring",
					"emgsd_stereotype_type": "profession",
					"emgsd_text": "The nurse was caring."
				}],
				"total": 1158
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let page = client
			.dataset_entries(DatasetQuery {
				limit: 20,
				offset: 40,
			})
			.await
			.unwrap();

		assert_eq!(page.total, 1158);
		assert_eq!(page.entries[0].entry_index, Some(40));
		assert_eq!(page.entries[0].emgsd_trait.as_deref(), Some("caring"));
		assert_eq!(page.entries[0].extra["emgsd_text"], json!("The nurse was caring."));
	}

	#[tokio::test]
	async fn model_result_uses_model_id_as_path_segment() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/models/llama3.1:8b/result/3"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"model_id": "llama3.1:8b",
				"bias_type": "anchoring",
				"turn1_question": "q1",
				"turn1_response": "r1",
				"turn2_response": "r2",
				"control_response": "c"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let result = client.model_result("llama3.1:8b", 3).await.unwrap();

		assert_eq!(result.bias_type.as_deref(), Some("anchoring"));
		assert_eq!(result.turn2_response, "r2");
	}

	#[tokio::test]
	async fn models_are_listed_across_providers() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/models/available"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"bedrock_models": [{"id": "claude-3-haiku", "name": "Claude 3 Haiku"}],
				"ollama_models": [{"id": "llama3.1:8b"}],
				"total_models": 2
			})))
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let models = client.models_available().await.unwrap();
		let ids: Vec<&str> = models.all().map(|m| m.id.as_str()).collect();

		assert_eq!(ids, vec!["claude-3-haiku", "llama3.1:8b"]);
	}
}

mod explorer_tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[tokio::test]
	async fn submit_then_expand_against_live_client() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/graph/expand"))
			.respond_with(ResponseTemplate::new(200).set_body_json(root_body()))
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/api/graph/expand-node"))
			.and(body_json(json!({
				"node_id": "root",
				"prompt": "Why are nurses women?",
				"action": "bias",
				"bias_type": "anchoring"
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"nodes": [{"id": "b1", "type": "biased", "prompt": "Nurses are women, right?"}],
				"edges": [{"id": "more", "source": "b1", "type": "bias"}]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let explorer = RefCell::new(Explorer::new());

		submit_prompt(&explorer, &client, "Why are nurses women?").await.unwrap();
		assert_eq!(explorer.borrow().graph().nodes.len(), 3);

		let outcome = expand_placeholder(&explorer, &client, "potential-root-anchoring")
			.await
			.unwrap();
		assert_eq!(outcome, ExpandOutcome::Expanded { anchor_id: "b1".into() });

		let graph = explorer.borrow().graph();
		assert!(graph.node("potential-root-anchoring").is_none());
		assert_eq!(graph.node("b1").map(|n| n.kind), Some(NodeKind::ConfirmedBias));
		assert_eq!(graph.node("b1").map(|n| n.level), Some(1));
		assert!(graph.node("potential-b1-more").is_some());
		assert!(!explorer.borrow().gate().is_expanding());
	}

	#[tokio::test]
	async fn failed_expansion_keeps_graph() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/graph/expand"))
			.respond_with(ResponseTemplate::new(200).set_body_json(root_body()))
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/api/graph/expand-node"))
			.respond_with(ResponseTemplate::new(502).set_body_json(json!({"error": "upstream"})))
			.mount(&server)
			.await;

		let client = create_test_client(&server);
		let explorer = RefCell::new(Explorer::new());
		submit_prompt(&explorer, &client, "Why are nurses women?").await.unwrap();
		let before = explorer.borrow().graph();

		let err = expand_placeholder(&explorer, &client, "potential-root-reframe")
			.await
			.unwrap_err();

		assert!(matches!(err, ExploreError::Api(ApiError::Api { status: 502, .. })));
		assert_eq!(*explorer.borrow().graph(), *before);
		assert!(!explorer.borrow().gate().is_expanding());
	}
}
