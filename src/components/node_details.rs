use leptos::prelude::*;
use serde_json::Value;

use crate::graph::{GraphNode, NodeKind};

/// Payload fields shown verbatim when present.
const SHOWN_FIELDS: &[(&str, &str)] = &[
	("explanation", "Explanation"),
	("how_it_works", "How it works"),
	("turn1_response", "Turn 1 response"),
	("turn2_response", "Turn 2 response"),
	("control_response", "Control response"),
	("source", "Source"),
];

/// Display copy of a node, detached from the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDetails {
	pub id: String,
	pub kind: &'static str,
	pub title: String,
	pub prompt: Option<String>,
	pub fields: Vec<(&'static str, String)>,
	pub evaluation: Option<String>,
}

pub fn kind_name(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::Original => "Original prompt",
		NodeKind::ConfirmedBias => "Biased",
		NodeKind::ConfirmedDebias => "Debiased",
		NodeKind::ConfirmedControl => "Control",
		NodeKind::SpeculativeBias => "Bias option",
		NodeKind::SpeculativeDebias => "Debias option",
	}
}

impl From<&GraphNode> for NodeDetails {
	fn from(node: &GraphNode) -> Self {
		let fields = SHOWN_FIELDS
			.iter()
			.filter_map(|(key, name)| {
				node.payload
					.get(*key)
					.and_then(Value::as_str)
					.filter(|s| !s.is_empty())
					.map(|s| (*name, s.to_string()))
			})
			.collect();
		Self {
			id: node.id.clone(),
			kind: kind_name(node.kind),
			title: node.label().unwrap_or(&node.id).to_string(),
			prompt: node.prompt().map(str::to_string),
			fields,
			evaluation: node
				.payload
				.get("evaluation")
				.and_then(|v| serde_json::to_string_pretty(v).ok()),
		}
	}
}

#[component]
pub fn NodeDetailsPanel(
	#[prop(into)] details: Signal<Option<NodeDetails>>,
	/// Fired with the node id when "Evaluate" is pressed.
	on_evaluate: Callback<String>,
) -> impl IntoView {
	move || {
		details.get().map(|d| {
			let id = d.id.clone();
			view! {
				<aside class="node-details">
					<p class="kind">{d.kind}</p>
					<h2>{d.title}</h2>
					{d.prompt.map(|p| view! { <blockquote>{p}</blockquote> })}
					<dl>
						{d
							.fields
							.into_iter()
							.map(|(name, value)| view! {
								<dt>{name}</dt>
								<dd>{value}</dd>
							})
							.collect_view()}
					</dl>
					{match d.evaluation {
						Some(json) => view! { <pre class="evaluation">{json}</pre> }.into_any(),
						None => view! {
							<button on:click=move |_| on_evaluate.run(id.clone())>"Evaluate"</button>
						}
							.into_any(),
					}}
				</aside>
			}
		})
	}
}
