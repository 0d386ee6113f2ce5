use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info};

use crate::api::BiasApiClient;
use crate::components::bias_graph::{BiasGraphCanvas, NodeHandler};
use crate::components::node_details::{NodeDetails, NodeDetailsPanel};
use crate::config::ApiConfig;
use crate::graph::{ExpandOutcome, Explorer, evaluate_node, expand_placeholder, submit_prompt};

/// Re-read the selected node after the graph changed under it.
fn refresh_details(explorer: &RefCell<Explorer>, selected: RwSignal<Option<NodeDetails>>) {
	let Some(id) = selected.with_untracked(|d| d.as_ref().map(|d| d.id.clone())) else {
		return;
	};
	let graph = explorer.borrow().graph();
	selected.set(graph.node(&id).map(NodeDetails::from));
}

/// Graph exploration page
#[component]
pub fn Home() -> impl IntoView {
	let explorer = Rc::new(RefCell::new(Explorer::new()));
	let api = BiasApiClient::new(&ApiConfig::from_env());

	let prompt = RwSignal::new(String::new());
	let status = RwSignal::new(None::<String>);
	let submitting = RwSignal::new(false);
	let expanding = RwSignal::new(None::<String>);
	let selected = RwSignal::new(None::<NodeDetails>);
	let evaluate_request = RwSignal::new(None::<String>);

	let (explorer_submit, api_submit) = (explorer.clone(), api.clone());
	let on_submit = move |_| {
		let text = prompt.get_untracked();
		if text.trim().is_empty() || submitting.get_untracked() {
			return;
		}
		submitting.set(true);
		status.set(None);
		selected.set(None);
		let (explorer, api) = (explorer_submit.clone(), api_submit.clone());
		spawn_local(async move {
			if let Err(e) = submit_prompt(&explorer, &api, &text).await {
				error!("submit failed: {}", e);
				status.set(Some(e.to_string()));
			}
			expanding.set(explorer.borrow().gate().in_flight());
			submitting.set(false);
		});
	};

	let explorer_reset = explorer.clone();
	let on_reset = move |_| {
		explorer_reset.borrow_mut().reset();
		expanding.set(None);
		selected.set(None);
		status.set(None);
	};

	let (explorer_expand, api_expand) = (explorer.clone(), api.clone());
	let on_expand: NodeHandler = Rc::new(move |id: String| {
		if explorer_expand.borrow().gate().is_expanding() {
			return;
		}
		expanding.set(Some(id.clone()));
		status.set(None);
		let (explorer, api) = (explorer_expand.clone(), api_expand.clone());
		spawn_local(async move {
			match expand_placeholder(&explorer, &api, &id).await {
				Ok(ExpandOutcome::Expanded { anchor_id }) => {
					info!("expanded {} into {}", id, anchor_id);
					refresh_details(&explorer, selected);
				}
				Ok(ExpandOutcome::Busy | ExpandOutcome::Discarded) => {}
				Err(e) => {
					error!("expanding {} failed: {}", id, e);
					status.set(Some(e.to_string()));
				}
			}
			expanding.set(explorer.borrow().gate().in_flight());
		});
	});

	let explorer_select = explorer.clone();
	let on_select: NodeHandler = Rc::new(move |id: String| {
		let graph = explorer_select.borrow().graph();
		selected.set(graph.node(&id).map(NodeDetails::from));
	});

	let (explorer_eval, api_eval) = (explorer.clone(), api.clone());
	Effect::new(move |_| {
		let Some(id) = evaluate_request.get() else {
			return;
		};
		let (explorer, api) = (explorer_eval.clone(), api_eval.clone());
		spawn_local(async move {
			if let Err(e) = evaluate_node(&explorer, &api, &id).await {
				error!("evaluating {} failed: {}", id, e);
				status.set(Some(e.to_string()));
			}
			refresh_details(&explorer, selected);
		});
	});
	let on_evaluate = Callback::new(move |id: String| evaluate_request.set(Some(id)));

	view! {
		<div class="fullscreen-graph">
			<BiasGraphCanvas
				explorer=explorer.clone()
				on_expand=on_expand
				on_select=on_select
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Bias Explorer"</h1>
				<p class="subtitle">
					"Click a dashed node to expand it. Drag nodes to move their subtree."
				</p>
				<textarea
					placeholder="Enter a prompt to analyse"
					prop:value=move || prompt.get()
					on:input=move |ev| prompt.set(event_target_value(&ev))
				/>
				<div class="actions">
					<button on:click=on_submit disabled=move || submitting.get()>
						{move || if submitting.get() { "Analysing…" } else { "Analyse" }}
					</button>
					<button on:click=on_reset>"Reset"</button>
				</div>
				{move || {
					expanding
						.get()
						.map(|id| view! { <p class="expanding">"Expanding " {id} "…"</p> })
				}}
				{move || status.get().map(|msg| view! { <p class="error">{msg}</p> })}
			</div>
			<NodeDetailsPanel details=selected on_evaluate=on_evaluate />
		</div>
	}
}
