use leptos::prelude::*;
use leptos::task::spawn_local;
use log::error;

use crate::api::BiasApiClient;
use crate::api::types::{DatasetEntry, DatasetQuery, DatasetStats, ModelInfo, ModelResult};
use crate::config::ApiConfig;

const PAGE_SIZE: usize = 20;

/// Index used to look an entry up in stored model results: the API's own
/// `entry_index` when given, else its position in the listing.
fn entry_index(entry: &DatasetEntry, offset: usize, position: usize) -> usize {
	entry.entry_index.unwrap_or(offset + position)
}

/// Browse the benchmark dataset and stored model results.
#[component]
pub fn Dataset() -> impl IntoView {
	let api = BiasApiClient::new(&ApiConfig::from_env());

	let page = RwSignal::new(0usize);
	let total = RwSignal::new(0usize);
	let entries = RwSignal::new(Vec::<DatasetEntry>::new());
	let stats = RwSignal::new(None::<DatasetStats>);
	let models = RwSignal::new(Vec::<ModelInfo>::new());
	let model = RwSignal::new(None::<String>);
	let result = RwSignal::new(None::<ModelResult>);
	let status = RwSignal::new(None::<String>);

	let api_init = api.clone();
	Effect::new(move |_| {
		let api = api_init.clone();
		spawn_local(async move {
			match api.dataset_stats().await {
				Ok(s) => stats.set(Some(s)),
				Err(e) => {
					error!("dataset stats failed: {}", e);
					status.set(Some(e.to_string()));
				}
			}
			match api.models_available().await {
				Ok(available) => {
					let all: Vec<ModelInfo> = available.all().cloned().collect();
					model.set(all.first().map(|m| m.id.clone()));
					models.set(all);
				}
				Err(e) => error!("model list failed: {}", e),
			}
		});
	});

	let api_page = api.clone();
	Effect::new(move |_| {
		let query = DatasetQuery {
			limit: PAGE_SIZE,
			offset: page.get() * PAGE_SIZE,
		};
		let api = api_page.clone();
		spawn_local(async move {
			match api.dataset_entries(query).await {
				Ok(p) => {
					total.set(p.total);
					entries.set(p.entries);
				}
				Err(e) => {
					error!("dataset page {} failed: {}", query.offset / PAGE_SIZE, e);
					status.set(Some(e.to_string()));
				}
			}
		});
	});

	// entry index whose stored result should be shown for the selected model
	let requested = RwSignal::new(None::<usize>);
	Effect::new(move |_| {
		let (Some(index), Some(model_id)) = (requested.get(), model.get()) else {
			return;
		};
		let api = api.clone();
		result.set(None);
		spawn_local(async move {
			match api.model_result(&model_id, index).await {
				Ok(r) => {
					status.set(None);
					result.set(Some(r));
				}
				Err(e) => {
					error!("result {} for {} failed: {}", index, model_id, e);
					status.set(Some(e.to_string()));
				}
			}
		});
	});

	let pages = move || total.get().div_ceil(PAGE_SIZE).max(1);

	view! {
		<div class="dataset-page">
			<h1>"Dataset"</h1>
			{move || {
				stats
					.get()
					.map(|s| {
						view! {
							<p class="stats">
								{s.total_entries} " entries across "
								{s.stereotype_type_counts.len()} " stereotype types"
							</p>
						}
					})
			}}
			<label>
				"Model "
				<select on:change=move |ev| model.set(Some(event_target_value(&ev)))>
					{move || {
						models
							.get()
							.into_iter()
							.map(|m| {
								let name = m.name.clone().unwrap_or_else(|| m.id.clone());
								view! { <option value=m.id>{name}</option> }
							})
							.collect_view()
					}}
				</select>
			</label>
			<table>
				<thead>
					<tr>
						<th>"#"</th>
						<th>"Question"</th>
						<th>"Trait"</th>
						<th>"Type"</th>
						<th></th>
					</tr>
				</thead>
				<tbody>
					{move || {
						let offset = page.get() * PAGE_SIZE;
						entries
							.get()
							.into_iter()
							.enumerate()
							.map(|(i, entry)| {
								let index = entry_index(&entry, offset, i);
								view! {
									<tr>
										<td>{index}</td>
										<td>{entry.target_question}</td>
										<td>{entry.emgsd_trait.unwrap_or_default()}</td>
										<td>{entry.emgsd_stereotype_type.unwrap_or_default()}</td>
										<td>
											<button on:click=move |_| requested.set(Some(index))>"Result"</button>
										</td>
									</tr>
								}
							})
							.collect_view()
					}}
				</tbody>
			</table>
			<div class="pager">
				<button
					disabled=move || page.get() == 0
					on:click=move |_| page.update(|p| *p = p.saturating_sub(1))
				>
					"Previous"
				</button>
				<span>{move || format!("Page {} of {}", page.get() + 1, pages())}</span>
				<button
					disabled=move || page.get() + 1 >= pages()
					on:click=move |_| page.update(|p| *p += 1)
				>
					"Next"
				</button>
			</div>
			{move || status.get().map(|msg| view! { <p class="error">{msg}</p> })}
			{move || {
				result
					.get()
					.map(|r| {
						view! {
							<section class="model-result">
								<h2>
									{r.model_id.unwrap_or_default()} " · "
									{r.bias_type.unwrap_or_default()}
								</h2>
								<h3>"Turn 1"</h3>
								<blockquote>{r.turn1_question}</blockquote>
								<p>{r.turn1_response}</p>
								<h3>"Turn 2"</h3>
								<p>{r.turn2_response}</p>
								<h3>"Control"</h3>
								<p>{r.control_response}</p>
							</section>
						}
					})
			}}
		</div>
	}
}
