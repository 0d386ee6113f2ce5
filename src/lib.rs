//! Bias explorer: expands a prompt into a radial graph of bias and debias
//! variants, backed by the analysis HTTP API.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
pub mod api;
mod components;
pub mod config;
pub mod error;
pub mod graph;
mod pages;

// Top-Level pages
use crate::pages::dataset::Dataset;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// An app router for the explorer and dataset pages
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		<Title text="Bias Explorer" />

		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<nav class="top-nav">
				<A href="/">"Explorer"</A>
				<A href="/dataset">"Dataset"</A>
			</nav>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
				<Route path=path!("/dataset") view=Dataset />
			</Routes>
		</Router>
	}
}
