//! Build-time configuration for the API endpoint.

/// Used when `BIAS_API_URL` is not set at build time.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Where the bias API lives.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiConfig {
	/// Base URL without a trailing slash, e.g. `http://localhost:5000/api`.
	pub base_url: String,
}

impl ApiConfig {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
		}
	}

	/// Reads `BIAS_API_URL` from the build environment, the only place a
	/// WASM bundle can take it from.
	pub fn from_env() -> Self {
		Self::new(option_env!("BIAS_API_URL").unwrap_or(DEFAULT_API_URL))
	}
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self::new(DEFAULT_API_URL)
	}
}
