//! Signing and token endpoint configuration.
//!
//! [`OAuthConfig`] is plain data built once at startup, either through
//! [`OAuthConfigBuilder`] or deserialized with serde. Consumer credentials are kept out of it
//! on purpose and handed to [`TokenExchange`](crate::oauth::TokenExchange) separately, so the
//! configuration can be logged and persisted safely.

/// Builder API for assembling configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError, http::Method, obs::FlowKind};

/// Callback value announcing an out-of-band (PIN based) verifier.
pub const OUT_OF_BAND_CALLBACK: &str = "oob";
/// Lowest status code the retrying executor treats as a failure.
pub const DEFAULT_ERROR_THRESHOLD: u16 = 400;

/// Where OAuth protocol parameters travel on outbound requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDestination {
	/// Single `Authorization: OAuth ...` header.
	#[default]
	Header,
	/// Query string for body-less methods, form body for `POST`/`PUT`/`PATCH`.
	Query,
}

/// URL + HTTP method for one token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
	/// Absolute endpoint URL.
	pub url: Url,
	/// Method used to call the endpoint; defaults to `POST`.
	#[serde(default)]
	pub method: Method,
}
impl Endpoint {
	/// Creates a `POST` endpoint.
	pub fn new(url: Url) -> Self {
		Self { url, method: Method::Post }
	}

	/// Parses `url` into a `POST` endpoint.
	pub fn parse(url: &str) -> Result<Self, ConfigError> {
		Url::parse(url)
			.map(Self::new)
			.map_err(|source| ConfigError::InvalidUrl { url: url.to_owned(), source })
	}

	/// Overrides the HTTP method.
	pub fn with_method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}
}

/// Immutable configuration consumed by token exchanges and authorizations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
	/// Temporary credential (request token) endpoint.
	#[serde(default)]
	pub request_token: Option<Endpoint>,
	/// Token credential (access token) endpoint.
	#[serde(default)]
	pub access_token: Option<Endpoint>,
	/// Access token refresh endpoint.
	#[serde(default)]
	pub refresh_token: Option<Endpoint>,
	/// Resource owner authorization page.
	#[serde(default)]
	pub authorization: Option<Url>,
	/// `oauth_callback` sent with request token calls.
	#[serde(default = "default_callback")]
	pub callback: String,
	/// Placement of OAuth parameters on outbound requests.
	#[serde(default)]
	pub destination: ParamDestination,
	/// Responses with a status at or above this value count as retryable failures.
	#[serde(default = "default_error_threshold")]
	pub error_threshold: u16,
}
impl OAuthConfig {
	/// Creates a new builder.
	pub fn builder() -> OAuthConfigBuilder {
		OAuthConfigBuilder::new()
	}

	/// Returns the endpoint serving `kind`, or a configuration error when it is absent.
	pub fn endpoint(&self, kind: FlowKind) -> Result<&Endpoint, ConfigError> {
		let endpoint = match kind {
			FlowKind::RequestToken => self.request_token.as_ref(),
			FlowKind::AccessToken => self.access_token.as_ref(),
			FlowKind::RefreshToken => self.refresh_token.as_ref(),
			FlowKind::Authorize | FlowKind::Execute => None,
		};

		endpoint.ok_or(ConfigError::MissingEndpoint { operation: kind.as_str() })
	}
}
impl Default for OAuthConfig {
	fn default() -> Self {
		Self {
			request_token: None,
			access_token: None,
			refresh_token: None,
			authorization: None,
			callback: default_callback(),
			destination: ParamDestination::default(),
			error_threshold: DEFAULT_ERROR_THRESHOLD,
		}
	}
}

fn default_callback() -> String {
	OUT_OF_BAND_CALLBACK.into()
}

fn default_error_threshold() -> u16 {
	DEFAULT_ERROR_THRESHOLD
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn missing_endpoints_surface_as_config_errors() {
		let config = OAuthConfig::default();
		let err = config
			.endpoint(FlowKind::RefreshToken)
			.expect_err("Unconfigured refresh endpoint should be rejected.");

		assert!(matches!(err, ConfigError::MissingEndpoint { operation: "refresh_token" }));
		assert_eq!(config.callback, OUT_OF_BAND_CALLBACK);
		assert_eq!(config.destination, ParamDestination::Header);
	}

	#[test]
	fn endpoints_parse_or_report_the_raw_url() {
		let endpoint = Endpoint::parse("https://api.example.com/oauth/request_token")
			.expect("Absolute URL should parse.");

		assert_eq!(endpoint.method, Method::Post);
		assert_eq!(endpoint.with_method(Method::Get).method, Method::Get);

		let err = Endpoint::parse("not a url").expect_err("Relative input should be rejected.");

		assert!(matches!(err, ConfigError::InvalidUrl { ref url, .. } if url == "not a url"));
	}

	#[test]
	fn deserialization_fills_defaults() {
		let config: OAuthConfig = serde_json::from_str(
			r#"{
				"request_token": { "url": "https://api.example.com/oauth/request_token" },
				"access_token": { "url": "https://api.example.com/oauth/access_token", "method": "GET" },
				"destination": "query"
			}"#,
		)
		.expect("Configuration fixture should deserialize.");
		let request = config
			.endpoint(FlowKind::RequestToken)
			.expect("Request token endpoint should be configured.");
		let access = config
			.endpoint(FlowKind::AccessToken)
			.expect("Access token endpoint should be configured.");

		assert_eq!(request.method, Method::Post);
		assert_eq!(access.method, Method::Get);
		assert_eq!(config.callback, OUT_OF_BAND_CALLBACK);
		assert_eq!(config.destination, ParamDestination::Query);
		assert_eq!(config.error_threshold, DEFAULT_ERROR_THRESHOLD);
		assert!(config.refresh_token.is_none());
	}
}
