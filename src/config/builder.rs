// self
use crate::{
	_prelude::*,
	config::{Endpoint, OAuthConfig, ParamDestination},
	http::Method,
};

/// Errors raised while validating a configuration.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum OAuthConfigError {
	/// Endpoints must be absolute `http`/`https` URLs with a host.
	#[error("The {endpoint} endpoint must be an absolute http(s) URL: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Signature base strings ignore fragments, so endpoints must not carry one.
	#[error("The {endpoint} endpoint must not contain a fragment: {url}.")]
	FragmentInEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The callback must be a URL or `oob`.
	#[error("Callback must not be empty.")]
	EmptyCallback,
	/// Thresholds outside the 4xx/5xx range would treat successes as failures.
	#[error("Error threshold {status} must be between 400 and 599.")]
	InvalidErrorThreshold {
		/// Rejected status code.
		status: u16,
	},
}

/// Builder for [`OAuthConfig`] values.
///
/// Endpoint methods may be set before or after their endpoint; they are applied in
/// [`build`](Self::build), and a method without an endpoint is dropped.
#[derive(Debug, Default)]
pub struct OAuthConfigBuilder {
	config: OAuthConfig,
	request_token_method: Option<Method>,
	access_token_method: Option<Method>,
	refresh_token_method: Option<Method>,
}
impl OAuthConfigBuilder {
	/// Creates a builder with every endpoint unset, callback `oob`, and header placement.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the request token endpoint (`POST`).
	pub fn request_token_endpoint(mut self, url: Url) -> Self {
		self.config.request_token = Some(Endpoint::new(url));

		self
	}

	/// Sets the access token endpoint (`POST`).
	pub fn access_token_endpoint(mut self, url: Url) -> Self {
		self.config.access_token = Some(Endpoint::new(url));

		self
	}

	/// Sets the refresh token endpoint (`POST`).
	pub fn refresh_token_endpoint(mut self, url: Url) -> Self {
		self.config.refresh_token = Some(Endpoint::new(url));

		self
	}

	/// Overrides the method of the request token endpoint.
	pub fn request_token_method(mut self, method: Method) -> Self {
		self.request_token_method = Some(method);

		self
	}

	/// Overrides the method of the access token endpoint.
	pub fn access_token_method(mut self, method: Method) -> Self {
		self.access_token_method = Some(method);

		self
	}

	/// Overrides the method of the refresh token endpoint.
	pub fn refresh_token_method(mut self, method: Method) -> Self {
		self.refresh_token_method = Some(method);

		self
	}

	/// Sets the resource owner authorization page.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.config.authorization = Some(url);

		self
	}

	/// Overrides the `oauth_callback` value.
	pub fn callback(mut self, callback: impl Into<String>) -> Self {
		self.config.callback = callback.into();

		self
	}

	/// Overrides where OAuth parameters are placed.
	pub fn destination(mut self, destination: ParamDestination) -> Self {
		self.config.destination = destination;

		self
	}

	/// Overrides the lowest status code treated as a failure by retrying executors.
	pub fn error_threshold(mut self, status: u16) -> Self {
		self.config.error_threshold = status;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<OAuthConfig, OAuthConfigError> {
		let mut config = self.config;

		for (endpoint, method) in [
			(&mut config.request_token, self.request_token_method),
			(&mut config.access_token, self.access_token_method),
			(&mut config.refresh_token, self.refresh_token_method),
		] {
			if let (Some(endpoint), Some(method)) = (endpoint.as_mut(), method) {
				endpoint.method = method;
			}
		}

		config.validate()?;

		Ok(config)
	}
}

impl OAuthConfig {
	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), OAuthConfigError> {
		let endpoints = [
			("request_token", self.request_token.as_ref().map(|e| &e.url)),
			("access_token", self.access_token.as_ref().map(|e| &e.url)),
			("refresh_token", self.refresh_token.as_ref().map(|e| &e.url)),
			("authorization", self.authorization.as_ref()),
		];

		for (name, url) in endpoints {
			if let Some(url) = url {
				validate_endpoint(name, url)?;
			}
		}

		if self.callback.trim().is_empty() {
			return Err(OAuthConfigError::EmptyCallback);
		}
		if !(400..600).contains(&self.error_threshold) {
			return Err(OAuthConfigError::InvalidErrorThreshold { status: self.error_threshold });
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), OAuthConfigError> {
	if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
		return Err(OAuthConfigError::InvalidEndpoint { endpoint: name, url: url.to_string() });
	}
	if url.fragment().is_some() {
		return Err(OAuthConfigError::FragmentInEndpoint { endpoint: name, url: url.to_string() });
	}

	Ok(())
}
