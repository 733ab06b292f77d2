//! Three-legged token exchange: temporary credentials, token credentials, and refresh.
//!
//! [`TokenExchange`] owns the consumer credentials, configuration, transport, and variant
//! provider. Every call signs a fresh parameter set, dispatches it to the configured endpoint,
//! and parses the form-encoded answer into a [`Token`]. Missing endpoints are reported before
//! any I/O happens.

// self
use crate::{
	_prelude::*,
	auth::{OAUTH_SESSION_HANDLE, OAUTH_TOKEN, Pair, Token},
	config::{OAuthConfig, ParamDestination},
	error::{ConfigError, ProtocolError, TransportError},
	http::{HttpRequest, HttpTransport, Method},
	oauth::{
		self, AuthorizationParams, OAUTH_CALLBACK, OAUTH_SIGNATURE, OAUTH_VERIFIER,
		SignatureEngine, SystemVariantProvider, VariantProvider, authorization,
	},
	obs::{self, FlowKind},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Performs the request-token, access-token, and refresh-token calls for one consumer.
///
/// The exchange is immutable and `Send + Sync`; share it behind an [`Arc`] between
/// authorizations and threads.
pub struct TokenExchange {
	config: OAuthConfig,
	consumer: Token,
	transport: Arc<dyn HttpTransport>,
	variants: Arc<dyn VariantProvider>,
	engine: SignatureEngine,
}
impl TokenExchange {
	/// Creates an exchange that reaches the provider through `transport`.
	///
	/// `config` is validated first, so deserialized configurations get the same checks as
	/// built ones.
	pub fn new(
		config: OAuthConfig,
		consumer: Token,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self> {
		config.validate().map_err(ConfigError::from)?;

		Ok(Self {
			config,
			consumer,
			transport,
			variants: Arc::new(SystemVariantProvider),
			engine: SignatureEngine,
		})
	}

	/// Creates an exchange backed by a default blocking reqwest client.
	#[cfg(feature = "reqwest")]
	pub fn with_reqwest(config: OAuthConfig, consumer: Token) -> Result<Self> {
		Self::new(config, consumer, Arc::new(ReqwestHttpClient::default()))
	}

	/// Replaces the timestamp/nonce source.
	pub fn with_variant_provider(mut self, variants: Arc<dyn VariantProvider>) -> Self {
		self.variants = variants;

		self
	}

	/// Configuration used by every call.
	pub fn config(&self) -> &OAuthConfig {
		&self.config
	}

	/// Consumer credentials.
	pub fn consumer(&self) -> &Token {
		&self.consumer
	}

	/// Obtains temporary credentials, announcing the configured `oauth_callback`.
	pub fn request_token(&self) -> Result<Token> {
		let extras = vec![Pair::new(OAUTH_CALLBACK, self.config.callback.as_str())];

		self.exchange(FlowKind::RequestToken, None, extras)
	}

	/// Trades an authorized request token and its verifier for token credentials.
	pub fn access_token(&self, request_token: &Token, verifier: &str) -> Result<Token> {
		let extras = vec![Pair::new(OAUTH_VERIFIER, verifier)];

		self.exchange(FlowKind::AccessToken, Some(request_token), extras)
	}

	/// Refreshes `token`, sending its session handle unless `extras` already carries one.
	///
	/// A refreshed token that omits `oauth_session_handle` inherits the previous handle.
	pub fn refresh_access_token(&self, token: &Token, extras: &[Pair]) -> Result<Token> {
		let mut params = extras.to_vec();

		if let Some(handle) = token.session_handle()
			&& !params.iter().any(|pair| pair.name == OAUTH_SESSION_HANDLE)
		{
			params.push(Pair::new(OAUTH_SESSION_HANDLE, handle));
		}

		let refreshed = self.exchange(FlowKind::RefreshToken, Some(token), params)?;

		Ok(match token.session_handle() {
			Some(handle) if refreshed.session_handle().is_none() =>
				refreshed.with_attributes([(OAUTH_SESSION_HANDLE, handle)]),
			_ => refreshed,
		})
	}

	/// Builds the resource owner authorization URL for `request_token`.
	pub fn authorize_url(&self, request_token: &Token) -> Result<Url> {
		let mut url = self
			.config
			.authorization
			.clone()
			.ok_or(ConfigError::MissingEndpoint { operation: "authorization" })?;

		url.query_pairs_mut().append_pair(OAUTH_TOKEN, request_token.identifier());

		Ok(url)
	}

	/// Signs `method url` for `token` and returns the parameters to attach.
	///
	/// `params` are query or form parameters that travel with the request; they are signed
	/// alongside the URL's own query pairs but never copied into the result. `extras` are
	/// additional `oauth_*` parameters that do travel with the result.
	pub(crate) fn authorize_with(
		&self,
		token: Option<&Token>,
		method: Method,
		url: &Url,
		params: &[Pair],
		extras: Vec<Pair>,
	) -> Result<AuthorizationParams> {
		let mut oauth_params = oauth::protocol_params(
			self.consumer.identifier(),
			token.map(Token::identifier).unwrap_or_default(),
			self.variants.as_ref(),
			extras,
		);
		let mut signed = url.query_pairs().map(|(k, v)| Pair::new(k, v)).collect::<Vec<_>>();

		signed.extend_from_slice(params);
		signed.extend_from_slice(&oauth_params);

		let signature = self.engine.sign(&self.consumer, token, method, url, &signed)?;

		oauth_params.push(Pair::new(OAUTH_SIGNATURE, signature));

		Ok(match self.config.destination {
			ParamDestination::Header =>
				AuthorizationParams::Header(authorization::format_header(&oauth_params)?),
			ParamDestination::Query => AuthorizationParams::Query(oauth_params),
		})
	}

	fn exchange(&self, kind: FlowKind, token: Option<&Token>, extras: Vec<Pair>) -> Result<Token> {
		obs::observe(kind, "exchange", || -> Result<Token> {
			let endpoint = self.config.endpoint(kind)?;
			let mut request = HttpRequest::new(endpoint.method, endpoint.url.clone());

			self.authorize_with(token, request.method, &request.url, &[], extras)?
				.apply(&mut request);

			let response = self.transport.execute(&request).map_err(TransportError::from)?;
			let status = response.status();
			let success = response.is_success();
			let body = response.text().map_err(TransportError::from)?;

			if !success {
				return Err(ProtocolError::unexpected_status(kind.as_str(), status, &body).into());
			}

			Ok(Token::from_form_body(&body)?)
		})
	}
}
impl Debug for TokenExchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchange")
			.field("config", &self.config)
			.field("consumer", &self.consumer)
			.finish()
	}
}
