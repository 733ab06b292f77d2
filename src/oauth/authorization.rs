//! Signing outbound resource requests with a refreshable access token.
//!
//! [`Authorization`] holds the current access token behind an [`RwLock`] of [`Arc`]s: readers
//! clone a snapshot and sign with it, while [`Authorization::refresh`] swaps in a new token
//! wholesale. Refreshes are single-flight; callers that were waiting for an in-flight refresh
//! reuse its result instead of hitting the provider again.
//!
//! [`SigningTransport`] wraps any [`HttpTransport`] and signs every request right before it is
//! sent, so a retried request always carries a fresh nonce and the latest token.

// self
use crate::{
	_prelude::*,
	auth::{Pair, Token},
	error::SignatureError,
	http::{HttpRequest, HttpResponse, HttpTransport, Method, RequestError},
	oauth::TokenExchange,
	obs::{self, FlowKind},
};

/// Header carrying OAuth parameters in header mode.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Signed OAuth parameters, ready to be attached to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationParams {
	/// Complete `Authorization` header value.
	Header(String),
	/// `oauth_*` pairs, `oauth_signature` included, to merge into the query or form body.
	Query(Vec<Pair>),
}
impl AuthorizationParams {
	/// Returns the header value in header mode.
	pub fn header_value(&self) -> Option<&str> {
		match self {
			Self::Header(value) => Some(value.as_str()),
			Self::Query(_) => None,
		}
	}

	/// Returns the parameter pairs in query mode.
	pub fn query_params(&self) -> Option<&[Pair]> {
		match self {
			Self::Header(_) => None,
			Self::Query(pairs) => Some(pairs.as_slice()),
		}
	}

	/// Attaches the parameters to `request`.
	///
	/// Query-mode pairs join the form body when the method carries one and no raw body is
	/// set; otherwise they are appended to the URL query.
	pub fn apply(self, request: &mut HttpRequest) {
		match self {
			Self::Header(value) => request.set_header(AUTHORIZATION_HEADER, value),
			Self::Query(pairs) if request.method.allows_form_body() && request.body.is_none() =>
				request.form.extend(pairs),
			Self::Query(pairs) => {
				request
					.url
					.query_pairs_mut()
					.extend_pairs(pairs.iter().map(|pair| (&pair.name, &pair.value)));
			},
		}
	}
}

/// Renders `OAuth k1="v1",k2="v2"` from decoded pair values, in the given order.
pub fn format_header(params: &[Pair]) -> Result<String, SignatureError> {
	let mut header = String::from("OAuth ");

	for (idx, pair) in params.iter().enumerate() {
		let pair = pair.to_decoded()?;

		if idx > 0 {
			header.push(',');
		}

		header.push_str(&pair.name);
		header.push_str("=\"");
		header.push_str(&pair.value);
		header.push('"');
	}

	Ok(header)
}

/// Access token bound to a [`TokenExchange`], used to sign resource requests.
pub struct Authorization {
	exchange: Arc<TokenExchange>,
	token: RwLock<Arc<Token>>,
	refresh_guard: Mutex<()>,
}
impl Authorization {
	/// Wraps `token`, usually the result of [`TokenExchange::access_token`].
	pub fn new(exchange: Arc<TokenExchange>, token: Token) -> Self {
		Self { exchange, token: RwLock::new(Arc::new(token)), refresh_guard: Mutex::new(()) }
	}

	/// Exchange used for refreshes and signing.
	pub fn exchange(&self) -> &Arc<TokenExchange> {
		&self.exchange
	}

	/// Snapshot of the current access token.
	pub fn current_token(&self) -> Arc<Token> {
		self.token.read().clone()
	}

	/// Swaps in a token obtained elsewhere (for example, restored from storage).
	pub fn replace_token(&self, token: Token) {
		*self.token.write() = Arc::new(token);
	}

	/// Signs `method url` plus `params` with the current token.
	///
	/// `params` are the query or form parameters the request will carry besides those already
	/// in `url`. The result only contains `oauth_*` parameters.
	pub fn authorize(
		&self,
		method: Method,
		url: &Url,
		params: &[Pair],
	) -> Result<AuthorizationParams> {
		self.authorize_as(&self.current_token(), method, url, params)
	}

	/// Signs `request` over its query and form parameters and attaches the result.
	pub fn sign_request(&self, request: HttpRequest) -> Result<HttpRequest> {
		self.sign_request_as(&self.current_token(), request)
	}

	/// Refreshes the access token and swaps it in atomically.
	///
	/// Concurrent callers are serialized; a caller that waited on a refresh started after its
	/// own call returns that refresh's token without contacting the provider.
	pub fn refresh(&self) -> Result<Arc<Token>> {
		let observed = self.current_token();

		self.refresh_unless(|current| !Arc::ptr_eq(&observed, current))
	}

	/// Refreshes the access token only while `stale` is still the current identifier.
	///
	/// `stale` names the token a rejected request was signed with. Once another caller has
	/// swapped in a different token, that token is returned and the provider is not contacted.
	pub fn refresh_if_current(&self, stale: &str) -> Result<Arc<Token>> {
		self.refresh_unless(|current| current.identifier() != stale)
	}

	fn authorize_as(
		&self,
		token: &Token,
		method: Method,
		url: &Url,
		params: &[Pair],
	) -> Result<AuthorizationParams> {
		obs::observe(FlowKind::Authorize, "authorize", || {
			self.exchange.authorize_with(Some(token), method, url, params, Vec::new())
		})
	}

	fn sign_request_as(&self, token: &Token, mut request: HttpRequest) -> Result<HttpRequest> {
		self.authorize_as(token, request.method, &request.url, &request.form)?.apply(&mut request);

		Ok(request)
	}

	fn refresh_unless(&self, superseded: impl FnOnce(&Arc<Token>) -> bool) -> Result<Arc<Token>> {
		let _guard = self.refresh_guard.lock();
		let current = self.current_token();

		if superseded(&current) {
			return Ok(current);
		}

		let refreshed = Arc::new(self.exchange.refresh_access_token(&current, &[])?);

		*self.token.write() = refreshed.clone();

		obs::trace_token_swapped(refreshed.identifier());

		Ok(refreshed)
	}
}
impl Debug for Authorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authorization")
			.field("exchange", &self.exchange)
			.field("token", &self.current_token())
			.finish()
	}
}

/// Transport decorator that signs each request right before dispatch.
///
/// Responses, including those attached to errors, carry the identifier of the signing token
/// (see [`HttpResponse::signing_token`]). Signing failures surface as fatal [`RequestError`]s
/// so retry policies never loop on them.
#[derive(Debug)]
pub struct SigningTransport<T> {
	inner: T,
	authorization: Arc<Authorization>,
}
impl<T> SigningTransport<T>
where
	T: HttpTransport,
{
	/// Wraps `inner`, signing with `authorization`.
	pub fn new(inner: T, authorization: Arc<Authorization>) -> Self {
		Self { inner, authorization }
	}

	/// Authorization used for signing.
	pub fn authorization(&self) -> &Arc<Authorization> {
		&self.authorization
	}
}
impl<T> HttpTransport for SigningTransport<T>
where
	T: HttpTransport,
{
	fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
		let token = self.authorization.current_token();
		let signed = self
			.authorization
			.sign_request_as(&token, request.clone())
			.map_err(RequestError::fatal)?;

		match self.inner.execute(&signed) {
			Ok(response) => Ok(response.with_signing_token(token.identifier())),
			Err(mut err) => match err.take_response() {
				Some(response) =>
					Err(err.with_response(response.with_signing_token(token.identifier()))),
				None => Err(err),
			},
		}
	}
}
