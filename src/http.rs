//! Transport primitives shared by signing, token exchanges, and the retrying executor.
//!
//! The module exposes crate-owned [`HttpRequest`] and [`HttpResponse`] types plus the
//! [`HttpTransport`] trait, so signing and retry logic never depend on a particular HTTP
//! stack. Responses keep their body as an unread stream; dropping (or
//! [`dispose`](HttpResponse::dispose)-ing) a response releases the underlying connection.

// std
use std::io::{Cursor, Read};
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::CONTENT_TYPE;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, auth::Pair, error::BoxError, oauth::encode};

/// HTTP methods understood by the signer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`; the default for token endpoints.
	#[default]
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
	/// `HEAD`.
	Head,
	/// `OPTIONS`.
	Options,
}
impl Method {
	/// Returns the upper-case method token used on the wire and in signature base strings.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
			Self::Head => "HEAD",
			Self::Options => "OPTIONS",
		}
	}

	/// Returns `true` when the method carries a form-encoded entity body.
	pub const fn allows_form_body(self) -> bool {
		matches!(self, Self::Post | Self::Put | Self::Patch)
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Method {
	type Err = UnknownMethod;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"GET" => Ok(Self::Get),
			"POST" => Ok(Self::Post),
			"PUT" => Ok(Self::Put),
			"PATCH" => Ok(Self::Patch),
			"DELETE" => Ok(Self::Delete),
			"HEAD" => Ok(Self::Head),
			"OPTIONS" => Ok(Self::Options),
			_ => Err(UnknownMethod(s.to_owned())),
		}
	}
}

/// Error returned when parsing an unsupported HTTP method.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unsupported HTTP method `{0}`.")]
pub struct UnknownMethod(pub String);

/// Outbound request description.
///
/// Form parameters are kept as [`Pair`]s rather than a serialized body so signers can fold
/// them into the signature base string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
	/// Request method.
	pub method: Method,
	/// Absolute request URL, including any query string.
	pub url: Url,
	/// Header list in insertion order.
	pub headers: Vec<(String, String)>,
	/// `application/x-www-form-urlencoded` body parameters.
	pub form: Vec<Pair>,
	/// Raw body, used only when `form` is empty.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), form: Vec::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::Get, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::Post, url)
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Appends a query parameter to the URL.
	pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
		self.url.query_pairs_mut().append_pair(name, value);

		self
	}

	/// Appends a form body parameter.
	pub fn with_form_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.form.push(Pair::new(name, value));

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Replaces every header named `name` with a single value.
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();

		self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
		self.headers.push((name, value.into()));
	}

	/// Decoded query parameters of the URL, in order.
	pub fn query_pairs(&self) -> Vec<Pair> {
		self.url.query_pairs().map(|(name, value)| Pair::new(name, value)).collect()
	}

	/// Serializes the form parameters with RFC 3986 percent-encoding.
	pub fn form_body(&self) -> String {
		encode::join_pairs(&self.form)
	}
}

/// Inbound response whose body is still an unread stream.
pub struct HttpResponse {
	status: u16,
	headers: Vec<(String, String)>,
	body: Mutex<Box<dyn Read + Send>>,
	signing_token: Option<String>,
}
impl HttpResponse {
	/// Wraps a streaming body.
	pub fn new(status: u16, headers: Vec<(String, String)>, body: impl 'static + Read + Send) -> Self {
		Self { status, headers, body: Mutex::new(Box::new(body)), signing_token: None }
	}

	/// Builds a response from an in-memory body.
	pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self::new(status, Vec::new(), Cursor::new(body.into()))
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Records the identifier of the access token the request was signed with.
	pub fn with_signing_token(mut self, identifier: impl Into<String>) -> Self {
		self.signing_token = Some(identifier.into());

		self
	}

	/// Identifier of the access token that signed the request, when a
	/// [`SigningTransport`](crate::oauth::SigningTransport) sent it.
	pub fn signing_token(&self) -> Option<&str> {
		self.signing_token.as_deref()
	}

	/// HTTP status code.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Response headers in wire order.
	pub fn headers(&self) -> &[(String, String)] {
		&self.headers
	}

	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Parses `Retry-After` as either delta-seconds or an HTTP date.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(self.header("retry-after")?)
	}

	/// Reads the whole body as UTF-8 text and releases the response.
	pub fn text(self) -> Result<String, std::io::Error> {
		let mut body = self.body.into_inner();
		let mut buf = String::new();

		body.read_to_string(&mut buf)?;

		Ok(buf)
	}

	/// Releases the response without reading the body.
	pub fn dispose(self) {
		drop(self);
	}
}
impl Debug for HttpResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.field("signing_token", &self.signing_token)
			.field("body", &"<stream>")
			.finish()
	}
}

/// Failure reported by an [`HttpTransport`].
///
/// A request error may carry the response that triggered it; such errors are inspectable and
/// must be disposed like any other response. Errors without a response are pure transport
/// failures. Fatal errors (for example, a request that could not be signed) bypass retry
/// policies.
pub struct RequestError {
	message: String,
	source: Option<BoxError>,
	response: Option<HttpResponse>,
	fatal: bool,
}
impl RequestError {
	/// Creates an error with only a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), source: None, response: None, fatal: false }
	}

	/// Wraps a network-level error from the underlying client.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self {
			message: format!("Network error: {src}."),
			source: Some(Box::new(src)),
			response: None,
			fatal: false,
		}
	}

	/// Wraps an error that no retry can fix.
	pub fn fatal(src: impl 'static + Send + Sync + StdError) -> Self {
		Self {
			message: format!("Request could not be prepared: {src}."),
			source: Some(Box::new(src)),
			response: None,
			fatal: true,
		}
	}

	/// Attaches the response associated with the failure.
	pub fn with_response(mut self, response: HttpResponse) -> Self {
		self.response = Some(response);

		self
	}

	/// Returns `true` when a response is attached.
	pub fn has_response(&self) -> bool {
		self.response.is_some()
	}

	/// Borrows the attached response.
	pub fn response(&self) -> Option<&HttpResponse> {
		self.response.as_ref()
	}

	/// Detaches the response, leaving the error response-less.
	pub fn take_response(&mut self) -> Option<HttpResponse> {
		self.response.take()
	}

	/// Returns `true` when retrying cannot help.
	pub fn is_fatal(&self) -> bool {
		self.fatal
	}
}
impl Debug for RequestError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestError")
			.field("message", &self.message)
			.field("source", &self.source)
			.field("response", &self.response)
			.field("fatal", &self.fatal)
			.finish()
	}
}
impl Display for RequestError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.message)
	}
}
impl StdError for RequestError {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source.as_ref().map(|src| src.as_ref() as &(dyn StdError + 'static))
	}
}

/// Blocking HTTP transport.
///
/// This is the crate's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one transport can back several exchanges, authorizations, and
/// executors at once.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request`, blocking the calling thread until headers arrive.
	fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
		self.as_ref().execute(request)
	}
}

/// Thin wrapper around the blocking [`reqwest::blocking::Client`].
///
/// Connect and read timeouts are passed straight through to reqwest; nothing in this crate
/// cancels an in-flight request.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub reqwest::blocking::Client);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing blocking client.
	pub fn with_client(client: reqwest::blocking::Client) -> Self {
		Self(client)
	}

	/// Builds a client with the provided connect and total request timeouts.
	pub fn with_timeouts(
		connect: Option<Duration>,
		read: Option<Duration>,
	) -> Result<Self, crate::error::ConfigError> {
		let client = reqwest::blocking::Client::builder()
			.connect_timeout(connect.map(Duration::unsigned_abs))
			.timeout(read.map(Duration::unsigned_abs))
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
			Method::Head => reqwest::Method::HEAD,
			Method::Options => reqwest::Method::OPTIONS,
		};
		let mut builder = self.0.request(method, request.url.clone());

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		if !request.form.is_empty() {
			builder = builder
				.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
				.body(request.form_body());
		} else if let Some(body) = &request.body {
			builder = builder.body(body.clone());
		}

		let response = builder.send().map_err(RequestError::network)?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned()))
			})
			.collect();

		Ok(HttpResponse::new(status, headers, response))
	}
}

fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
