//! Retrying HTTP executor with pluggable, per-route retry policies.
//!
//! [`RetryingExecutor`] wraps any [`HttpTransport`]. Each delegate call either succeeds, or
//! yields a [`Failure`]: a transport error, or a response whose status reaches the error
//! threshold. The active [`RetryHandler`] then decides whether to try again. Accepted failures
//! are disposed before the next attempt, so at most one failed response is alive at a time.
//! When the handler declines, the last failed response is handed back as `Ok`, including one
//! attached to a transport error; only failures without any response surface as `Err`.
//!
//! Fatal [`RequestError`]s (requests that could not be prepared, such as signing failures)
//! are returned immediately without consulting the handler.

mod metrics;
pub mod policy;

pub use metrics::RetryMetrics;
pub use policy::*;

// self
use crate::{
	_prelude::*,
	config::{DEFAULT_ERROR_THRESHOLD, OAuthConfig},
	error::ConfigError,
	http::{HttpRequest, HttpResponse, HttpTransport, Method, RequestError},
	obs::{self, FlowKind},
};

/// Outcome of one failed attempt.
#[derive(Debug)]
pub enum Failure {
	/// The transport could not produce a usable response.
	Transport(RequestError),
	/// The upstream answered with a status at or above the error threshold.
	Status(HttpResponse),
}
impl Failure {
	/// Status code of the failed response, if there is one.
	pub fn status(&self) -> Option<u16> {
		self.response().map(HttpResponse::status)
	}

	/// Failed response, including one attached to a transport error.
	pub fn response(&self) -> Option<&HttpResponse> {
		match self {
			Self::Transport(err) => err.response(),
			Self::Status(response) => Some(response),
		}
	}

	/// Transport error, if the attempt produced no regular response.
	pub fn error(&self) -> Option<&RequestError> {
		match self {
			Self::Transport(err) => Some(err),
			Self::Status(_) => None,
		}
	}

	fn has_response(&self) -> bool {
		self.response().is_some()
	}

	/// Hands back the last response when there is one, the error otherwise.
	fn into_outcome(self) -> Result<HttpResponse, RequestError> {
		match self {
			Self::Transport(mut err) => err.take_response().ok_or(err),
			Self::Status(response) => Ok(response),
		}
	}
}

/// Decides whether a failed attempt should be retried.
///
/// `attempt` is the number of the attempt that would follow, so the first call for a request
/// receives `2`. Handlers may block (for example, to back off) before returning `true`.
pub trait RetryHandler
where
	Self: Send + Sync,
{
	/// Returns `true` to dispose of `failure` and try again.
	fn retry(&self, failure: &Failure, attempt: u32) -> bool;
}
impl<F> RetryHandler for F
where
	F: Send + Sync + Fn(&Failure, u32) -> bool,
{
	fn retry(&self, failure: &Failure, attempt: u32) -> bool {
		self(failure, attempt)
	}
}

#[derive(Clone)]
struct Route {
	method: Option<Method>,
	path_prefix: String,
	handler: Arc<dyn RetryHandler>,
}
impl Route {
	fn matches(&self, request: &HttpRequest) -> bool {
		self.method.is_none_or(|method| method == request.method)
			&& request.url.path().starts_with(&self.path_prefix)
	}

	/// Longer prefixes win; a method-specific route beats a wildcard one on ties.
	fn specificity(&self) -> (usize, bool) {
		(self.path_prefix.len(), self.method.is_some())
	}
}

/// Transport decorator that retries failed attempts according to a [`RetryHandler`].
pub struct RetryingExecutor<T> {
	inner: T,
	default_handler: Arc<dyn RetryHandler>,
	routes: Vec<Route>,
	error_threshold: u16,
	metrics: Arc<RetryMetrics>,
}
impl<T> RetryingExecutor<T>
where
	T: HttpTransport,
{
	/// Wraps `inner` with [`NoRetry`] and the default error threshold (`400`).
	pub fn new(inner: T) -> Self {
		Self {
			inner,
			default_handler: Arc::new(NoRetry),
			routes: Vec::new(),
			error_threshold: DEFAULT_ERROR_THRESHOLD,
			metrics: Default::default(),
		}
	}

	/// Wraps `inner`, taking the error threshold from `config` after validating it.
	pub fn from_config(inner: T, config: &OAuthConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self::new(inner).with_error_threshold(config.error_threshold))
	}

	/// Replaces the handler used when no route matches.
	pub fn with_retry_handler(mut self, handler: impl 'static + RetryHandler) -> Self {
		self.default_handler = Arc::new(handler);

		self
	}

	/// Sets the lowest status code treated as a failure.
	pub fn with_error_threshold(mut self, status: u16) -> Self {
		self.error_threshold = status;

		self
	}

	/// Uses `handler` for requests whose path starts with `path_prefix` and whose method
	/// matches `method` (`None` matches every method).
	pub fn with_route(
		mut self,
		method: Option<Method>,
		path_prefix: impl Into<String>,
		handler: impl 'static + RetryHandler,
	) -> Self {
		self.routes.push(Route {
			method,
			path_prefix: path_prefix.into(),
			handler: Arc::new(handler),
		});

		self
	}

	/// Shared attempt/retry counters.
	pub fn metrics(&self) -> Arc<RetryMetrics> {
		self.metrics.clone()
	}

	/// Lowest status code treated as a failure.
	pub fn error_threshold(&self) -> u16 {
		self.error_threshold
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &T {
		&self.inner
	}

	fn handler_for(&self, request: &HttpRequest) -> &dyn RetryHandler {
		self.routes
			.iter()
			.filter(|route| route.matches(request))
			.max_by_key(|route| route.specificity())
			.map_or(self.default_handler.as_ref(), |route| route.handler.as_ref())
	}

	fn run(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
		let handler = self.handler_for(request);
		let mut attempt = 1;

		loop {
			self.metrics.record_attempt();

			let failure = match self.inner.execute(request) {
				Ok(response) if response.status() < self.error_threshold => return Ok(response),
				Ok(response) => Failure::Status(response),
				Err(err) if err.is_fatal() => return Err(err),
				Err(err) => Failure::Transport(err),
			};

			if !handler.retry(&failure, attempt + 1) {
				self.metrics.record_exhausted();
				obs::trace_retry_exhausted(attempt, failure.status());

				return failure.into_outcome();
			}

			attempt += 1;

			self.metrics.record_retry();
			obs::trace_retry(attempt, failure.status());

			if failure.has_response() {
				self.metrics.record_disposed();
			}

			drop(failure);
		}
	}
}
impl<T> HttpTransport for RetryingExecutor<T>
where
	T: HttpTransport,
{
	fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
		obs::observe(FlowKind::Execute, "execute", || self.run(request))
	}
}
impl<T> Debug for RetryingExecutor<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryingExecutor")
			.field("inner", &self.inner)
			.field("routes", &self.routes.len())
			.field("error_threshold", &self.error_threshold)
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		collections::VecDeque,
		io::{self, Cursor, Read},
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use super::*;

	/// Response body that counts how many bodies were released.
	struct TrackedBody {
		inner: Cursor<Vec<u8>>,
		released: Arc<AtomicUsize>,
	}
	impl Read for TrackedBody {
		fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
			self.inner.read(buf)
		}
	}
	impl Drop for TrackedBody {
		fn drop(&mut self) {
			self.released.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[derive(Debug)]
	enum Step {
		Respond(u16),
		Fail,
		FailWithResponse(u16),
		FailFatal,
	}

	#[derive(Debug)]
	struct ScriptedTransport {
		steps: Mutex<VecDeque<Step>>,
		calls: AtomicUsize,
		released: Arc<AtomicUsize>,
	}
	impl ScriptedTransport {
		fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
			Arc::new(Self {
				steps: Mutex::new(steps.into_iter().collect()),
				calls: AtomicUsize::new(0),
				released: Arc::new(AtomicUsize::new(0)),
			})
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		fn released(&self) -> usize {
			self.released.load(Ordering::SeqCst)
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, _: &HttpRequest) -> Result<HttpResponse, RequestError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			match self.steps.lock().pop_front() {
				Some(Step::Respond(status)) => {
					let body = TrackedBody {
						inner: Cursor::new(format!("attempt {n}").into_bytes()),
						released: self.released.clone(),
					};

					Ok(HttpResponse::new(status, Vec::new(), body))
				},
				Some(Step::Fail) => Err(RequestError::new("connection reset")),
				Some(Step::FailWithResponse(status)) => Err(RequestError::new("upstream failed")
					.with_response(HttpResponse::from_bytes(status, format!("attempt {n}")))),
				Some(Step::FailFatal) =>
					Err(RequestError::fatal(io::Error::other("request could not be signed"))),
				None => Err(RequestError::new("script exhausted")),
			}
		}
	}

	fn request(method: Method, path: &str) -> HttpRequest {
		let url = Url::parse("https://api.example.com")
			.and_then(|base| base.join(path))
			.expect("Request URL fixture should parse.");

		HttpRequest::new(method, url)
	}

	#[test]
	fn n_retries_make_n_plus_one_calls_and_dispose_n_responses() {
		let transport = ScriptedTransport::new([
			Step::Respond(503),
			Step::Respond(503),
			Step::Respond(502),
			Step::Respond(200),
		]);
		let executor =
			RetryingExecutor::new(transport.clone()).with_retry_handler(MaxAttempts::new(5));
		let response = executor
			.execute(&request(Method::Get, "/items"))
			.expect("Fourth attempt should succeed.");

		assert_eq!(response.status(), 200);
		assert_eq!(transport.calls(), 4);
		assert_eq!(transport.released(), 3);
		assert_eq!(response.text().expect("Body should be readable."), "attempt 4");
		assert_eq!(transport.released(), 4);

		let metrics = executor.metrics();

		assert_eq!(metrics.attempts(), 4);
		assert_eq!(metrics.retries(), 3);
		assert_eq!(metrics.disposed(), 3);
		assert_eq!(metrics.exhausted(), 0);
	}

	#[test]
	fn exhausted_policy_returns_last_error_response() {
		let transport =
			ScriptedTransport::new([Step::Respond(500), Step::Respond(502), Step::Respond(503)]);
		let executor =
			RetryingExecutor::new(transport.clone()).with_retry_handler(MaxAttempts::new(3));
		let response = executor
			.execute(&request(Method::Get, "/items"))
			.expect("Error statuses are returned as responses.");

		assert_eq!(response.status(), 503);
		assert_eq!(transport.calls(), 3);
		assert_eq!(transport.released(), 2);
		assert_eq!(executor.metrics().exhausted(), 1);
	}

	#[test]
	fn attempt_numbers_start_at_two() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let recorder = seen.clone();
		let transport = ScriptedTransport::new([Step::Fail, Step::Fail, Step::Respond(204)]);
		let executor = RetryingExecutor::new(transport.clone()).with_retry_handler(
			move |failure: &Failure, attempt: u32| {
				recorder.lock().push((attempt, failure.status()));

				true
			},
		);
		let response = executor
			.execute(&request(Method::Post, "/items"))
			.expect("Third attempt should succeed.");

		assert_eq!(response.status(), 204);
		assert_eq!(*seen.lock(), vec![(2, None), (3, None)]);
		assert_eq!(executor.metrics().disposed(), 0);
	}

	#[test]
	fn transport_error_is_returned_when_policy_declines() {
		let transport = ScriptedTransport::new([Step::Fail]);
		let executor = RetryingExecutor::new(transport.clone());
		let err = executor
			.execute(&request(Method::Get, "/items"))
			.expect_err("NoRetry should surface the transport error.");

		assert_eq!(err.to_string(), "connection reset");
		assert_eq!(transport.calls(), 1);
	}

	#[test]
	fn response_attached_to_a_transport_error_is_returned() {
		let transport = ScriptedTransport::new([Step::FailWithResponse(502)]);
		let executor = RetryingExecutor::new(transport.clone());
		let response = executor
			.execute(&request(Method::Get, "/items"))
			.expect("The attached response should be handed back.");

		assert_eq!(response.status(), 502);
		assert_eq!(response.text().expect("Body should be readable."), "attempt 1");
		assert_eq!(executor.metrics().exhausted(), 1);
	}

	#[test]
	fn fatal_errors_bypass_the_policy() {
		let transport = ScriptedTransport::new([Step::FailFatal, Step::Respond(200)]);
		let executor = RetryingExecutor::new(transport.clone())
			.with_retry_handler(|_: &Failure, _: u32| true);
		let err = executor
			.execute(&request(Method::Get, "/items"))
			.expect_err("Fatal errors should not be retried.");

		assert!(err.is_fatal());
		assert_eq!(transport.calls(), 1);
		assert_eq!(executor.metrics().retries(), 0);
	}

	#[test]
	fn statuses_below_threshold_are_successes() {
		let transport = ScriptedTransport::new([Step::Respond(404)]);
		let executor = RetryingExecutor::new(transport.clone())
			.with_retry_handler(MaxAttempts::new(3))
			.with_error_threshold(500);
		let response = executor
			.execute(&request(Method::Get, "/missing"))
			.expect("404 is below the threshold.");

		assert_eq!(response.status(), 404);
		assert_eq!(transport.calls(), 1);
	}

	#[test]
	fn most_specific_route_selects_the_handler() {
		let transport = ScriptedTransport::new([
			Step::Respond(503),
			Step::Respond(200),
			Step::Respond(503),
			Step::Respond(503),
		]);
		let executor = RetryingExecutor::new(transport.clone())
			.with_route(None, "/", NoRetry)
			.with_route(Some(Method::Get), "/items", MaxAttempts::new(2));
		let retried = executor
			.execute(&request(Method::Get, "/items/7"))
			.expect("Routed GET should be retried once.");

		assert_eq!(retried.status(), 200);
		assert_eq!(transport.calls(), 2);

		let not_retried = executor
			.execute(&request(Method::Delete, "/items/7"))
			.expect("DELETE falls back to the wildcard route.");

		assert_eq!(not_retried.status(), 503);
		assert_eq!(transport.calls(), 3);
	}

	#[test]
	fn from_config_validates_the_threshold() {
		let config = OAuthConfig { error_threshold: 0, ..Default::default() };
		let err = RetryingExecutor::from_config(ScriptedTransport::new(Vec::new()), &config)
			.expect_err("A zero error threshold should be rejected.");

		assert!(matches!(err, ConfigError::Invalid(_)));

		let config = OAuthConfig { error_threshold: 500, ..Default::default() };
		let executor = RetryingExecutor::from_config(ScriptedTransport::new(Vec::new()), &config)
			.expect("A 5xx threshold should be accepted.");

		assert_eq!(executor.error_threshold(), 500);
	}

	#[test]
	fn failures_expose_status_and_errors() {
		let status = Failure::Status(HttpResponse::from_bytes(429, ""));
		let bare = Failure::Transport(RequestError::new("timeout"));
		let with_response = Failure::Transport(
			RequestError::new("bad gateway").with_response(HttpResponse::from_bytes(502, "")),
		);

		assert_eq!(status.status(), Some(429));
		assert!(status.error().is_none());
		assert_eq!(bare.status(), None);
		assert!(bare.error().is_some());
		assert_eq!(with_response.status(), Some(502));
	}
}
