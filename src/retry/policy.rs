//! Built-in [`RetryHandler`] implementations.

// std
use std::thread;
// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	oauth::Authorization,
	obs,
	retry::{Failure, RetryHandler},
};

/// Status code that triggers an authorization refresh.
pub const UNAUTHORIZED: u16 = 401;

/// Returns `true` for failures that usually clear up on their own: transport errors,
/// `408`, `429`, and `5xx` responses.
pub fn is_transient(failure: &Failure) -> bool {
	match failure.status() {
		Some(status) => status >= 500 || status == 429 || status == 408,
		None => true,
	}
}

/// Never retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;
impl RetryHandler for NoRetry {
	fn retry(&self, _: &Failure, _: u32) -> bool {
		false
	}
}

/// Retries every failure until `max_attempts` delegate calls were made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxAttempts {
	/// Total number of attempts, the first one included.
	pub max_attempts: u32,
}
impl MaxAttempts {
	/// Allows up to `max_attempts` calls per request.
	pub fn new(max_attempts: u32) -> Self {
		Self { max_attempts }
	}
}
impl RetryHandler for MaxAttempts {
	fn retry(&self, _: &Failure, attempt: u32) -> bool {
		attempt <= self.max_attempts
	}
}

/// Retries transient failures, sleeping between attempts.
///
/// The delay grows as `initial_delay * multiplier^(attempt - 2)`, capped at `max_delay`, with
/// optional random jitter of up to the same amount again. A `Retry-After` header on the
/// failed response takes precedence when honored, capped at `max_retry_after`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExponentialBackoff {
	/// Total number of attempts, the first one included.
	pub max_attempts: u32,
	/// Delay before the first retry.
	pub initial_delay: Duration,
	/// Upper bound for computed delays.
	pub max_delay: Duration,
	/// Growth factor applied per retry.
	pub multiplier: f64,
	/// Whether to add random jitter.
	pub jitter: bool,
	/// Whether a `Retry-After` header overrides the computed delay.
	pub respect_retry_after: bool,
	/// Upper bound for `Retry-After` delays.
	pub max_retry_after: Duration,
}
impl ExponentialBackoff {
	/// Creates a policy allowing `max_attempts` calls with default timings.
	pub fn new(max_attempts: u32) -> Self {
		Self { max_attempts, ..Default::default() }
	}

	/// Sets the first delay.
	pub fn with_initial_delay(mut self, delay: Duration) -> Self {
		self.initial_delay = delay;

		self
	}

	/// Sets the delay cap.
	pub fn with_max_delay(mut self, delay: Duration) -> Self {
		self.max_delay = delay;

		self
	}

	/// Sets the growth factor.
	pub fn with_multiplier(mut self, multiplier: f64) -> Self {
		self.multiplier = multiplier;

		self
	}

	/// Enables or disables jitter.
	pub fn with_jitter(mut self, jitter: bool) -> Self {
		self.jitter = jitter;

		self
	}

	/// Enables or disables `Retry-After` handling.
	pub fn with_retry_after(mut self, respect: bool) -> Self {
		self.respect_retry_after = respect;

		self
	}

	/// Computed delay before `attempt` (`2` for the first retry), ignoring `Retry-After`.
	pub fn delay(&self, attempt: u32) -> Duration {
		let exponent = i32::try_from(attempt.saturating_sub(2)).unwrap_or(i32::MAX);
		let base = self.initial_delay.as_seconds_f64() * self.multiplier.powi(exponent);
		let base = Duration::seconds_f64(base.min(self.max_delay.as_seconds_f64()));

		if !self.jitter {
			return base;
		}

		let jitter = base * rand::rng().random::<f64>();

		(base + jitter).min(self.max_delay)
	}

	/// Delay before `attempt`, preferring the failed response's `Retry-After` header.
	pub fn delay_for(&self, failure: &Failure, attempt: u32) -> Duration {
		if self.respect_retry_after
			&& let Some(retry_after) = failure.response().and_then(|response| response.retry_after())
		{
			return retry_after.min(self.max_retry_after);
		}

		self.delay(attempt)
	}
}
impl Default for ExponentialBackoff {
	fn default() -> Self {
		Self {
			max_attempts: 4,
			initial_delay: Duration::milliseconds(200),
			max_delay: Duration::seconds(30),
			multiplier: 2.,
			jitter: true,
			respect_retry_after: true,
			max_retry_after: Duration::seconds(60),
		}
	}
}
impl RetryHandler for ExponentialBackoff {
	fn retry(&self, failure: &Failure, attempt: u32) -> bool {
		if attempt > self.max_attempts || !is_transient(failure) {
			return false;
		}

		let delay = self.delay_for(failure, attempt);

		if delay.is_positive() {
			thread::sleep(delay.unsigned_abs());
		}

		true
	}
}

/// Refreshes an [`Authorization`] when a request is rejected with `401` and retries it.
///
/// Pair it with a [`SigningTransport`](crate::oauth::SigningTransport) beneath the executor
/// so the retried request is signed with the refreshed token. When the rejected response names
/// the token that signed it, the refresh is skipped if that token was already replaced. Other
/// failures go to the optional fallback handler.
pub struct RefreshAuthorizationRetry {
	authorization: Arc<Authorization>,
	max_attempts: u32,
	fallback: Option<Arc<dyn RetryHandler>>,
}
impl RefreshAuthorizationRetry {
	/// Allows one refresh-and-retry per request.
	pub fn new(authorization: Arc<Authorization>) -> Self {
		Self { authorization, max_attempts: 2, fallback: None }
	}

	/// Sets the total number of attempts allowed for `401` responses.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Delegates every other failure to `handler`.
	pub fn with_fallback(mut self, handler: impl 'static + RetryHandler) -> Self {
		self.fallback = Some(Arc::new(handler));

		self
	}
}
impl RetryHandler for RefreshAuthorizationRetry {
	fn retry(&self, failure: &Failure, attempt: u32) -> bool {
		if failure.status() != Some(UNAUTHORIZED) {
			return self.fallback.as_ref().is_some_and(|handler| handler.retry(failure, attempt));
		}
		if attempt > self.max_attempts {
			return false;
		}

		let refreshed = match failure.response().and_then(|response| response.signing_token()) {
			Some(stale) => self.authorization.refresh_if_current(stale),
			None => self.authorization.refresh(),
		};

		match refreshed {
			Ok(_) => true,
			Err(e) => {
				obs::trace_refresh_failed(&e);

				false
			},
		}
	}
}
impl Debug for RefreshAuthorizationRetry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshAuthorizationRetry")
			.field("authorization", &self.authorization)
			.field("max_attempts", &self.max_attempts)
			.field("fallback_set", &self.fallback.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::Token,
		config::OAuthConfig,
		http::{HttpRequest, HttpResponse, HttpTransport, RequestError},
		oauth::TokenExchange,
	};

	fn status(code: u16) -> Failure {
		Failure::Status(HttpResponse::from_bytes(code, ""))
	}

	#[test]
	fn max_attempts_counts_the_first_call() {
		let policy = MaxAttempts::new(3);

		assert!(policy.retry(&status(500), 2));
		assert!(policy.retry(&status(404), 3));
		assert!(!policy.retry(&status(500), 4));
		assert!(!NoRetry.retry(&status(503), 2));
	}

	#[test]
	fn transient_failures_are_classified() {
		assert!(is_transient(&status(503)));
		assert!(is_transient(&status(429)));
		assert!(is_transient(&status(408)));
		assert!(is_transient(&Failure::Transport(RequestError::new("reset"))));
		assert!(!is_transient(&status(400)));
		assert!(!is_transient(&status(401)));
	}

	#[test]
	fn backoff_grows_and_caps_without_jitter() {
		let policy = ExponentialBackoff::new(10)
			.with_initial_delay(Duration::milliseconds(100))
			.with_max_delay(Duration::seconds(1))
			.with_jitter(false);

		assert_eq!(policy.delay(2), Duration::milliseconds(100));
		assert_eq!(policy.delay(3), Duration::milliseconds(200));
		assert_eq!(policy.delay(4), Duration::milliseconds(400));
		assert_eq!(policy.delay(8), Duration::seconds(1));
	}

	#[test]
	fn backoff_jitter_stays_within_bounds() {
		let policy = ExponentialBackoff::new(10)
			.with_initial_delay(Duration::milliseconds(100))
			.with_max_delay(Duration::seconds(1));

		for _ in 0..32 {
			let delay = policy.delay(3);

			assert!(delay >= Duration::milliseconds(200) && delay <= Duration::milliseconds(400));
		}
	}

	#[test]
	fn backoff_honors_retry_after_with_cap() {
		let policy = ExponentialBackoff::new(3).with_jitter(false);
		let failure =
			Failure::Status(HttpResponse::from_bytes(503, "").with_header("Retry-After", "7"));
		let greedy =
			Failure::Status(HttpResponse::from_bytes(503, "").with_header("Retry-After", "3600"));

		assert_eq!(policy.delay_for(&failure, 2), Duration::seconds(7));
		assert_eq!(policy.delay_for(&greedy, 2), Duration::seconds(60));
		assert_eq!(
			policy.clone().with_retry_after(false).delay_for(&failure, 2),
			Duration::milliseconds(200)
		);
	}

	#[test]
	fn backoff_retries_only_transient_failures_within_budget() {
		let policy = ExponentialBackoff::new(2)
			.with_initial_delay(Duration::milliseconds(1))
			.with_jitter(false);

		assert!(policy.retry(&status(503), 2));
		assert!(!policy.retry(&status(503), 3));
		assert!(!policy.retry(&status(400), 2));
	}

	struct RefreshEndpoint {
		calls: AtomicUsize,
	}
	impl HttpTransport for RefreshEndpoint {
		fn execute(&self, _: &HttpRequest) -> Result<HttpResponse, RequestError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			Ok(HttpResponse::from_bytes(200, format!("oauth_token=fresh{n}&oauth_token_secret=s")))
		}
	}

	fn authorization(transport: Arc<RefreshEndpoint>) -> Arc<Authorization> {
		let config = OAuthConfig::builder()
			.refresh_token_endpoint(
				Url::parse("https://api.example.com/oauth/refresh")
					.expect("Refresh endpoint fixture should parse."),
			)
			.build()
			.expect("Configuration fixture should build.");
		let exchange = TokenExchange::new(config, Token::new("consumer", "secret"), transport)
			.expect("Exchange fixture should validate.");

		Arc::new(Authorization::new(Arc::new(exchange), Token::new("stale", "s")))
	}

	#[test]
	fn unauthorized_triggers_refresh_within_budget() {
		let transport = Arc::new(RefreshEndpoint { calls: AtomicUsize::new(0) });
		let authorization = authorization(transport.clone());
		let policy = RefreshAuthorizationRetry::new(authorization.clone());

		assert!(policy.retry(&status(401), 2));
		assert_eq!(authorization.current_token().identifier(), "fresh1");
		assert!(!policy.retry(&status(401), 3));
		assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn late_unauthorized_reuses_the_token_refreshed_meanwhile() {
		let transport = Arc::new(RefreshEndpoint { calls: AtomicUsize::new(0) });
		let authorization = authorization(transport.clone());
		let first = RefreshAuthorizationRetry::new(authorization.clone());
		let second = RefreshAuthorizationRetry::new(authorization.clone());
		let rejected =
			|| Failure::Status(HttpResponse::from_bytes(401, "").with_signing_token("stale"));

		assert!(first.retry(&rejected(), 2));
		assert!(second.retry(&rejected(), 2));
		assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
		assert_eq!(authorization.current_token().identifier(), "fresh1");
	}

	#[test]
	fn other_failures_go_to_the_fallback() {
		let transport = Arc::new(RefreshEndpoint { calls: AtomicUsize::new(0) });
		let authorization = authorization(transport.clone());
		let bare = RefreshAuthorizationRetry::new(authorization.clone());
		let with_fallback =
			RefreshAuthorizationRetry::new(authorization).with_fallback(MaxAttempts::new(3));

		assert!(!bare.retry(&status(503), 2));
		assert!(with_fallback.retry(&status(503), 2));
		assert!(!with_fallback.retry(&status(503), 4));
		assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn failed_refresh_stops_retrying() {
		let config = OAuthConfig::default();
		let exchange = TokenExchange::new(
			config,
			Token::new("consumer", "secret"),
			Arc::new(RefreshEndpoint { calls: AtomicUsize::new(0) }),
		)
		.expect("Default configuration should validate.");
		let authorization = Arc::new(Authorization::new(Arc::new(exchange), Token::new("t", "s")));

		assert!(!RefreshAuthorizationRetry::new(authorization.clone()).retry(&status(401), 2));
		assert_eq!(authorization.current_token().identifier(), "t");
	}
}
