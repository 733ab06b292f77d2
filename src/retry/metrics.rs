// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{self, RetryOutcome};

/// Thread-safe counters for executor attempts, retries, and disposals.
///
/// Retry, disposal, and exhaustion counts are mirrored to `oauth1_broker_retry_total` when the
/// `metrics` feature is enabled.
#[derive(Debug, Default)]
pub struct RetryMetrics {
	attempts: AtomicU64,
	retries: AtomicU64,
	disposed: AtomicU64,
	exhausted: AtomicU64,
}
impl RetryMetrics {
	/// Returns the number of delegate calls.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of failures the retry policy accepted for another attempt.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	/// Returns the number of intermediate failure responses released before retrying.
	pub fn disposed(&self) -> u64 {
		self.disposed.load(Ordering::Relaxed)
	}

	/// Returns the number of requests whose last failure was handed back to the caller.
	pub fn exhausted(&self) -> u64 {
		self.exhausted.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);

		obs::record_retry_outcome(RetryOutcome::Retried);
	}

	pub(crate) fn record_disposed(&self) {
		self.disposed.fetch_add(1, Ordering::Relaxed);

		obs::record_retry_outcome(RetryOutcome::Disposed);
	}

	pub(crate) fn record_exhausted(&self) {
		self.exhausted.fetch_add(1, Ordering::Relaxed);

		obs::record_retry_outcome(RetryOutcome::Exhausted);
	}
}
