//! Optional observability helpers for signing flows and the retrying executor.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `oauth1_broker.flow` with the `flow` (operation) and
//!   `stage` (call site) fields, plus debug events for retries and token refreshes.
//! - Enable `metrics` to increment the `oauth1_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and `oauth1_broker_retry_total`
//!   for every executor retry, disposal, and exhaustion, labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Temporary credential request (`oauth/request_token`).
	RequestToken,
	/// Request token to access token exchange.
	AccessToken,
	/// Access token refresh via session handle.
	RefreshToken,
	/// Signing an outbound resource request.
	Authorize,
	/// Executing a request through the retrying executor.
	Execute,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::RequestToken => "request_token",
			FlowKind::AccessToken => "access_token",
			FlowKind::RefreshToken => "refresh_token",
			FlowKind::Authorize => "authorize",
			FlowKind::Execute => "execute",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `op` inside a flow span and records attempt plus success/failure outcomes.
pub(crate) fn observe<T, E>(
	kind: FlowKind,
	stage: &'static str,
	op: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
	let _span = FlowSpan::new(kind, stage).entered();

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = op();

	match &result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}
