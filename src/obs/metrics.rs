// self
use crate::obs::{FlowKind, FlowOutcome};

/// What the retrying executor did with a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetryOutcome {
	/// The policy accepted the failure and the request is sent again.
	Retried,
	/// A failed response was released before the next attempt.
	Disposed,
	/// The policy declined; the last failure goes back to the caller.
	Exhausted,
}
impl RetryOutcome {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RetryOutcome::Retried => "retried",
			RetryOutcome::Disposed => "disposed",
			RetryOutcome::Exhausted => "exhausted",
		}
	}
}

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth1_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records an executor retry decision as `oauth1_broker_retry_total{outcome}` (when enabled).
pub fn record_retry_outcome(outcome: RetryOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth1_broker_retry_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_noop_without_metrics() {
		record_flow_outcome(FlowKind::RequestToken, FlowOutcome::Failure);
	}

	#[test]
	fn retry_outcomes_have_stable_labels() {
		assert_eq!(RetryOutcome::Retried.as_str(), "retried");
		assert_eq!(RetryOutcome::Disposed.as_str(), "disposed");
		assert_eq!(RetryOutcome::Exhausted.as_str(), "exhausted");

		record_retry_outcome(RetryOutcome::Exhausted);
	}
}
