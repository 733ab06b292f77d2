// self
use crate::{_prelude::*, obs::FlowKind};

/// A span builder used by signing flows and the executor.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth1_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span until the returned guard drops.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Emits a debug event before the executor re-attempts a request.
pub fn trace_retry(attempt: u32, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(attempt, status, "retrying request");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, status);
	}
}

/// Emits a debug event when the executor gives up and hands back the last outcome.
pub fn trace_retry_exhausted(attempts: u32, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(attempts, status, "retry policy declined another attempt");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempts, status);
	}
}

/// Emits a debug event after an access token was swapped.
pub fn trace_token_swapped(identifier: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(token = identifier, "access token refreshed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = identifier;
	}
}

/// Emits a warning when a refresh triggered by a rejected request fails.
pub fn trace_refresh_failed(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "access token refresh failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
