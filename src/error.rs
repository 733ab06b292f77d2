//! Crate-level error types shared across signing, token exchanges, and transports.

// self
use crate::{_prelude::*, config::OAuthConfigError, http::RequestError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Each variant keeps the original failure as its source so callers can walk the cause chain
/// and decide whether to fix configuration, back off, or inspect the upstream response.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fix the code or the configuration.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Signing failed because the environment cannot produce an HMAC-SHA1 signature.
	#[error(transparent)]
	Signature(#[from] SignatureError),
	/// Transport failure (DNS, TCP, TLS, I/O).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered, but not with what the protocol expects.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
}
impl Error {
	/// Returns `true` when retrying the same operation may succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Config(_) | Self::Signature(_) => false,
			Self::Transport(TransportError::Request(err)) => !err.is_fatal(),
			Self::Transport(TransportError::Io(_)) => true,
			Self::Protocol(err) => err.status().is_some_and(|status| status >= 500 || status == 429),
		}
	}
}

/// Configuration and validation failures raised before any I/O happens.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration failed validation.
	#[error(transparent)]
	Invalid(#[from] OAuthConfigError),
	/// The operation needs an endpoint that was never configured.
	#[error("No endpoint is configured for the {operation} operation.")]
	MissingEndpoint {
		/// Operation label.
		operation: &'static str,
	},
	/// URL has no host component and cannot be signed.
	#[error("URL `{url}` has no host and cannot be used for OAuth signing.")]
	UnsupportedUrl {
		/// Offending URL.
		url: String,
	},
	/// URL could not be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures while producing an `oauth_signature`.
#[derive(Debug, ThisError)]
pub enum SignatureError {
	/// HMAC could not be keyed.
	#[error("HMAC-SHA1 key could not be initialized: {reason}.")]
	InvalidKey {
		/// Description reported by the MAC implementation.
		reason: String,
	},
	/// A parameter flagged as already encoded does not decode to UTF-8.
	#[error("Parameter value `{value}` is not valid percent-encoded UTF-8.")]
	InvalidEncoding {
		/// Raw value that failed to decode.
		value: String,
		/// Underlying decoding failure.
		#[source]
		source: std::str::Utf8Error,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP transport failed to execute the request.
	#[error("HTTP request failed.")]
	Request(#[from] RequestError),
	/// Reading the response body failed.
	#[error("I/O error occurred while reading the response body.")]
	Io(#[from] std::io::Error),
}

/// Protocol failures: the server answered, but not with a usable result.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// Endpoint answered with a non-success status code.
	#[error("The {operation} endpoint returned HTTP {status}: {body_preview}")]
	UnexpectedStatus {
		/// Operation label.
		operation: &'static str,
		/// HTTP status code.
		status: u16,
		/// Leading part of the response body.
		body_preview: String,
	},
	/// Token response body lacks a mandatory field.
	#[error("Token response is missing `{field}`.")]
	MalformedTokenResponse {
		/// Missing form field.
		field: &'static str,
	},
}
impl ProtocolError {
	const BODY_PREVIEW_LIMIT: usize = 256;

	pub(crate) fn unexpected_status(operation: &'static str, status: u16, body: &str) -> Self {
		Self::UnexpectedStatus { operation, status, body_preview: truncate_preview(body) }
	}

	/// HTTP status code attached to the failure, when there is one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::UnexpectedStatus { status, .. } => Some(*status),
			Self::MalformedTokenResponse { .. } => None,
		}
	}
}

fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= ProtocolError::BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(ProtocolError::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn config_errors_are_not_retryable() {
		let err = Error::from(ConfigError::MissingEndpoint { operation: "request_token" });

		assert!(!err.is_retryable());
		assert_eq!(err.to_string(), "No endpoint is configured for the request_token operation.");
	}

	#[test]
	fn protocol_errors_retry_only_on_server_side_statuses() {
		let throttled = Error::from(ProtocolError::unexpected_status("access_token", 429, ""));
		let rejected = Error::from(ProtocolError::unexpected_status("access_token", 401, ""));
		let malformed =
			Error::from(ProtocolError::MalformedTokenResponse { field: "oauth_token_secret" });

		assert!(throttled.is_retryable());
		assert!(!rejected.is_retryable());
		assert!(!malformed.is_retryable());
	}

	#[test]
	fn body_preview_is_truncated() {
		let body = "x".repeat(1_000);
		let err = ProtocolError::unexpected_status("refresh_token", 500, &body);

		match err {
			ProtocolError::UnexpectedStatus { body_preview, .. } => {
				assert_eq!(body_preview.chars().count(), ProtocolError::BODY_PREVIEW_LIMIT + 1);
				assert!(body_preview.ends_with('…'));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn transport_errors_keep_their_source() {
		let err = Error::from(TransportError::from(RequestError::new("connection reset")));
		let source = StdError::source(&err).expect("Transport error should expose its source.");

		assert_eq!(source.to_string(), "connection reset");
		assert!(err.is_retryable());
	}
}
