//! OAuth 1.0a protocol: percent-encoding, signatures, token exchanges, and authorizations.

pub mod authorization;
pub mod encode;
pub mod exchange;
pub mod signature;
pub mod variant;

pub use authorization::*;
pub use exchange::*;
pub use signature::*;
pub use variant::*;

// self
use crate::{auth::Pair, oauth::signature::HMAC_SHA1};

/// `oauth_consumer_key` protocol parameter.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
/// `oauth_nonce` protocol parameter.
pub const OAUTH_NONCE: &str = "oauth_nonce";
/// `oauth_signature` protocol parameter.
pub const OAUTH_SIGNATURE: &str = "oauth_signature";
/// `oauth_signature_method` protocol parameter.
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
/// `oauth_timestamp` protocol parameter.
pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
/// `oauth_version` protocol parameter.
pub const OAUTH_VERSION: &str = "oauth_version";
/// `oauth_callback` protocol parameter.
pub const OAUTH_CALLBACK: &str = "oauth_callback";
/// `oauth_verifier` protocol parameter.
pub const OAUTH_VERIFIER: &str = "oauth_verifier";
/// Protocol version sent in `oauth_version`.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Builds the `oauth_*` parameters every signed request carries.
///
/// `oauth_token` is omitted when `token` is empty (temporary credential requests).
pub(crate) fn protocol_params(
	consumer_key: &str,
	token: &str,
	variants: &dyn VariantProvider,
	extras: impl IntoIterator<Item = Pair>,
) -> Vec<Pair> {
	let mut params = Vec::with_capacity(8);

	if !token.is_empty() {
		params.push(Pair::new(crate::auth::OAUTH_TOKEN, token));
	}

	params.push(Pair::new(OAUTH_CONSUMER_KEY, consumer_key));
	params.push(Pair::new(OAUTH_SIGNATURE_METHOD, HMAC_SHA1));
	params.push(Pair::new(OAUTH_TIMESTAMP, variants.timestamp()));
	params.push(Pair::new(OAUTH_NONCE, variants.nonce()));
	params.push(Pair::new(OAUTH_VERSION, PROTOCOL_VERSION));
	params.extend(extras);

	params
}
