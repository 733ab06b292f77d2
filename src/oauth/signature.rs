//! HMAC-SHA1 signatures over the RFC 5849 signature base string.
//!
//! Everything here is a pure function over local copies of its inputs, so a single
//! [`SignatureEngine`] can be shared freely between threads.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
// self
use crate::{
	_prelude::*,
	auth::{Pair, Token, sort_params},
	error::{ConfigError, SignatureError},
	http::Method,
	oauth::{OAUTH_SIGNATURE, encode},
};

type HmacSha1 = Hmac<Sha1>;

/// Value of `oauth_signature_method` for this engine.
pub const HMAC_SHA1: &str = "HMAC-SHA1";

/// Canonical inputs of one signature: method, base URL, and sorted encoded parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureInput {
	/// Upper-case HTTP method.
	pub method: Method,
	/// Scheme, authority, and path; no query, fragment, or default port.
	pub base_url: String,
	/// Percent-encoded parameters ordered by name, then value.
	pub sorted_params: Vec<Pair>,
}
impl SignatureInput {
	/// Normalizes `url` and `params` for signing. `oauth_signature` is never signed.
	pub fn new(method: Method, url: &Url, params: &[Pair]) -> Result<Self, ConfigError> {
		let encoded = params
			.iter()
			.map(Pair::to_encoded)
			.filter(|pair| pair.name != OAUTH_SIGNATURE)
			.collect::<Vec<_>>();

		Ok(Self { method, base_url: normalize_url(url)?, sorted_params: sort_params(&encoded) })
	}

	/// Renders `METHOD&enc(base_url)&enc(name=value&...)`.
	pub fn base_string(&self) -> String {
		let params = encode::join_pairs(&self.sorted_params);

		format!(
			"{}&{}&{}",
			self.method.as_str(),
			encode::percent_encode(&self.base_url),
			encode::percent_encode(&params)
		)
	}
}

/// Stateless HMAC-SHA1 signer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureEngine;
impl SignatureEngine {
	/// Signs a request and returns the base64 `oauth_signature` value.
	///
	/// `token` is `None` while requesting temporary credentials; the key then ends with a
	/// bare `&`.
	pub fn sign(
		&self,
		consumer: &Token,
		token: Option<&Token>,
		method: Method,
		url: &Url,
		params: &[Pair],
	) -> Result<String> {
		let base = SignatureInput::new(method, url, params)?.base_string();
		let key = signing_key(
			consumer.secret().expose(),
			token.map(|token| token.secret().expose()).unwrap_or_default(),
		);

		Ok(hmac_sha1_base64(&key, &base)?)
	}
}

/// Lower-cases scheme and host, drops default ports, query, and fragment.
pub fn normalize_url(url: &Url) -> Result<String, ConfigError> {
	let host = url.host_str().ok_or_else(|| ConfigError::UnsupportedUrl { url: url.to_string() })?;
	let mut normalized =
		format!("{}://{}", url.scheme().to_ascii_lowercase(), host.to_ascii_lowercase());

	// `Url::port` already hides the scheme's default port.
	if let Some(port) = url.port().filter(|&port| !is_default_port(url.scheme(), port)) {
		normalized.push(':');
		normalized.push_str(&port.to_string());
	}

	normalized.push_str(url.path());

	Ok(normalized)
}

/// Builds `enc(consumer_secret)&enc(token_secret)`.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
	format!("{}&{}", encode::percent_encode(consumer_secret), encode::percent_encode(token_secret))
}

/// Computes HMAC-SHA1 over `message` and encodes the digest with padded standard base64.
pub fn hmac_sha1_base64(key: &str, message: &str) -> Result<String, SignatureError> {
	let mut mac = HmacSha1::new_from_slice(key.as_bytes())
		.map_err(|e| SignatureError::InvalidKey { reason: e.to_string() })?;

	mac.update(message.as_bytes());

	Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn is_default_port(scheme: &str, port: u16) -> bool {
	matches!((scheme, port), ("http", 80) | ("https", 443))
}
