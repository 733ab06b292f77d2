//! Per-request variant values: timestamps and nonces.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::_prelude::*;

const NONCE_LEN: usize = 32;

/// Supplies the values that make every signed request unique.
pub trait VariantProvider
where
	Self: Send + Sync,
{
	/// Seconds since the Unix epoch, rendered in decimal.
	fn timestamp(&self) -> String;

	/// Value that is unique per request for a given timestamp.
	fn nonce(&self) -> String;
}

/// Wall clock timestamps and random alphanumeric nonces.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemVariantProvider;
impl VariantProvider for SystemVariantProvider {
	fn timestamp(&self) -> String {
		OffsetDateTime::now_utc().unix_timestamp().to_string()
	}

	fn nonce(&self) -> String {
		rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
	}
}

/// Returns the same timestamp and nonce every time.
///
/// Useful for reproducing a signature captured from another client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedVariantProvider {
	/// Timestamp returned by [`VariantProvider::timestamp`].
	pub timestamp: String,
	/// Nonce returned by [`VariantProvider::nonce`].
	pub nonce: String,
}
impl FixedVariantProvider {
	/// Creates a provider pinned to the given values.
	pub fn new(timestamp: impl Into<String>, nonce: impl Into<String>) -> Self {
		Self { timestamp: timestamp.into(), nonce: nonce.into() }
	}
}
impl VariantProvider for FixedVariantProvider {
	fn timestamp(&self) -> String {
		self.timestamp.clone()
	}

	fn nonce(&self) -> String {
		self.nonce.clone()
	}
}
