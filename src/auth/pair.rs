//! Wire-level name/value parameters.

// self
use crate::{_prelude::*, error::SignatureError, oauth::encode};

/// One query, form, or OAuth protocol parameter.
///
/// `encoded` records whether `name`/`value` are already RFC 3986 percent-encoded, so
/// parameters copied verbatim from a signed URL are not encoded twice.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pair {
	/// Parameter name.
	pub name: String,
	/// Parameter value.
	pub value: String,
	/// Whether `name` and `value` are already percent-encoded.
	#[serde(default)]
	pub encoded: bool,
}
impl Pair {
	/// Creates a plain (unencoded) parameter.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into(), encoded: false }
	}

	/// Creates a parameter whose name and value are already percent-encoded.
	pub fn pre_encoded(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into(), encoded: true }
	}

	/// Returns the percent-encoded form of this parameter.
	pub fn to_encoded(&self) -> Self {
		if self.encoded {
			return self.clone();
		}

		Self::pre_encoded(encode::percent_encode(&self.name), encode::percent_encode(&self.value))
	}

	/// Returns the decoded form of this parameter.
	pub fn to_decoded(&self) -> Result<Self, SignatureError> {
		if !self.encoded {
			return Ok(self.clone());
		}

		Ok(Self::new(encode::percent_decode(&self.name)?, encode::percent_decode(&self.value)?))
	}

	/// Renders `name=value` with both sides percent-encoded.
	pub fn to_wire(&self) -> String {
		let encoded = self.to_encoded();

		format!("{}={}", encoded.name, encoded.value)
	}
}

/// Returns a copy of `params` sorted by name, then value (ordinal, stable).
///
/// The input slice keeps its transmission order.
pub fn sort_params(params: &[Pair]) -> Vec<Pair> {
	let mut sorted = params.to_vec();

	sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));

	sorted
}
