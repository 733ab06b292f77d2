//! RFC 3986 percent-encoding as required by RFC 5849 §3.6.

// std
use std::borrow::Cow;
// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
// self
use crate::{auth::Pair, error::SignatureError};

/// Everything except the unreserved set (`ALPHA / DIGIT / "-" / "." / "_" / "~"`).
const OAUTH_ENCODE_SET: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encodes `value` with upper-case hex digits.
pub fn percent_encode(value: &str) -> String {
	utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Decodes a percent-encoded UTF-8 string.
pub fn percent_decode(value: &str) -> Result<String, SignatureError> {
	percent_decode_str(value)
		.decode_utf8()
		.map(Cow::into_owned)
		.map_err(|source| SignatureError::InvalidEncoding { value: value.to_owned(), source })
}

/// Joins pairs as `name=value&...`, percent-encoding anything not already encoded.
pub fn join_pairs(pairs: &[Pair]) -> String {
	pairs.iter().map(Pair::to_wire).collect::<Vec<_>>().join("&")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unreserved_characters_pass_through() {
		assert_eq!(percent_encode("AZaz09-._~"), "AZaz09-._~");
	}

	#[test]
	fn reserved_and_non_ascii_characters_are_encoded() {
		assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
		assert_eq!(percent_encode("a=b&c/d?"), "a%3Db%26c%2Fd%3F");
		assert_eq!(percent_encode("☃"), "%E2%98%83");
		assert_eq!(percent_encode("*!'()"), "%2A%21%27%28%29");
	}

	#[test]
	fn decode_reverses_encode() {
		let raw = "Hello Ladies + Gentlemen, a signed OAuth request!";

		assert_eq!(percent_decode(&percent_encode(raw)).expect("Round trip should decode."), raw);
	}
}
