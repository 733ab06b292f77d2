//! Immutable OAuth 1.0 tokens (consumer, request, and access credentials).

pub mod secret;

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret, error::ProtocolError};

/// Form field carrying the token identifier in token endpoint responses.
pub const OAUTH_TOKEN: &str = "oauth_token";
/// Form field carrying the token secret in token endpoint responses.
pub const OAUTH_TOKEN_SECRET: &str = "oauth_token_secret";
/// Attribute some providers return so access tokens can be refreshed.
pub const OAUTH_SESSION_HANDLE: &str = "oauth_session_handle";

/// Identifier + secret pair with provider-defined attributes.
///
/// Consumer tokens are configured once per application; request and access tokens are
/// minted by [`TokenExchange`](crate::oauth::TokenExchange). Tokens never change after
/// construction; a refresh produces a new value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	identifier: String,
	secret: TokenSecret,
	#[serde(default)]
	attributes: BTreeMap<String, String>,
}
impl Token {
	/// Creates a token without attributes.
	pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
		Self {
			identifier: identifier.into(),
			secret: TokenSecret::new(secret),
			attributes: BTreeMap::new(),
		}
	}

	/// Returns a copy carrying the provided attributes in addition to the existing ones.
	pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.attributes.extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Parses an `application/x-www-form-urlencoded` token endpoint response.
	///
	/// `oauth_token` and `oauth_token_secret` become the identifier and secret; every other
	/// key is kept as an attribute.
	pub fn from_form_body(body: &str) -> Result<Self, ProtocolError> {
		let mut identifier = None;
		let mut secret = None;
		let mut attributes = BTreeMap::new();

		for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
			match key.as_ref() {
				OAUTH_TOKEN => identifier = Some(value.into_owned()),
				OAUTH_TOKEN_SECRET => secret = Some(value.into_owned()),
				_ => {
					attributes.insert(key.into_owned(), value.into_owned());
				},
			}
		}

		let identifier =
			identifier.ok_or(ProtocolError::MalformedTokenResponse { field: OAUTH_TOKEN })?;
		let secret =
			secret.ok_or(ProtocolError::MalformedTokenResponse { field: OAUTH_TOKEN_SECRET })?;

		Ok(Self { identifier, secret: TokenSecret::new(secret), attributes })
	}

	/// Public token identifier (`oauth_token` or `oauth_consumer_key`).
	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	/// Signing secret; never transmitted.
	pub fn secret(&self) -> &TokenSecret {
		&self.secret
	}

	/// Provider-defined attributes returned alongside the token.
	pub fn attributes(&self) -> &BTreeMap<String, String> {
		&self.attributes
	}

	/// Looks up a single attribute.
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).map(String::as_str)
	}

	/// Session handle used by providers that support access token refresh.
	pub fn session_handle(&self) -> Option<&str> {
		self.attribute(OAUTH_SESSION_HANDLE)
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("identifier", &self.identifier)
			.field("secret", &self.secret)
			.field("attributes", &self.attributes)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn form_body_splits_credentials_from_attributes() {
		let token = Token::from_form_body(
			"oauth_token=abc&oauth_token_secret=xyz&oauth_session_handle=h1",
		)
		.expect("Token body fixture should parse.");

		assert_eq!(token.identifier(), "abc");
		assert_eq!(token.secret().expose(), "xyz");
		assert_eq!(token.attributes().len(), 1);
		assert_eq!(token.session_handle(), Some("h1"));
	}

	#[test]
	fn form_body_decodes_values() {
		let token = Token::from_form_body(
			"oauth_token=a%2Fb&oauth_token_secret=s+p&oauth_expires_in=3600&xoauth_yahoo_guid=G%3D\n",
		)
		.expect("Encoded token body should parse.");

		assert_eq!(token.identifier(), "a/b");
		assert_eq!(token.secret().expose(), "s p");
		assert_eq!(token.attribute("oauth_expires_in"), Some("3600"));
		assert_eq!(token.attribute("xoauth_yahoo_guid"), Some("G="));
	}

	#[test]
	fn form_body_requires_token_and_secret() {
		let err = Token::from_form_body("oauth_token_secret=xyz")
			.expect_err("Missing oauth_token should be rejected.");

		assert!(matches!(err, ProtocolError::MalformedTokenResponse { field: OAUTH_TOKEN }));

		let err = Token::from_form_body("oauth_token=abc&oauth_callback_confirmed=true")
			.expect_err("Missing oauth_token_secret should be rejected.");

		assert!(matches!(err, ProtocolError::MalformedTokenResponse { field: OAUTH_TOKEN_SECRET }));
	}

	#[test]
	fn debug_output_redacts_secret() {
		let token = Token::new("consumer", "very-secret").with_attributes([("realm", "photos")]);
		let rendered = format!("{token:?}");

		assert!(rendered.contains("consumer"));
		assert!(rendered.contains("photos"));
		assert!(!rendered.contains("very-secret"));
	}
}
