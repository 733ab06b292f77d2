//! OAuth 1.0a for blocking HTTP clients: HMAC-SHA1 request signing, the three-legged token
//! exchange, atomically refreshed authorizations, and a retrying executor with pluggable
//! retry policies.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod retry;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` feature.

	pub use crate::_prelude::*;

	// self
	use crate::{auth::Token, config::OAuthConfig, http::ReqwestHttpClient, oauth::TokenExchange};

	/// Builds a blocking reqwest client with short timeouts so a wedged mock server fails the
	/// test instead of hanging it.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::with_timeouts(
			Some(Duration::seconds(5)),
			Some(Duration::seconds(10)),
		)
		.expect("Failed to build Reqwest client for tests.")
	}

	/// Constructs a [`TokenExchange`] that talks to `config` through the test reqwest client.
	pub fn build_reqwest_test_exchange(
		config: OAuthConfig,
		consumer_key: &str,
		consumer_secret: &str,
	) -> TokenExchange {
		TokenExchange::new(
			config,
			Token::new(consumer_key, consumer_secret),
			Arc::new(test_reqwest_http_client()),
		)
		.expect("Test exchange configuration should validate.")
	}
}

mod _prelude {
	pub use std::{
		borrow::Cow,
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, serde_json as _};
