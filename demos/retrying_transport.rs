//! Composes a signing transport with a retrying executor: transient failures back off
//! exponentially, `401` responses refresh the access token and retry once.
//!
//! Set `OAUTH1_RESOURCE_URL` (plus the consumer, token, and refresh endpoint variables) to
//! send a real request; otherwise the demo only prints the assembled stack.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use oauth1_broker::{
	auth::Token,
	config::OAuthConfig,
	http::{HttpRequest, HttpTransport, Method, ReqwestHttpClient},
	oauth::{Authorization, SigningTransport, TokenExchange},
	retry::{ExponentialBackoff, MaxAttempts, RefreshAuthorizationRetry, RetryingExecutor},
};
use time::Duration;

fn var(name: &str, fallback: &str) -> String {
	env::var(name).unwrap_or_else(|_| fallback.into())
}

fn main() -> Result<()> {
	color_eyre::install()?;

	let config = OAuthConfig::builder()
		.refresh_token_endpoint(Url::parse(&var(
			"OAUTH1_REFRESH_URL",
			"https://api.example.com/oauth/refresh",
		))?)
		.error_threshold(400)
		.build()?;
	let client =
		ReqwestHttpClient::with_timeouts(Some(Duration::seconds(5)), Some(Duration::seconds(30)))?;
	let exchange = TokenExchange::new(
		config.clone(),
		Token::new(var("OAUTH1_CONSUMER_KEY", "consumer"), var("OAUTH1_CONSUMER_SECRET", "secret")),
		Arc::new(client.clone()),
	)?;
	let authorization = Arc::new(Authorization::new(
		Arc::new(exchange),
		Token::new(var("OAUTH1_TOKEN", "token"), var("OAUTH1_TOKEN_SECRET", "token-secret")),
	));
	let backoff = ExponentialBackoff::new(4).with_initial_delay(Duration::milliseconds(250));
	let executor =
		RetryingExecutor::from_config(SigningTransport::new(client, authorization.clone()), &config)?
			.with_retry_handler(
				RefreshAuthorizationRetry::new(authorization).with_fallback(backoff),
			)
			.with_route(Some(Method::Post), "/uploads", MaxAttempts::new(1));

	println!("{executor:#?}");

	let Ok(resource) = env::var("OAUTH1_RESOURCE_URL") else {
		return Ok(());
	};
	let response = executor.execute(&HttpRequest::get(Url::parse(&resource)?))?;
	let status = response.status();

	println!("HTTP {status}: {}", response.text()?);
	println!(
		"Attempts: {}, retries: {}.",
		executor.metrics().attempts(),
		executor.metrics().retries()
	);

	Ok(())
}
