//! Walks through the three-legged OAuth 1.0a flow: temporary credentials, user authorization,
//! and token credentials, then signs a resource request with the result.
//!
//! Without `OAUTH1_REQUEST_TOKEN_URL` the demo stays offline and reproduces the RFC 5849
//! example signature instead.

// std
use std::{env, io, sync::Arc};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use oauth1_broker::{
	auth::Token,
	config::{OAuthConfig, ParamDestination},
	http::Method,
	oauth::{Authorization, FixedVariantProvider, TokenExchange},
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let consumer = Token::new(
		env::var("OAUTH1_CONSUMER_KEY").unwrap_or_else(|_| "dpf43f3p2l4k3l03".into()),
		env::var("OAUTH1_CONSUMER_SECRET").unwrap_or_else(|_| "kd94hf93k423kf44".into()),
	);

	let Ok(request_token_url) = env::var("OAUTH1_REQUEST_TOKEN_URL") else {
		return sign_offline(consumer);
	};
	let config = OAuthConfig::builder()
		.request_token_endpoint(Url::parse(&request_token_url)?)
		.access_token_endpoint(Url::parse(&env::var("OAUTH1_ACCESS_TOKEN_URL")?)?)
		.authorization_endpoint(Url::parse(&env::var("OAUTH1_AUTHORIZE_URL")?)?)
		.build()?;
	let exchange = Arc::new(TokenExchange::with_reqwest(config, consumer)?);
	let request_token = exchange.request_token()?;

	println!("Send your user to {}.", exchange.authorize_url(&request_token)?);
	println!("Paste the verifier shown after approval:");

	let mut verifier = String::new();

	io::stdin().read_line(&mut verifier)?;

	let access_token = exchange.access_token(&request_token, verifier.trim())?;

	println!("Obtained access token {}.", access_token.identifier());

	let authorization = Authorization::new(exchange, access_token);
	let params = authorization.authorize(
		Method::Get,
		&Url::parse("https://api.example.com/1.1/account/verify_credentials.json")?,
		&[],
	)?;

	println!("Authorization header: {:?}.", params.header_value());

	Ok(())
}

fn sign_offline(consumer: Token) -> Result<()> {
	let config = OAuthConfig::builder().destination(ParamDestination::Header).build()?;
	let exchange = TokenExchange::with_reqwest(config, consumer)?.with_variant_provider(Arc::new(
		FixedVariantProvider::new("1191242096", "kllo9940pd9333jh"),
	));
	let authorization =
		Authorization::new(Arc::new(exchange), Token::new("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00"));
	let params = authorization.authorize(
		Method::Get,
		&Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original")?,
		&[],
	)?;

	println!("{}", params.header_value().unwrap_or_default());

	Ok(())
}
