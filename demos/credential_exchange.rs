//! Exchanges client credentials through the gateway endpoint against a mock token endpoint,
//! then serves the second request from the in-memory cache.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use gateway_auth::{
	auth::{ClientCredential, ClientId, Secret},
	cache::MemoryCache,
	config::GatewayConfig,
	endpoint::CLIENT_DATA_HEADER,
	http::{HeaderMap, HeaderValue},
};

const SIGNING_KEY: &str = include_str!("../tests/fixtures/signing_key.pem");
const VERIFYING_KEY: &str = include_str!("../tests/fixtures/verifying_key.pem");

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let exp = (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp();
	let upstream_token = jsonwebtoken::encode(
		&Header::new(Algorithm::RS256),
		&json!({ "clientId": "demo-courier", "exp": exp }),
		&EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes())?,
	)?;
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				json!({ "access_token": upstream_token, "token_type": "bearer", "expires_in": 3600 })
					.to_string(),
			);
		})
		.await;
	let config = GatewayConfig::from_json_str(
		&json!({
			"public-key": VERIFYING_KEY,
			"clients": { "admin": "demo-admin", "user": "demo-user", "courier": "demo-courier" },
			"oauth": {
				"token-endpoint": server.url("/token"),
				"scope": "openid",
				"allow-insecure-http": true
			}
		})
		.to_string(),
	)?;
	let auth = config.build_with_reqwest(Arc::new(MemoryCache::default()))?;
	let credential = ClientCredential::new(ClientId::new("demo-courier")?, Secret::new("pa55"));
	let mut headers = HeaderMap::new();

	headers.insert(CLIENT_DATA_HEADER, HeaderValue::from_str(&credential.to_header_value())?);

	for attempt in 1..=2 {
		let response = auth.endpoint.respond(&headers).await;

		println!(
			"Attempt {attempt}: HTTP {} with {} token bytes.",
			response.status(),
			response.body().len()
		);
	}

	// The second attempt reused the cached token.
	token_mock.assert_calls_async(1).await;

	Ok(())
}
