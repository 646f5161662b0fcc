//! Fixtures and fakes shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
// self
use gateway_auth::{
	auth::{ClientId, Secret},
	cache::{CacheError, CacheFuture, CacheKey, DistributedCache},
	filter::RoleClients,
	token::TokenValidator,
	upstream::{ExchangeError, ExchangeFuture, ExchangeRequest, IssuedToken, OAuthClient},
};

pub const SIGNING_KEY: &str = include_str!("../fixtures/signing_key.pem");
pub const FOREIGN_SIGNING_KEY: &str = include_str!("../fixtures/foreign_signing_key.pem");
pub const VERIFYING_KEY: &str = include_str!("../fixtures/verifying_key.pem");
pub const VERIFYING_KEY_B64: &str = include_str!("../fixtures/verifying_key.b64");

pub fn id(value: &str) -> ClientId {
	ClientId::new(value).expect("Fixture identifier should be valid.")
}

pub fn role_clients() -> RoleClients {
	RoleClients { admin: id("gw-admin"), user: id("gw-user"), courier: id("gw-courier") }
}

pub fn validator() -> Arc<TokenValidator> {
	Arc::new(TokenValidator::from_key_material(VERIFYING_KEY).expect("Fixture key should parse."))
}

/// Signs arbitrary claims with `pem` (PKCS#1 RSA private key).
pub fn sign_with(pem: &str, claims: &Value) -> String {
	let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("Fixture signing key should parse.");

	jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key)
		.expect("Fixture token should sign.")
}

/// Token for `client_id` expiring `lifetime` from now; negative lifetimes yield expired tokens.
pub fn mint(client_id: &str, lifetime: Duration) -> String {
	let exp = (OffsetDateTime::now_utc() + lifetime).unix_timestamp();

	sign_with(SIGNING_KEY, &json!({ "clientId": client_id, "exp": exp }))
}

pub fn mint_valid(client_id: &str) -> String {
	mint(client_id, Duration::hours(1))
}

pub fn mint_expired(client_id: &str) -> String {
	mint(client_id, -Duration::hours(1))
}

type Responder = dyn Fn(&ExchangeRequest) -> Result<IssuedToken, ExchangeError> + Send + Sync;

/// Scripted [`OAuthClient`] that records every request.
pub struct FakeOAuthClient {
	calls: AtomicUsize,
	requests: Mutex<Vec<ExchangeRequest>>,
	delay: Option<StdDuration>,
	respond: Box<Responder>,
}
impl FakeOAuthClient {
	/// Answers every exchange with `token`.
	pub fn issuing(token: impl Into<String>) -> Self {
		let token = token.into();

		Self::with(move |_| {
			Ok(IssuedToken { access_token: Secret::new(token.clone()), expires_in: None })
		})
	}

	/// Answers every exchange with a freshly minted token for the requesting client.
	pub fn minting() -> Self {
		Self::with(|request| {
			Ok(IssuedToken {
				access_token: Secret::new(mint_valid(request.client_id.as_str())),
				expires_in: Some(Duration::hours(1)),
			})
		})
	}

	/// Rejects every exchange as `invalid_client`.
	pub fn rejecting() -> Self {
		Self::with(|_| Err(ExchangeError::InvalidClient { reason: "invalid_client".into() }))
	}

	pub fn with(
		respond: impl 'static + Fn(&ExchangeRequest) -> Result<IssuedToken, ExchangeError> + Send + Sync,
	) -> Self {
		Self {
			calls: AtomicUsize::new(0),
			requests: Mutex::new(Vec::new()),
			delay: None,
			respond: Box::new(respond),
		}
	}

	/// Suspends each exchange for `delay` before answering.
	pub fn with_delay(mut self, delay: StdDuration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<ExchangeRequest> {
		self.requests.lock().clone()
	}
}
impl OAuthClient for FakeOAuthClient {
	fn exchange<'a>(&'a self, request: &'a ExchangeRequest) -> ExchangeFuture<'a> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.requests.lock().push(request.clone());

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			(self.respond)(request)
		})
	}
}

/// Cache whose every operation fails.
#[derive(Default)]
pub struct UnavailableCache;
impl DistributedCache for UnavailableCache {
	fn get<'a>(&'a self, _key: &'a CacheKey) -> CacheFuture<'a, Option<String>> {
		Box::pin(async { Err(unavailable()) })
	}

	fn set_with_ttl<'a>(
		&'a self,
		_key: &'a CacheKey,
		_value: String,
		_ttl: Duration,
	) -> CacheFuture<'a, ()> {
		Box::pin(async { Err(unavailable()) })
	}

	fn delete<'a>(&'a self, _key: &'a CacheKey) -> CacheFuture<'a, ()> {
		Box::pin(async { Err(unavailable()) })
	}
}

fn unavailable() -> CacheError {
	CacheError::Backend { message: "connection refused".into() }
}
