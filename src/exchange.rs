//! Cache-aside access-token exchange keyed by client identity.
//!
//! [`TokenExchangeCache::check_and_get_token`] reads `<prefix>:<clientId>`, re-validates the
//! cached token on every read, and regenerates it through the provider when the entry is
//! absent, expired, or invalid. The cache TTL and the token's own expiry are independent, so
//! an entry may hold an expired token until the next read replaces it.
//!
//! Regeneration is not serialized by default; see [`lease`] for the opt-in single-flight.

pub mod lease;

pub use lease::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
	cache::{ACCESS_TOKEN_PREFIX, CacheKey, DistributedCache},
	obs::{self, AuthOutcome, AuthSpan, AuthStage},
	token::{TokenValidator, ValidationOutcome},
	upstream::{ExchangeRequest, GrantType, OAuthClient},
};

/// Fixed parameters of every exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeSettings {
	/// Scope string sent to the provider.
	pub scope: String,
	/// Grant sent to the provider.
	pub grant_type: GrantType,
	/// TTL applied to freshly stored tokens.
	pub ttl: Duration,
	/// Cache key prefix.
	pub key_prefix: String,
}
impl ExchangeSettings {
	/// TTL applied when none is configured.
	pub const DEFAULT_TTL: Duration = Duration::hours(24);

	/// Settings with the default grant, TTL, and key prefix.
	pub fn new(scope: impl Into<String>) -> Self {
		Self {
			scope: scope.into(),
			grant_type: GrantType::default(),
			ttl: Self::DEFAULT_TTL,
			key_prefix: ACCESS_TOKEN_PREFIX.into(),
		}
	}

	/// Overrides the stored-token TTL.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Overrides the cache key prefix.
	pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.key_prefix = prefix.into();

		self
	}

	/// Overrides the grant type.
	pub fn with_grant_type(mut self, grant_type: GrantType) -> Self {
		self.grant_type = grant_type;

		self
	}
}

/// Returns a usable access token per client, regenerating through the provider on demand.
#[derive(Clone)]
pub struct TokenExchangeCache {
	validator: Arc<TokenValidator>,
	cache: Arc<dyn DistributedCache>,
	oauth: Arc<dyn OAuthClient>,
	lease: Arc<dyn ExchangeLease>,
	settings: ExchangeSettings,
}
impl TokenExchangeCache {
	/// Creates an exchange cache without a regeneration lease.
	pub fn new(
		validator: Arc<TokenValidator>,
		cache: Arc<dyn DistributedCache>,
		oauth: Arc<dyn OAuthClient>,
		settings: ExchangeSettings,
	) -> Self {
		Self { validator, cache, oauth, lease: Arc::new(NoLease), settings }
	}

	/// Replaces the regeneration lease.
	pub fn with_lease(mut self, lease: Arc<dyn ExchangeLease>) -> Self {
		self.lease = lease;

		self
	}

	/// Exchange parameters.
	pub fn settings(&self) -> &ExchangeSettings {
		&self.settings
	}

	/// Returns the cached token for `client_id` when it still validates; otherwise exchanges
	/// `secret` for a new token, stores it, and returns it.
	///
	/// A failed exchange leaves the cache untouched. Nothing is retried.
	pub async fn check_and_get_token(&self, client_id: &ClientId, secret: &Secret) -> Result<Secret> {
		let key = CacheKey::new(&self.settings.key_prefix, client_id);

		if let Some(token) = self.cached_valid(&key).await? {
			return Ok(token);
		}

		let _lease = self.lease.acquire(&key).await;

		if self.lease.is_exclusive() {
			// Another holder may have stored a fresh token while this caller waited.
			if let Some(token) = self.cached_valid(&key).await? {
				return Ok(token);
			}
		}

		self.regenerate(&key, client_id, secret).await
	}

	/// Reads the raw value stored at `<prefix>:<client_id>` without validating it.
	pub async fn read_token(&self, prefix: &str, client_id: &ClientId) -> Result<Option<Secret>> {
		let key = CacheKey::new(prefix, client_id);

		Ok(self.cache.get(&key).await?.map(Secret::new))
	}

	/// Replaces the value at `<prefix>:<client_id>`: deletes the old entry, then sets the new
	/// one with `ttl`.
	pub async fn save_token(
		&self,
		prefix: &str,
		client_id: &ClientId,
		token: &Secret,
		ttl: Duration,
	) -> Result<()> {
		self.store(&CacheKey::new(prefix, client_id), token, ttl).await
	}

	async fn cached_valid(&self, key: &CacheKey) -> Result<Option<Secret>> {
		let Some(raw) = self.cache.get(key).await? else {
			return Ok(None);
		};

		match self.validator.validate(&raw) {
			ValidationOutcome::Valid(_) => Ok(Some(Secret::new(raw))),
			ValidationOutcome::Expired | ValidationOutcome::Invalid(_) => Ok(None),
		}
	}

	async fn regenerate(
		&self,
		key: &CacheKey,
		client_id: &ClientId,
		secret: &Secret,
	) -> Result<Secret> {
		const STAGE: AuthStage = AuthStage::TokenRefresh;

		let span = AuthSpan::new(STAGE, key.as_str());

		obs::record_outcome(STAGE, AuthOutcome::Attempt);

		let result = span
			.instrument(async {
				let request = ExchangeRequest {
					client_id: client_id.clone(),
					client_secret: secret.clone(),
					scope: self.settings.scope.clone(),
					grant_type: self.settings.grant_type,
				};
				let issued = self.oauth.exchange(&request).await?;

				self.store(key, &issued.access_token, self.settings.ttl).await?;

				Ok(issued.access_token)
			})
			.await;

		obs::record_outcome(STAGE, AuthOutcome::of(&result));

		result
	}

	async fn store(&self, key: &CacheKey, token: &Secret, ttl: Duration) -> Result<()> {
		self.cache.delete(key).await?;
		self.cache.set_with_ttl(key, token.expose().to_owned(), ttl).await?;

		Ok(())
	}
}
impl Debug for TokenExchangeCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchangeCache")
			.field("validator", &self.validator)
			.field("settings", &self.settings)
			.field("single_flight", &self.lease.is_exclusive())
			.finish_non_exhaustive()
	}
}
