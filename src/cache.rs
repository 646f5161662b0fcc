//! Distributed cache capability used by the token exchange, plus built-in backends.

pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use memory::{CacheEntry, MemoryCache};
#[cfg(feature = "redis")] pub use self::redis::RedisCache;

// self
use crate::{_prelude::*, auth::ClientId};

/// Default prefix for access-token entries.
pub const ACCESS_TOKEN_PREFIX: &str = "accessToken";

/// Boxed future returned by [`DistributedCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Shared key/value store with per-entry expiry.
///
/// The store gives no transactional guarantee across calls; a read followed by a write may
/// interleave with another caller's write to the same key.
pub trait DistributedCache
where
	Self: Send + Sync,
{
	/// Returns the live value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<String>>;

	/// Stores `value` under `key`, replacing any previous value, expiring after `ttl`.
	fn set_with_ttl<'a>(
		&'a self,
		key: &'a CacheKey,
		value: String,
		ttl: Duration,
	) -> CacheFuture<'a, ()>;

	/// Removes `key`. Deleting a missing key succeeds.
	fn delete<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, ()>;
}

/// Errors surfaced by [`DistributedCache`] backends.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// The backend could not serve the request.
	#[error("Cache backend is unavailable: {message}.")]
	Backend {
		/// Backend message.
		message: String,
	},
	/// The backend cannot honor the requested TTL.
	#[error("Cache backend cannot honor a TTL of {ttl}.")]
	UnsupportedTtl {
		/// Requested TTL.
		ttl: Duration,
	},
}

/// Cache key in the `<prefix>:<clientId>` format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);
impl CacheKey {
	/// Builds `<prefix>:<clientId>`.
	pub fn new(prefix: &str, client_id: &ClientId) -> Self {
		Self(format!("{prefix}:{client_id}"))
	}

	/// Builds the access-token key for `client_id`.
	pub fn access_token(client_id: &ClientId) -> Self {
		Self::new(ACCESS_TOKEN_PREFIX, client_id)
	}

	/// Borrows the key text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for CacheKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
