//! Redis-backed [`DistributedCache`] (feature `redis`).
//!
//! Values are stored as raw UTF-8 strings with `SET key value EX seconds`. Operations are
//! never retried here; a failure surfaces as [`CacheError::Backend`] and the next request
//! tries again.

// crates.io
use redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, CacheKey, DistributedCache},
};

/// Cache backed by a shared multiplexed Redis connection. Clones share the connection.
#[derive(Clone)]
pub struct RedisCache {
	connection: MultiplexedConnection,
}
impl RedisCache {
	/// Opens a client for `url` (for example `redis://127.0.0.1:6379`) and connects.
	pub async fn connect(url: &str) -> Result<Self, CacheError> {
		let client = Client::open(url).map_err(backend)?;
		let connection = client.get_multiplexed_async_connection().await.map_err(backend)?;

		Ok(Self { connection })
	}

	/// Wraps an existing connection.
	pub fn from_connection(connection: MultiplexedConnection) -> Self {
		Self { connection }
	}
}
impl Debug for RedisCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RedisCache(..)")
	}
}
impl DistributedCache for RedisCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<String>> {
		let mut connection = self.connection.clone();

		Box::pin(async move {
			connection.get::<_, Option<String>>(key.as_str()).await.map_err(backend)
		})
	}

	fn set_with_ttl<'a>(
		&'a self,
		key: &'a CacheKey,
		value: String,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		let mut connection = self.connection.clone();

		Box::pin(async move {
			let seconds = u64::try_from(ttl.whole_seconds())
				.ok()
				.filter(|secs| *secs > 0)
				.ok_or(CacheError::UnsupportedTtl { ttl })?;

			connection.set_ex::<_, _, ()>(key.as_str(), value, seconds).await.map_err(backend)
		})
	}

	fn delete<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, ()> {
		let mut connection = self.connection.clone();

		Box::pin(async move { connection.del::<_, ()>(key.as_str()).await.map_err(backend) })
	}
}

fn backend(e: RedisError) -> CacheError {
	CacheError::Backend { message: e.to_string() }
}
