//! Thread-safe in-process [`DistributedCache`] for local development and tests.

// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, CacheKey, DistributedCache},
};

type EntryMap = Arc<RwLock<HashMap<CacheKey, CacheEntry>>>;

/// Snapshot of one stored value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
	/// Stored value.
	pub value: String,
	/// Instant after which the entry is treated as absent.
	pub expires_at: OffsetDateTime,
}
impl CacheEntry {
	fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}
}

/// Keeps entries in process memory with lazy expiry.
///
/// Expired entries are dropped on the next read of their key. Clones share storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(EntryMap);
impl MemoryCache {
	/// Returns the stored entry, live or expired, for inspection.
	pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
		self.0.read().get(key).cloned()
	}

	/// Number of stored entries, including expired ones not yet evicted.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: &EntryMap, key: &CacheKey, now: OffsetDateTime) -> Option<String> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if entry.is_live_at(now) => return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = map.write();

		// Another writer may have replaced the entry between the two locks.
		if guard.get(key).is_some_and(|entry| !entry.is_live_at(now)) {
			guard.remove(key);
		}

		guard.get(key).map(|entry| entry.value.clone())
	}
}
impl DistributedCache for MemoryCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(&map, key, OffsetDateTime::now_utc())) })
	}

	fn set_with_ttl<'a>(
		&'a self,
		key: &'a CacheKey,
		value: String,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			if ttl.is_negative() {
				return Err(CacheError::UnsupportedTtl { ttl });
			}

			let expires_at = OffsetDateTime::now_utc()
				.checked_add(ttl)
				.ok_or(CacheError::UnsupportedTtl { ttl })?;

			map.write().insert(key.clone(), CacheEntry { value, expires_at });

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(key);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ClientId;

	fn key(client: &str) -> CacheKey {
		CacheKey::access_token(&ClientId::new(client).expect("Fixture should be valid."))
	}

	#[tokio::test]
	async fn zero_ttl_entries_read_as_absent() {
		let cache = MemoryCache::default();
		let key = key("alice");

		cache
			.set_with_ttl(&key, "stale".into(), Duration::ZERO)
			.await
			.expect("Zero TTL writes should succeed.");

		assert!(cache.entry(&key).is_some());
		assert_eq!(cache.get(&key).await.expect("Read should succeed."), None);
		assert!(cache.is_empty(), "Expired entry should be evicted on read.");
	}

	#[tokio::test]
	async fn negative_ttl_is_rejected() {
		let cache = MemoryCache::default();
		let err = cache
			.set_with_ttl(&key("bob"), "value".into(), Duration::seconds(-1))
			.await
			.expect_err("Negative TTL should be rejected.");

		assert!(matches!(err, CacheError::UnsupportedTtl { .. }));
	}

	#[tokio::test]
	async fn unrepresentable_expiry_is_rejected() {
		let cache = MemoryCache::default();
		let key = key("carol");
		let err = cache
			.set_with_ttl(&key, "value".into(), Duration::seconds(i64::MAX))
			.await
			.expect_err("TTL past the representable range should be rejected.");

		assert!(matches!(err, CacheError::UnsupportedTtl { .. }));
		assert!(cache.entry(&key).is_none());
	}
}
