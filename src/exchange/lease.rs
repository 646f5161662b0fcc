//! Per-key leases around token regeneration.
//!
//! [`NoLease`] keeps concurrent regenerations independent: two requests missing the cache
//! for one client may both call the provider, and the last cache write wins.
//! [`SingleFlightLease`] serializes regenerations per key so later callers find the token the
//! first one stored.

// self
use crate::{_prelude::*, cache::CacheKey};

/// Boxed future returned by [`ExchangeLease::acquire`].
pub type LeaseFuture<'a> = Pin<Box<dyn Future<Output = LeaseGuard> + 'a + Send>>;

/// Extension point deciding whether regenerations for one key run concurrently.
pub trait ExchangeLease
where
	Self: Send + Sync,
{
	/// Waits until the caller may regenerate the token for `key`.
	fn acquire<'a>(&'a self, key: &'a CacheKey) -> LeaseFuture<'a>;

	/// Whether holding the guard excludes other regenerations of the same key.
	///
	/// When `true` the exchange re-reads the cache after acquiring.
	fn is_exclusive(&self) -> bool;
}

/// Held for the duration of one regeneration; dropping it releases the lease.
pub struct LeaseGuard(Option<async_lock::MutexGuardArc<()>>);
impl LeaseGuard {
	/// Guard that excludes nothing.
	pub fn unheld() -> Self {
		Self(None)
	}

	/// Returns `true` when the guard holds a per-key lock.
	pub fn is_held(&self) -> bool {
		self.0.is_some()
	}
}
impl Debug for LeaseGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("LeaseGuard").field(&self.is_held()).finish()
	}
}

/// Lease that never waits.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLease;
impl ExchangeLease for NoLease {
	fn acquire<'a>(&'a self, _key: &'a CacheKey) -> LeaseFuture<'a> {
		Box::pin(async { LeaseGuard::unheld() })
	}

	fn is_exclusive(&self) -> bool {
		false
	}
}

/// One async mutex per cache key.
///
/// Locks are created on first use and kept for the life of the lease, one per client that
/// ever regenerated.
#[derive(Debug, Default)]
pub struct SingleFlightLease {
	locks: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
}
impl SingleFlightLease {
	/// Number of keys with a lock allocated.
	pub fn tracked_keys(&self) -> usize {
		self.locks.lock().len()
	}

	fn lock_for(&self, key: &CacheKey) -> Arc<AsyncMutex<()>> {
		self.locks.lock().entry(key.clone()).or_default().clone()
	}
}
impl ExchangeLease for SingleFlightLease {
	fn acquire<'a>(&'a self, key: &'a CacheKey) -> LeaseFuture<'a> {
		let lock = self.lock_for(key);

		Box::pin(async move { LeaseGuard(Some(lock.lock_arc().await)) })
	}

	fn is_exclusive(&self) -> bool {
		true
	}
}
