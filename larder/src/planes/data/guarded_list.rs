use crate::domain::{GuardedRead, LockLease, ReadSource, deadline_after, lock_key_for};
use crate::ports::{CacheStore, LockStore};
use shared::{BoxError, Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stampede guard for a cacheable collection.
///
/// On a miss only the caller that wins the `lock:<key>` lease runs the loader and
/// repopulates the cache. Callers that lose the try-lock wait for the lease to be
/// released (bounded by the lease duration) and then read whatever the cache holds.
///
/// The guard owns no state of its own: correctness across processes depends on the
/// `LockStore` given to it. An in-process lock store only serializes loads within
/// one process.
pub struct CachedListGuard<V> {
    cache: Arc<dyn CacheStore<V>>,
    locks: Arc<dyn LockStore>,
}

impl<V> Clone for CachedListGuard<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<V: 'static> std::fmt::Debug for CachedListGuard<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedListGuard")
            .field("cache_backend", &self.cache.backend())
            .finish()
    }
}

impl<V> CachedListGuard<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(cache: Arc<dyn CacheStore<V>>, locks: Arc<dyn LockStore>) -> Self {
        Self { cache, locks }
    }

    /// Return the cached value for `cache_key`, running `loader` at most once per
    /// lock epoch when the entry is missing.
    ///
    /// Loader errors are returned as `Error::LoaderFailure` and leave the cache
    /// untouched. Cache or lock backend errors are returned as they come
    /// (`Error::InfrastructureUnavailable`). Nothing is retried here.
    ///
    /// When the lock is held elsewhere and the wait times out before the holder
    /// repopulates the cache, the result carries no value and `ReadSource::Absent`.
    pub async fn get<F, Fut, E>(
        &self,
        cache_key: &str,
        loader: F,
        ttl: Duration,
        lock_lease: Duration,
    ) -> Result<GuardedRead<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<BoxError>,
    {
        validate_key(cache_key)?;
        validate_duration("ttl", ttl)?;
        validate_duration("lock lease", lock_lease)?;

        // diagnostic only
        let had_value_initially = self.cache.has(cache_key).await?;
        let lock_key = lock_key_for(cache_key);

        let (value, source) = match self.locks.try_acquire(&lock_key, lock_lease).await? {
            Some(lease) => {
                debug!(lock_key = %lock_key, "lock acquired");
                let held = HeldLock::new(Arc::clone(&self.locks), lease);
                let outcome = self.populate(cache_key, loader, ttl).await;
                let released = held.release().await;
                // a loader or store failure wins over a release failure
                let (value, source) = outcome?;
                released?;
                (Some(value), source)
            }
            None => {
                debug!(lock_key = %lock_key, "lock held elsewhere, waiting up to {:?}", lock_lease);
                if !self.locks.wait_until_free(&lock_key, lock_lease).await? {
                    debug!(lock_key = %lock_key, "wait timed out, reading cache as is");
                }
                match self.cache.get(cache_key).await? {
                    Some(value) => (Some(value), ReadSource::Cache),
                    None => {
                        warn!(cache_key, "cache still empty after waiting for lock holder");
                        (None, ReadSource::Absent)
                    }
                }
            }
        };

        let ttl_remaining = match value {
            Some(_) => self.ttl_remaining(cache_key).await,
            None => None,
        };

        Ok(GuardedRead {
            value,
            source,
            had_value_initially,
            ttl_remaining,
            cache_backend: self.cache.backend(),
        })
    }

    /// Remove the entry so the next `get` reloads it. Missing keys are fine.
    pub async fn invalidate(&self, cache_key: &str) -> Result<()> {
        validate_key(cache_key)?;
        let outcome = self.cache.forget(cache_key).await?;
        info!(cache_key, existed = outcome.deleted, "cache entry invalidated");
        Ok(())
    }

    // Runs with the lease held
    async fn populate<F, Fut, E>(
        &self,
        cache_key: &str,
        loader: F,
        ttl: Duration,
    ) -> Result<(V, ReadSource)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<BoxError>,
    {
        if let Some(value) = self.cache.get(cache_key).await? {
            debug!(cache_key, "cache hit inside lock");
            return Ok((value, ReadSource::Cache));
        }

        info!(cache_key, "cache miss, loading");
        let value = loader().await.map_err(Error::loader)?;
        self.cache.put(cache_key, value.clone(), ttl).await?;
        info!(cache_key, ttl_secs = ttl.as_secs(), "fresh value stored in cache");

        Ok((value, ReadSource::Loader))
    }

    // Advisory, a failure here must not fail the read
    async fn ttl_remaining(&self, cache_key: &str) -> Option<Duration> {
        match self.cache.ttl_remaining(cache_key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                warn!(cache_key, "could not read remaining ttl: {}", e);
                None
            }
        }
    }
}

// Both durations become deadlines in the stores, so they must fit in an `Instant`
fn validate_duration(name: &str, duration: Duration) -> Result<()> {
    if duration.is_zero() {
        return Err(Error::InvalidArgument(format!("{} must be positive", name)));
    }
    if deadline_after(duration).is_none() {
        return Err(Error::InvalidArgument(format!("{} of {:?} is too large", name, duration)));
    }
    Ok(())
}

fn validate_key(cache_key: &str) -> Result<()> {
    if cache_key.trim().is_empty() {
        return Err(Error::InvalidArgument("cache key must not be empty".into()));
    }
    Ok(())
}

/// Scoped ownership of a lease.
///
/// `release` is awaited on the normal path. If the owning future panics or is
/// dropped mid-load, `Drop` hands the release to the runtime; without a runtime
/// the lease simply expires.
struct HeldLock {
    locks: Arc<dyn LockStore>,
    lease: Option<LockLease>,
}

impl HeldLock {
    fn new(locks: Arc<dyn LockStore>, lease: LockLease) -> Self {
        Self {
            locks,
            lease: Some(lease),
        }
    }

    async fn release(mut self) -> Result<()> {
        let Some(lease) = self.lease.take() else {
            return Ok(());
        };

        if self.locks.release(&lease).await? {
            debug!(lock_key = %lease.key, "lock released");
        } else if lease.has_lapsed() {
            warn!(
                lock_key = %lease.key,
                "lease of {:?} lapsed before release, lock may have a new holder",
                lease.lease
            );
        } else {
            warn!(lock_key = %lease.key, "lock was already taken from this holder");
        }
        Ok(())
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let locks = Arc::clone(&self.locks);
                handle.spawn(async move {
                    if let Err(e) = locks.release(&lease).await {
                        warn!(lock_key = %lease.key, "deferred lock release failed: {}", e);
                    }
                });
            }
            Err(_) => {
                warn!(lock_key = %lease.key, "no runtime to release lock, waiting for lease expiry");
            }
        }
    }
}
