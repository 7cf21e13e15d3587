use async_trait::async_trait;
use larder::domain::CacheEntry;
use larder::domain::response::{DeleteResponse, PutResponse};
use larder::ports::CacheStore;
use moka::Expiry;
use moka::future::Cache;
use shared::Result;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Expires each entry at the deadline recorded when it was stored
struct EntryDeadline;

impl<V> Expiry<String, CacheEntry<V>> for EntryDeadline {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.remaining()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.remaining()
    }
}

/// Moka-based cache store with per-entry TTL.
/// Lives inside one process, pair it with `LocalLockStore`.
pub struct MokaCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<String, CacheEntry<V>>,
}

impl<V> MokaCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an unbounded store
    pub fn new_unbounded() -> Self {
        Self {
            cache: Cache::builder().expire_after(EntryDeadline).build(),
        }
    }

    /// Create a store holding at most `max_entries` keys
    pub fn new_bounded(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(EntryDeadline)
                .build(),
        }
    }

    // Moka's own expiry is enforced lazily, check the deadline on every read as well
    async fn live_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.cache.get(key).await.filter(|entry| entry.is_live())
    }
}

impl<V> Default for MokaCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new_unbounded()
    }
}

#[async_trait]
impl<V> CacheStore<V> for MokaCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.live_entry(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: V, ttl: Duration) -> Result<PutResponse> {
        let existed = self.live_entry(key).await.is_some();
        self.cache
            .insert(key.to_string(), CacheEntry::new(value, ttl))
            .await;
        Ok(PutResponse::new(!existed, "Successfully inserted"))
    }

    async fn forget(&self, key: &str) -> Result<DeleteResponse> {
        let existed = self.cache.remove(key).await.is_some();
        Ok(DeleteResponse::new(existed))
    }

    async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.live_entry(key).await.and_then(|entry| entry.remaining()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

impl<V> Debug for MokaCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheStore")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
