//! In-memory test doubles for the cache and lock ports.

use crate::domain::response::{DeleteResponse, PutResponse};
use crate::domain::{CacheEntry, LockLease, deadline_after};
use crate::ports::{CacheStore, LockStore};
use async_trait::async_trait;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> CacheStore<V> for MemoryCache<V> {
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: V, ttl: Duration) -> Result<PutResponse> {
        let mut entries = self.entries.lock().unwrap();
        let created = entries
            .insert(key.to_string(), CacheEntry::new(value, ttl))
            .is_none();
        Ok(PutResponse::new(created, "stored"))
    }

    async fn forget(&self, key: &str) -> Result<DeleteResponse> {
        let mut entries = self.entries.lock().unwrap();
        Ok(DeleteResponse::new(entries.remove(key).is_some()))
    }

    async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).and_then(|entry| entry.remaining()))
    }

    fn backend(&self) -> &'static str {
        "test-memory"
    }
}

#[derive(Default)]
pub struct MemoryLocks {
    holders: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryLocks {
    pub fn held(&self, key: &str) -> bool {
        let holders = self.holders.lock().unwrap();
        holders
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at > Instant::now())
    }
}

#[async_trait]
impl LockStore for MemoryLocks {
    async fn try_acquire(&self, lock_key: &str, lease: Duration) -> Result<Option<LockLease>> {
        let mut holders = self.holders.lock().unwrap();
        let live = holders
            .get(lock_key)
            .is_some_and(|(_, expires_at)| *expires_at > Instant::now());
        if live {
            return Ok(None);
        }
        let expires_at = deadline_after(lease)
            .ok_or_else(|| Error::InvalidArgument("lease too long".into()))?;
        let grant = LockLease::new(lock_key, lease);
        holders.insert(lock_key.to_string(), (grant.token.clone(), expires_at));
        Ok(Some(grant))
    }

    async fn release(&self, lease: &LockLease) -> Result<bool> {
        let mut holders = self.holders.lock().unwrap();
        match holders.get(&lease.key) {
            Some((token, _)) if *token == lease.token => {
                holders.remove(&lease.key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn wait_until_free(&self, lock_key: &str, max_wait: Duration) -> Result<bool> {
        let deadline = deadline_after(max_wait)
            .ok_or_else(|| Error::InvalidArgument("wait too long".into()))?;
        while self.held(lock_key) {
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(true)
    }

    async fn is_held(&self, lock_key: &str) -> Result<bool> {
        Ok(self.held(lock_key))
    }
}

pub struct DownLocks;

#[async_trait]
impl LockStore for DownLocks {
    async fn try_acquire(&self, _: &str, _: Duration) -> Result<Option<LockLease>> {
        Err(Error::infrastructure("lock store unreachable"))
    }

    async fn release(&self, _: &LockLease) -> Result<bool> {
        Err(Error::infrastructure("lock store unreachable"))
    }

    async fn wait_until_free(&self, _: &str, _: Duration) -> Result<bool> {
        Err(Error::infrastructure("lock store unreachable"))
    }

    async fn is_held(&self, _: &str) -> Result<bool> {
        Err(Error::infrastructure("lock store unreachable"))
    }
}


/// Cache whose writes fail, reads see an empty store
pub struct ReadOnlyCache;

#[async_trait]
impl<V: Clone + Send + Sync + 'static> CacheStore<V> for ReadOnlyCache {
    async fn has(&self, _: &str) -> Result<bool> {
        Ok(false)
    }

    async fn get(&self, _: &str) -> Result<Option<V>> {
        Ok(None)
    }

    async fn put(&self, _: &str, _: V, _: Duration) -> Result<PutResponse> {
        Err(Error::infrastructure("cache store rejected write"))
    }

    async fn forget(&self, _: &str) -> Result<DeleteResponse> {
        Ok(DeleteResponse::new(false))
    }

    fn backend(&self) -> &'static str {
        "read-only"
    }
}

/// Lock store that reports the lock as taken, then fails while waiting
pub struct WaitFailsLocks;

#[async_trait]
impl LockStore for WaitFailsLocks {
    async fn try_acquire(&self, _: &str, _: Duration) -> Result<Option<LockLease>> {
        Ok(None)
    }

    async fn release(&self, _: &LockLease) -> Result<bool> {
        Ok(false)
    }

    async fn wait_until_free(&self, _: &str, _: Duration) -> Result<bool> {
        Err(Error::infrastructure("lock store connection lost"))
    }

    async fn is_held(&self, _: &str) -> Result<bool> {
        Ok(true)
    }
}
