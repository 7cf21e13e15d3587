#![deny(clippy::all)]

use crate::domain::response::{DeleteResponse, PutResponse};
use crate::domain::{Category, CategoryChanges, LockLease, NewCategory};
use async_trait::async_trait;
use shared::Result;
use std::time::Duration;

// Ports are the pluggable extension points for the cache, lock and record backends.
// Backend failures surface as Error::InfrastructureUnavailable.

/// Port for the shared cache holding list payloads
#[async_trait]
pub trait CacheStore<V>: Send + Sync + 'static {
    async fn has(&self, key: &str) -> Result<bool>;
    async fn get(&self, key: &str) -> Result<Option<V>>;
    async fn put(&self, key: &str, value: V, ttl: Duration) -> Result<PutResponse>;
    async fn forget(&self, key: &str) -> Result<DeleteResponse>;

    /// Remaining TTL on an entry, for backends that can report it
    async fn ttl_remaining(&self, _key: &str) -> Result<Option<Duration>> {
        Ok(None)
    }

    /// Short backend name reported in read diagnostics
    fn backend(&self) -> &'static str;
}

/// Port for short-lived lease locks
#[async_trait]
pub trait LockStore: Send + Sync + 'static {
    /// Single non-blocking attempt. Returns None when another holder's lease is live.
    async fn try_acquire(&self, lock_key: &str, lease: Duration) -> Result<Option<LockLease>>;

    /// Release only if `lease` still owns the key. Returns whether it did.
    async fn release(&self, lease: &LockLease) -> Result<bool>;

    /// Block until the key is free or `max_wait` elapses, without busy spinning.
    /// Returns false on timeout.
    async fn wait_until_free(&self, lock_key: &str, max_wait: Duration) -> Result<bool>;

    async fn is_held(&self, lock_key: &str) -> Result<bool>;
}

/// Port for the authoritative category records
#[async_trait]
pub trait CategoryRepository: Send + Sync + 'static {
    /// All categories ordered by id
    async fn list_all(&self) -> Result<Vec<Category>>;
    async fn find(&self, id: u64) -> Result<Option<Category>>;
    /// Fails with Error::Conflict when name or slug is taken
    async fn insert(&self, fields: NewCategory) -> Result<Category>;
    /// Fails with Error::NotFound or Error::Conflict
    async fn update(&self, id: u64, changes: CategoryChanges) -> Result<Category>;
    async fn delete(&self, id: u64) -> Result<bool>;
}
