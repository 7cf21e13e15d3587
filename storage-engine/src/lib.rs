pub mod local_lock;
pub mod moka_cache;
pub mod redis_store;

pub use local_lock::LocalLockStore;
pub use moka_cache::MokaCacheStore;
pub use redis_store::{RedisCacheStore, RedisLockStore};

use larder::ports::{CacheStore, LockStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::Result;
use shared::config::CacheBackend;
use std::sync::Arc;
use tracing::{info, warn};

/// A cache store paired with the lock store that must guard it
pub type StorePair<V> = (Arc<dyn CacheStore<V>>, Arc<dyn LockStore>);

/// Build the cache and lock stores for the configured backend.
///
/// Both stores of a pair share one backend, so the lock is always visible to
/// every process that can see the cache.
pub async fn build_stores<V>(backend: &CacheBackend) -> Result<StorePair<V>>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    match backend {
        CacheBackend::Memory => {
            warn!(
                "Using in-process cache and locks, stampede protection only covers this process"
            );
            Ok((
                Arc::new(MokaCacheStore::<V>::new_unbounded()),
                Arc::new(LocalLockStore::new()),
            ))
        }
        CacheBackend::Redis(url) => {
            let conn = redis_store::connect(url).await?;
            info!("Using redis cache and locks");
            Ok((
                Arc::new(RedisCacheStore::<V>::new(conn.clone())),
                Arc::new(RedisLockStore::new(conn)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_backend_builds_local_stores() {
        let (cache, locks) = build_stores::<Vec<String>>(&CacheBackend::Memory)
            .await
            .unwrap();
        assert_eq!(cache.backend(), "memory");

        let lease = locks
            .try_acquire("lock:k", Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert!(locks.is_held("lock:k").await.unwrap());
        assert!(locks.release(&lease).await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_redis_url_fails_to_build() {
        let result = build_stores::<Vec<String>>(&CacheBackend::Redis("nope".into())).await;
        assert!(result.is_err());
    }
}
