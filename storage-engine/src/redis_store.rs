use async_trait::async_trait;
use larder::domain::{LockLease, deadline_after};
use larder::domain::response::{DeleteResponse, PutResponse};
use larder::ports::{CacheStore, LockStore};
use rand::Rng;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Deletes the lock only if it still carries the caller's token
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const POLL_BASE: Duration = Duration::from_millis(25);
const POLL_MAX: Duration = Duration::from_millis(500);
const JITTER_MAX_MS: u64 = 20;

/// Open a managed (auto-reconnecting) connection shared by the Redis stores
pub async fn connect(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url)
        .map_err(|e| Error::InvalidArgument(format!("invalid redis url '{}': {}", url, e)))?;
    let manager = ConnectionManager::new(client).await.map_err(unavailable)?;
    info!("Connected to redis at {}", url);
    Ok(manager)
}

fn unavailable(err: redis::RedisError) -> Error {
    Error::infrastructure(format!("redis: {}", err))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn jitter() -> Duration {
    Duration::from_millis(rand::rng().random_range(0..=JITTER_MAX_MS))
}

/// Redis-backed cache store. Values are stored as JSON with a millisecond TTL.
pub struct RedisCacheStore<V> {
    conn: ConnectionManager,
    _value: PhantomData<fn() -> V>,
}

impl<V> RedisCacheStore<V> {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            _value: PhantomData,
        }
    }

    // One round trip, GET and PTTL are taken atomically
    async fn fetch(&self, key: &str) -> Result<(Option<String>, i64)> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .get(key)
            .pttl(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)
    }
}

impl<V> std::fmt::Debug for RedisCacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore").finish()
    }
}

/// PTTL is -2 for a missing key and -1 for a key without expiry.
/// Keys without expiry are treated as absent.
fn live_ttl(pttl: i64) -> Option<Duration> {
    u64::try_from(pttl)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

#[async_trait]
impl<V> CacheStore<V> for RedisCacheStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn has(&self, key: &str) -> Result<bool> {
        let (payload, pttl) = self.fetch(key).await?;
        Ok(payload.is_some() && live_ttl(pttl).is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        let (payload, pttl) = self.fetch(key).await?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        if live_ttl(pttl).is_none() {
            debug!(key, "ignoring cache entry without expiry");
            return Ok(None);
        }

        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|e| Error::Internal(format!("Failed to deserialize cached value: {}", e)))
    }

    async fn put(&self, key: &str, value: V, ttl: Duration) -> Result<PutResponse> {
        let payload = serde_json::to_string(&value)
            .map_err(|e| Error::Internal(format!("Failed to serialize cached value: {}", e)))?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .pset_ex(key, payload, millis(ttl))
            .await
            .map_err(unavailable)?;
        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn forget(&self, key: &str) -> Result<DeleteResponse> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await.map_err(unavailable)?;
        Ok(DeleteResponse::new(removed > 0))
    }

    async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let pttl: i64 = conn.pttl(key).await.map_err(unavailable)?;
        Ok(live_ttl(pttl))
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Redis lease locks: `SET NX PX` to acquire, token-checked delete to release.
/// Safe to share between processes.
#[derive(Clone)]
pub struct RedisLockStore {
    conn: ConnectionManager,
}

impl RedisLockStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore").finish()
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn try_acquire(&self, lock_key: &str, lease: Duration) -> Result<Option<LockLease>> {
        let grant = LockLease::new(lock_key, lease);
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(lock_key)
            .arg(&grant.token)
            .arg("NX")
            .arg("PX")
            .arg(millis(lease))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(reply.map(|_| grant))
    }

    async fn release(&self, lease: &LockLease) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&lease.key)
            .arg(&lease.token)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(removed == 1)
    }

    async fn wait_until_free(&self, lock_key: &str, max_wait: Duration) -> Result<bool> {
        let deadline = deadline_after(max_wait).ok_or_else(|| {
            Error::InvalidArgument(format!("wait of {:?} is too long", max_wait))
        })?;
        let mut backoff = POLL_BASE;

        loop {
            if !self.is_held(lock_key).await? {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }

            let pause = (backoff + jitter()).min(deadline - now);
            tokio::time::sleep(pause).await;
            backoff = (backoff * 2).min(POLL_MAX);
        }
    }

    async fn is_held(&self, lock_key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(lock_key).await.map_err(unavailable)
    }
}
