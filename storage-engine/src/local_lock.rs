use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use larder::domain::{LockLease, deadline_after};
use larder::ports::LockStore;
use shared::{Error, Result};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::debug;

/// Base interval between lock checks while waiting
const POLL_BASE: Duration = Duration::from_millis(10);

/// Upper bound on the interval between lock checks
const POLL_MAX: Duration = Duration::from_millis(250);

fn too_long(what: &str, duration: Duration) -> Error {
    Error::InvalidArgument(format!("{} of {:?} is too long", what, duration))
}

#[derive(Debug)]
struct Holder {
    token: String,
    expires_at: Instant,
}

impl Holder {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process lease lock store.
///
/// Only serializes callers inside one process. Deployments running several
/// worker processes must use `RedisLockStore` instead.
#[derive(Debug, Default)]
pub struct LocalLockStore {
    holders: DashMap<String, Holder>,
    // Wakes waiters on every release
    released: Notify,
}

impl LocalLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self, lock_key: &str) -> bool {
        self.holders
            .get(lock_key)
            .is_some_and(|holder| holder.is_live(Instant::now()))
    }
}

#[async_trait]
impl LockStore for LocalLockStore {
    async fn try_acquire(&self, lock_key: &str, lease: Duration) -> Result<Option<LockLease>> {
        let now = Instant::now();
        let expires_at = now.checked_add(lease).ok_or_else(|| too_long("lease", lease))?;
        let grant = LockLease::new(lock_key, lease);
        let holder = Holder {
            token: grant.token.clone(),
            expires_at,
        };

        match self.holders.entry(lock_key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    return Ok(None);
                }
                debug!(lock_key, "taking over expired lease");
                occupied.insert(holder);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(holder);
            }
        }

        Ok(Some(grant))
    }

    async fn release(&self, lease: &LockLease) -> Result<bool> {
        let removed = self
            .holders
            .remove_if(&lease.key, |_, holder| holder.token == lease.token)
            .is_some();

        if removed {
            self.released.notify_waiters();
        }
        Ok(removed)
    }

    async fn wait_until_free(&self, lock_key: &str, max_wait: Duration) -> Result<bool> {
        let deadline = deadline_after(max_wait).ok_or_else(|| too_long("wait", max_wait))?;
        let mut backoff = POLL_BASE;

        loop {
            // Register before checking so a release in between is not missed
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.held(lock_key) {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }

            // Leases can also lapse without a release, so poll as well
            let pause = backoff.min(deadline - now);
            let _ = tokio::time::timeout(pause, notified).await;
            backoff = (backoff * 2).min(POLL_MAX);
        }
    }

    async fn is_held(&self, lock_key: &str) -> Result<bool> {
        Ok(self.held(lock_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const LEASE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_second_acquire_fails_while_held() {
        let locks = LocalLockStore::new();

        let first = locks.try_acquire("lock:k", LEASE).await.unwrap();
        assert!(first.is_some());
        assert!(locks.try_acquire("lock:k", LEASE).await.unwrap().is_none());
        assert!(locks.is_held("lock:k").await.unwrap());

        // other keys are independent
        assert!(locks.try_acquire("lock:other", LEASE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_release_frees_the_key() {
        let locks = LocalLockStore::new();
        let lease = locks.try_acquire("lock:k", LEASE).await.unwrap().unwrap();

        assert!(locks.release(&lease).await.unwrap());
        assert!(!locks.is_held("lock:k").await.unwrap());
        assert!(locks.try_acquire("lock:k", LEASE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stale_token_cannot_release_new_holder() {
        let locks = LocalLockStore::new();
        let stale = locks
            .try_acquire("lock:k", Duration::from_millis(30))
            .await
            .unwrap()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let current = locks.try_acquire("lock:k", LEASE).await.unwrap();
        assert!(current.is_some(), "expired lease should be taken over");

        assert!(!locks.release(&stale).await.unwrap());
        assert!(locks.is_held("lock:k").await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_returns_when_released() {
        let locks = Arc::new(LocalLockStore::new());
        let lease = locks.try_acquire("lock:k", LEASE).await.unwrap().unwrap();

        let releaser = {
            let locks = locks.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                locks.release(&lease).await.unwrap();
            })
        };

        let started = Instant::now();
        let freed = locks.wait_until_free("lock:k", LEASE).await.unwrap();
        releaser.await.unwrap();

        assert!(freed);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_times_out_on_stuck_holder() {
        let locks = LocalLockStore::new();
        locks.try_acquire("lock:k", Duration::from_secs(30)).await.unwrap();

        let started = Instant::now();
        let freed = locks
            .wait_until_free("lock:k", Duration::from_millis(100))
            .await
            .unwrap();

        assert!(!freed);
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_oversized_durations_are_rejected() {
        let locks = LocalLockStore::new();
        let huge = Duration::from_secs(u64::MAX);

        let acquire = locks.try_acquire("lock:k", huge).await;
        assert!(matches!(acquire, Err(Error::InvalidArgument(_))));
        assert!(!locks.is_held("lock:k").await.unwrap());

        locks.try_acquire("lock:k", LEASE).await.unwrap();
        let wait = locks.wait_until_free("lock:k", huge).await;
        assert!(matches!(wait, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_wait_ends_when_lease_lapses() {
        let locks = LocalLockStore::new();
        locks
            .try_acquire("lock:k", Duration::from_millis(50))
            .await
            .unwrap();

        let freed = locks.wait_until_free("lock:k", LEASE).await.unwrap();
        assert!(freed);
    }
}
