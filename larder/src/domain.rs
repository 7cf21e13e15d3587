use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub mod response {

    #[derive(Clone, Debug)]
    pub struct PutResponse {
        pub created: bool,
        pub message: String,
    }

    impl PutResponse {
        pub fn new(created: bool, message: impl Into<String>) -> Self {
            Self {
                created,
                message: message.into(),
            }
        }
    }

    #[derive(Clone, Debug)]
    pub struct DeleteResponse {
        pub deleted: bool,
    }

    impl DeleteResponse {
        pub fn new(deleted: bool) -> Self {
            Self { deleted }
        }
    }
}

/// Prefix applied to a cache key to derive the key of its repopulation lock
pub const LOCK_KEY_PREFIX: &str = "lock:";

pub fn lock_key_for(cache_key: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{cache_key}")
}

/// The instant `duration` from now, None when that is past what `Instant` can represent
pub fn deadline_after(duration: Duration) -> Option<Instant> {
    Instant::now().checked_add(duration)
}

/// A cached value together with its expiry.
/// An entry with no expiry recorded is treated as absent.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: deadline_after(ttl),
        }
    }

    pub fn is_live(&self) -> bool {
        self.expires_at.is_some_and(|at| at > Instant::now())
    }

    /// Time left before expiry, None once expired or if no expiry was recorded
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|at| at.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }
}

/// A time-bounded ownership grant on a lock key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockLease {
    pub key: String,
    pub token: String, // unique per acquisition attempt
    pub lease: Duration,
    pub acquired_at: Instant,
}

impl LockLease {
    pub fn new(key: impl Into<String>, lease: Duration) -> Self {
        Self {
            key: key.into(),
            token: uuid::Uuid::new_v4().to_string(),
            lease,
            acquired_at: Instant::now(),
        }
    }

    /// Whether the lease has run out, after which another caller may hold the key
    pub fn has_lapsed(&self) -> bool {
        self.acquired_at.elapsed() >= self.lease
    }
}

/// Where the value returned by a guarded read ultimately came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadSource {
    /// Served from the cache
    Cache,
    /// Freshly produced by the loader under the lock
    Loader,
    /// The bounded wait elapsed and the cache was still empty
    Absent,
}

impl ReadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadSource::Cache => "cache",
            ReadSource::Loader => "database",
            ReadSource::Absent => "absent",
        }
    }
}

/// Outcome of `CachedListGuard::get`. Everything except `value` is
/// diagnostic and must not drive caller behaviour.
#[derive(Clone, Debug)]
pub struct GuardedRead<V> {
    pub value: Option<V>,
    pub source: ReadSource,
    pub had_value_initially: bool,
    pub ttl_remaining: Option<Duration>,
    pub cache_backend: &'static str,
}

impl<V> GuardedRead<V> {
    pub fn from_cache(&self) -> bool {
        self.source == ReadSource::Cache
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub slug: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(id: u64, fields: NewCategory) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: fields.name,
            description: fields.description,
            slug: fields.slug,
            is_active: fields.is_active,
            sort_order: fields.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: CategoryChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(slug) = changes.slug {
            self.slug = slug;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        if let Some(sort_order) = changes.sort_order {
            self.sort_order = sort_order;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub slug: String,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Partial update, unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
