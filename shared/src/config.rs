use std::time::Duration;
use tracing::warn;

/// Where the list cache and its lock live
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,        // in-process moka cache + local lease locks
    Redis(String), // connection url
}

impl CacheBackend {
    pub fn name(&self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis(_) => "redis",
        }
    }

    /// Only a shared backend serializes loads across processes
    pub fn is_multi_process(&self) -> bool {
        matches!(self, CacheBackend::Redis(_))
    }
}

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    pub cache_backend: CacheBackend,
    pub list_cache_key: String,
    pub list_ttl: Duration,
    pub lock_lease: Duration,
    pub simulated_load_delay: Duration,
}

impl Config {
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_LIST_CACHE_KEY: &str = "categories.all";
    const DEFAULT_LIST_TTL_SECS: u64 = 60;
    const DEFAULT_LOCK_LEASE_SECS: u64 = 5;

    pub fn from_env() -> Self {
        let host = std::env::var("LARDER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let http_port = std::env::var("LARDER_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .unwrap_or(8080);

        let cache_backend = match std::env::var("LARDER_CACHE_BACKEND").as_deref() {
            Ok("redis") => match std::env::var("LARDER_REDIS_URL") {
                Ok(url) => CacheBackend::Redis(url),
                Err(_) => {
                    warn!("LARDER_CACHE_BACKEND=redis but LARDER_REDIS_URL not set, using redis://127.0.0.1/");
                    CacheBackend::Redis("redis://127.0.0.1/".to_string())
                }
            },
            Ok("memory") | Err(_) => CacheBackend::Memory,
            Ok(other) => {
                warn!("Unknown LARDER_CACHE_BACKEND '{}', falling back to memory", other);
                CacheBackend::Memory
            }
        };

        Self {
            host,
            http_port,
            data_dir: std::env::var("LARDER_DATA_DIR")
                .unwrap_or_else(|_| Self::DEFAULT_DATA_DIR.to_string()),
            cache_backend,
            list_cache_key: std::env::var("LARDER_LIST_CACHE_KEY")
                .unwrap_or_else(|_| Self::DEFAULT_LIST_CACHE_KEY.to_string()),
            list_ttl: Duration::from_secs(secs_from_env(
                "LARDER_LIST_TTL_SECS",
                Self::DEFAULT_LIST_TTL_SECS,
            )),
            lock_lease: Duration::from_secs(secs_from_env(
                "LARDER_LOCK_LEASE_SECS",
                Self::DEFAULT_LOCK_LEASE_SECS,
            )),
            simulated_load_delay: Duration::from_millis(
                std::env::var("LARDER_SIMULATED_LOAD_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0),
            ),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

// Zero is rejected by the guard, so fall back to the default instead
fn secs_from_env(var: &str, default: u64) -> u64 {
    match std::env::var(var).ok().map(|v| v.parse::<u64>()) {
        Some(Ok(secs)) if secs > 0 => secs,
        Some(_) => {
            warn!("{} must be a positive integer, using default {}", var, default);
            default
        }
        None => default,
    }
}
