use crate::domain::{Category, CategoryChanges, GuardedRead, NewCategory, ReadSource};
use crate::planes::control::operation::CategoryOperations;
use crate::planes::data::CachedListGuard;
use crate::ports::CategoryRepository;
use async_trait::async_trait;
use shared::config::Config;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How the category list is cached
#[derive(Clone, Debug)]
pub struct ListSettings {
    pub cache_key: String,
    pub ttl: Duration,
    pub lock_lease: Duration,
    /// Extra latency added to every list load, for exercising the guard by hand
    pub simulated_load_delay: Duration,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            cache_key: "categories.all".to_string(),
            ttl: Duration::from_secs(60),
            lock_lease: Duration::from_secs(5),
            simulated_load_delay: Duration::ZERO,
        }
    }
}

impl ListSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_key: config.list_cache_key.clone(),
            ttl: config.list_ttl,
            lock_lease: config.lock_lease,
            simulated_load_delay: config.simulated_load_delay,
        }
    }
}

/// Application service for categories.
/// This is the only writer of the cached category list.
#[derive(Clone)]
pub struct CategoryOperationsService {
    repository: Arc<dyn CategoryRepository>,
    guard: CachedListGuard<Vec<Category>>,
    settings: ListSettings,
}

impl CategoryOperationsService {
    pub fn new(
        repository: Arc<dyn CategoryRepository>,
        guard: CachedListGuard<Vec<Category>>,
        settings: ListSettings,
    ) -> Self {
        Self {
            repository,
            guard,
            settings,
        }
    }

    pub fn settings(&self) -> &ListSettings {
        &self.settings
    }

    async fn invalidate_list(&self) -> Result<()> {
        self.guard.invalidate(&self.settings.cache_key).await
    }
}

impl std::fmt::Debug for CategoryOperationsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryOperationsService")
            .field("guard", &self.guard)
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl CategoryOperations for CategoryOperationsService {
    async fn list(&self) -> Result<GuardedRead<Vec<Category>>> {
        let repository = Arc::clone(&self.repository);
        let delay = self.settings.simulated_load_delay;

        self.guard
            .get(
                &self.settings.cache_key,
                move || async move {
                    if !delay.is_zero() {
                        debug!("simulating slow category query ({:?})", delay);
                        tokio::time::sleep(delay).await;
                    }
                    repository.list_all().await
                },
                self.settings.ttl,
                self.settings.lock_lease,
            )
            .await
    }

    /// Served from the cached list. If the list is unavailable after the bounded
    /// wait, the record is read from the repository directly.
    async fn show(&self, id: u64) -> Result<GuardedRead<Category>> {
        let read = self.list().await?;

        let (category, source) = match read.value {
            Some(categories) => (categories.into_iter().find(|c| c.id == id), read.source),
            None => (self.repository.find(id).await?, ReadSource::Loader),
        };

        Ok(GuardedRead {
            value: Some(category.ok_or(Error::NotFound)?),
            source,
            had_value_initially: read.had_value_initially,
            ttl_remaining: read.ttl_remaining,
            cache_backend: read.cache_backend,
        })
    }

    async fn create(&self, fields: NewCategory) -> Result<Category> {
        let category = self.repository.insert(fields).await?;
        info!(id = category.id, slug = %category.slug, "category created");
        self.invalidate_list().await?;
        Ok(category)
    }

    async fn update(&self, id: u64, changes: CategoryChanges) -> Result<Category> {
        let category = self.repository.update(id, changes).await?;
        info!(id, "category updated");
        self.invalidate_list().await?;
        Ok(category)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        if !self.repository.delete(id).await? {
            return Err(Error::NotFound);
        }
        info!(id, "category deleted");
        self.invalidate_list().await
    }
}
