use larder::persistence::SledCategoryRepository;
use larder::{CachedListGuard, Category, CategoryOperationsService, ListSettings};
use shared::config::Config;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub category_operations: Arc<CategoryOperationsService>,
}

impl AppState {
    pub fn new(category_operations: Arc<CategoryOperationsService>) -> Self {
        Self {
            category_operations,
        }
    }

    /// Open the category store and the configured cache backend
    pub async fn from_config(config: &Config) -> shared::Result<Self> {
        let db_path = Path::new(&config.data_dir).join("categories.sled");
        let repository = Arc::new(SledCategoryRepository::new(&db_path)?);
        info!("Category store opened at {}", db_path.display());

        let (cache, locks) =
            storage_engine::build_stores::<Vec<Category>>(&config.cache_backend).await?;
        let guard = CachedListGuard::new(cache, locks);

        let service =
            CategoryOperationsService::new(repository, guard, ListSettings::from_config(config));

        let settings = service.settings();
        info!(
            cache_key = %settings.cache_key,
            ttl_secs = settings.ttl.as_secs(),
            lease_secs = settings.lock_lease.as_secs(),
            backend = config.cache_backend.name(),
            "Category list cache configured"
        );
        Ok(Self::new(Arc::new(service)))
    }
}
