use async_trait::async_trait;

use shared::Result;

use crate::domain::{Category, CategoryChanges, GuardedRead, NewCategory};

/// Application-level category operations.
/// Reads go through the stampede guard; every write invalidates the cached list.
#[async_trait]
pub trait CategoryOperations: Send + Sync + 'static {
    async fn list(&self) -> Result<GuardedRead<Vec<Category>>>;
    async fn show(&self, id: u64) -> Result<GuardedRead<Category>>;
    async fn create(&self, fields: NewCategory) -> Result<Category>;
    async fn update(&self, id: u64, changes: CategoryChanges) -> Result<Category>;
    async fn delete(&self, id: u64) -> Result<()>;
}
