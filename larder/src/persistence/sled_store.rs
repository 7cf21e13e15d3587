use crate::domain::{Category, CategoryChanges, NewCategory};
use crate::ports::CategoryRepository;
use async_trait::async_trait;
use shared::{Error, Result};
use std::path::Path;
use tokio::sync::Mutex;

const CATEGORIES_TREE: &str = "categories";

/// Sled-based store for category records
pub struct SledCategoryRepository {
    db: sled::Db,
    categories: sled::Tree,
    // Serializes uniqueness checks with the write that follows them
    write_lock: Mutex<()>,
}

impl SledCategoryRepository {
    /// Open (or create) the category store at `path`
    /// Creates the parent directory if it doesn't exist
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Internal(format!("Failed to open Sled database: {}", e)))?;
        Self::from_db(db)
    }

    /// Throwaway store that is removed on drop
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| Error::Internal(format!("Failed to open Sled database: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let categories = db
            .open_tree(CATEGORIES_TREE)
            .map_err(|e| Error::Internal(format!("Failed to open categories tree: {}", e)))?;

        Ok(Self {
            db,
            categories,
            write_lock: Mutex::new(()),
        })
    }

    fn load_all(&self) -> Result<Vec<Category>> {
        let mut categories = Vec::new();

        // Big-endian keys keep iteration in id order
        for item in self.categories.iter() {
            let (_, value) = item
                .map_err(|e| Error::Internal(format!("Failed to iterate categories: {}", e)))?;
            categories.push(decode(&value)?);
        }

        Ok(categories)
    }

    fn store(&self, category: &Category) -> Result<()> {
        let value = serde_json::to_vec(category)
            .map_err(|e| Error::Internal(format!("Failed to serialize category: {}", e)))?;

        self.categories
            .insert(category.id.to_be_bytes(), value)
            .map_err(|e| Error::Internal(format!("Failed to save category: {}", e)))?;

        self.categories
            .flush()
            .map_err(|e| Error::Internal(format!("Failed to flush database: {}", e)))?;

        Ok(())
    }

    fn ensure_unique(&self, name: Option<&str>, slug: Option<&str>, except: Option<u64>) -> Result<()> {
        for existing in self.load_all()? {
            if Some(existing.id) == except {
                continue;
            }
            if name.is_some_and(|name| existing.name == name) {
                return Err(Error::Conflict(format!("name '{}' is already taken", existing.name)));
            }
            if slug.is_some_and(|slug| existing.slug == slug) {
                return Err(Error::Conflict(format!("slug '{}' is already taken", existing.slug)));
            }
        }
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<Category> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::Internal(format!("Failed to deserialize category: {}", e)))
}

#[async_trait]
impl CategoryRepository for SledCategoryRepository {
    async fn list_all(&self) -> Result<Vec<Category>> {
        self.load_all()
    }

    async fn find(&self, id: u64) -> Result<Option<Category>> {
        let value = self
            .categories
            .get(id.to_be_bytes())
            .map_err(|e| Error::Internal(format!("Failed to read category: {}", e)))?;

        value.map(|bytes| decode(&bytes)).transpose()
    }

    async fn insert(&self, fields: NewCategory) -> Result<Category> {
        let _write = self.write_lock.lock().await;
        self.ensure_unique(Some(&fields.name), Some(&fields.slug), None)?;

        // generate_id starts at 0, ids start at 1
        let id = self
            .db
            .generate_id()
            .map_err(|e| Error::Internal(format!("Failed to allocate id: {}", e)))?
            + 1;

        let category = Category::new(id, fields);
        self.store(&category)?;
        Ok(category)
    }

    async fn update(&self, id: u64, changes: CategoryChanges) -> Result<Category> {
        let _write = self.write_lock.lock().await;
        let mut category = self.find(id).await?.ok_or(Error::NotFound)?;
        self.ensure_unique(changes.name.as_deref(), changes.slug.as_deref(), Some(id))?;

        category.apply(changes);
        self.store(&category)?;
        Ok(category)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let _write = self.write_lock.lock().await;
        let removed = self
            .categories
            .remove(id.to_be_bytes())
            .map_err(|e| Error::Internal(format!("Failed to delete category: {}", e)))?
            .is_some();

        self.categories
            .flush()
            .map_err(|e| Error::Internal(format!("Failed to flush database: {}", e)))?;

        Ok(removed)
    }
}
