use larder::{Category, GuardedRead};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub message: String,
}

/// Body of `GET /categories`. Everything but `categories` is diagnostic.
#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub source: &'static str,
    pub had_value_initially: bool,
    pub from_cache: bool,
    pub ttl_remaining_seconds: Option<u64>,
    pub cache_store: &'static str,
    /// Null when the bounded wait ran out before the list was cached
    pub categories: Option<Vec<Category>>,
}

impl From<GuardedRead<Vec<Category>>> for CategoryListResponse {
    fn from(read: GuardedRead<Vec<Category>>) -> Self {
        Self {
            source: read.source.as_str(),
            had_value_initially: read.had_value_initially,
            // whether the cache holds the list after this read, true after a fresh load too
            from_cache: read.value.is_some(),
            ttl_remaining_seconds: read.ttl_remaining.map(|left| left.as_secs()),
            cache_store: read.cache_backend,
            categories: read.value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    pub success: bool,
    pub message: String,
    pub category: Category,
}

impl CategoryResponse {
    pub fn new(message: impl Into<String>, category: Category) -> Self {
        Self {
            source: None,
            success: true,
            message: message.into(),
            category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteCategoryResponse {
    pub success: bool,
    pub message: String,
}

// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error,
        }
    }
}
