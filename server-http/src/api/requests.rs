use serde::Deserialize;

// Every field is optional at the wire level so that missing fields are
// reported by validation with the field name, not by the JSON extractor.

#[derive(Debug, Default, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Partial update, absent fields stay as they are
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}
