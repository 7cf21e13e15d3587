use crate::api::{
    CategoryListResponse, CategoryResponse, CreateCategoryRequest, DeleteCategoryResponse,
    ErrorResponse, UpdateCategoryRequest,
};
use crate::handlers::error::{ApiError, api_error, not_found};
use crate::state::AppState;
use crate::validation::CategoryRequestValidator;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
};
use larder::planes::control::CategoryOperations;
use tracing::info;

const INVALID_DATA: &str = "The given data was invalid";

fn bad_body(rejection: JsonRejection) -> ApiError {
    (
        rejection.status(),
        Json(ErrorResponse::new(INVALID_DATA, Some(rejection.body_text()))),
    )
}

// Non-numeric ids cannot name a category
fn category_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| not_found())
}

/// GET /categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let read = state
        .category_operations
        .list()
        .await
        .map_err(|e| api_error(e, "Failed to retrieve categories"))?;

    info!(
        source = read.source.as_str(),
        had_value_initially = read.had_value_initially,
        "LIST categories"
    );
    Ok(Json(read.into()))
}

/// POST /categories
pub async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let Json(req) = body.map_err(bad_body)?;
    let fields = CategoryRequestValidator::for_create(req)
        .map_err(|e| api_error(e.into(), INVALID_DATA))?;

    info!("CREATE category: slug={}", fields.slug);

    let category = state
        .category_operations
        .create(fields)
        .await
        .map_err(|e| api_error(e, "Failed to create category"))?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse::new("Category created successfully", category)),
    ))
}

/// GET /categories/{id}
pub async fn show_category(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let id = category_id(path)?;

    let read = state
        .category_operations
        .show(id)
        .await
        .map_err(|e| match e {
            shared::Error::NotFound => not_found(),
            other => api_error(other, "Failed to retrieve category"),
        })?;

    let source = read.source.as_str();
    let category = read.value.ok_or_else(not_found)?;

    Ok(Json(CategoryResponse {
        source: Some(source),
        ..CategoryResponse::new("Category retrieved successfully", category)
    }))
}

/// PUT /categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let id = category_id(path)?;
    let Json(req) = body.map_err(bad_body)?;
    let changes = CategoryRequestValidator::for_update(req)
        .map_err(|e| api_error(e.into(), INVALID_DATA))?;

    info!("UPDATE category: id={}", id);

    let category = state
        .category_operations
        .update(id, changes)
        .await
        .map_err(|e| match e {
            shared::Error::NotFound => not_found(),
            other => api_error(other, "Failed to update category"),
        })?;

    Ok(Json(CategoryResponse::new(
        "Category updated successfully",
        category,
    )))
}

/// DELETE /categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeleteCategoryResponse>, ApiError> {
    let id = category_id(path)?;

    info!("DELETE category: id={}", id);

    state
        .category_operations
        .delete(id)
        .await
        .map_err(|e| match e {
            shared::Error::NotFound => not_found(),
            other => api_error(other, "Failed to delete category"),
        })?;

    Ok(Json(DeleteCategoryResponse {
        success: true,
        message: "Category deleted successfully".into(),
    }))
}
