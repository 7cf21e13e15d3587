pub mod requests;
pub mod responses;

pub use requests::{CreateCategoryRequest, UpdateCategoryRequest};
pub use responses::{
    CategoryListResponse, CategoryResponse, DeleteCategoryResponse, ErrorResponse, HealthResponse,
};
