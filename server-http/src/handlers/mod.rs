pub mod categories;
pub mod error;
pub mod health;

pub use categories::{
    create_category, delete_category, list_categories, show_category, update_category,
};
pub use health::health_check;
