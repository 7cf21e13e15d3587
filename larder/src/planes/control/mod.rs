pub mod category_operations;
pub mod operation;

pub use category_operations::{CategoryOperationsService, ListSettings};
pub use operation::CategoryOperations;
