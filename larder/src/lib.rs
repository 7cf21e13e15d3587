#![deny(clippy::all)]

pub mod domain;
pub mod persistence;
pub mod planes;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use domain::{Category, CategoryChanges, GuardedRead, NewCategory, ReadSource};
pub use planes::control::{CategoryOperationsService, ListSettings};
pub use planes::data::CachedListGuard;
