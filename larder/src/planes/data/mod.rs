pub mod guarded_list;

pub use guarded_list::CachedListGuard;
