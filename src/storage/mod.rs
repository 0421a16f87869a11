// storage/mod.rs
// Database operations module

pub mod infringements;
pub mod migrations;
pub mod patterns;
pub mod pool;
pub mod products;
pub mod queue;
pub mod snapshots;
mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
