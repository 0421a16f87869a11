//! Service assembly.
//!
//! This module provides the shared context handed to request handlers and
//! jobs, the background tasks of the server, and shutdown handling.

mod context;
mod shutdown;
mod tasks;

pub use context::AppContext;
pub use shutdown::{shutdown_gracefully, shutdown_signal};
pub use tasks::{spawn_background_tasks, spawn_timestamp_upgrader, TIMESTAMP_UPGRADE_BATCH};
