//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger
//! - HTTP clients (general and redirect-tracing)
//!
//! The database pool lives in [`crate::storage`] and the assembled service
//! context in [`crate::app`].

mod client;
mod logger;

pub use client::{init_client, init_redirect_client};
pub use logger::init_logger_with;
