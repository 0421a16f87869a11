//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, product-tuned thresholds)
//! - The [`Config`] struct shared by the CLI and the library

mod constants;
mod types;

pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
