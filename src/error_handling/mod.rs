//! Error handling.
//!
//! This module provides:
//! - Error type definitions per concern (database, LLM, notary, delivery, batches)
//! - Retry strategy configuration and retriability classification

mod categorization;
mod types;

pub use categorization::{get_retry_strategy, is_retriable_error};
pub use types::{
    BatchError, DatabaseError, DeliveryError, InitializationError, LlmError, NotaryError,
    PipelineError,
};
