//! Bulk DMCA queue.
//!
//! This module provides:
//! - Signed batch creation with per-user cooldown and email staggering
//! - Delivery of due email items with bounded retries
//! - A background worker that can be woken when a batch is queued
//! - Batch progress summaries

mod batch;
mod delivery;
mod processor;
mod scheduler;
mod summary;

pub use batch::{
    cancel_batch, create_batch, signature_block, stagger_schedule, BatchAttestation,
    BatchItemInput, BatchLimits, BatchReceipt,
};
pub use delivery::{HttpMailer, Mailer};
pub use processor::{ProcessStats, QueueProcessor};
pub use scheduler::{spawn_queue_scheduler, QueueKicker};
pub use summary::{load_batch, summarize_batch};
