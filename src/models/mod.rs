//! Data model shared by the pipeline components.
//!
//! Enum values serialize to the snake_case strings stored in the database, and
//! JSON columns (evidence, infrastructure, extracted product data) are typed
//! records rather than free-form maps.

mod evidence;
mod infringement;
mod learning;
mod product;
mod queue;

pub use evidence::{
    Attestation, CustodyEntry, DetectionMetadata, EvidencePacket, EvidenceSnapshot,
    MatchedExcerpt, Screenshot, ScreenshotStorage, SnapshotContent, TimestampProof,
    TimestampStatus,
};
pub use infringement::{InfrastructureSnapshot, Infringement, InfringementStatus};
pub use learning::{IntelligenceData, LearningPattern, PatternType};
pub use product::{AiExtractedData, CopyrightProfile, Product, AI_EXTRACTED_DATA_VERSION};
pub use queue::{BatchSummary, DeliveryMethod, DmcaQueueItem, QueueStatus};
