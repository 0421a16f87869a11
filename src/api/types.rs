//! API request and response bodies.

use serde::{Deserialize, Serialize};

use crate::intelligence::{FilterOutcome, SearchResult};
use crate::models::{BatchSummary, DmcaQueueItem, IntelligenceData};
use crate::notice::{ComparisonItem, Notice, NoticeContact, NoticeQuality};
use crate::queue::{BatchAttestation, BatchItemInput};
use crate::targets::{EnforcementTarget, TargetType};

#[derive(Debug, Deserialize)]
pub struct GenerateNoticeRequest {
    pub infringement_id: String,
    /// Overrides the contact stored in the copyright profile
    #[serde(default)]
    pub contact: Option<NoticeContact>,
    /// Addressee; the recommended target when absent
    #[serde(default)]
    pub target: Option<TargetType>,
    #[serde(default)]
    pub evidence_items: Vec<String>,
    #[serde(default)]
    pub comparison_items: Vec<ComparisonItem>,
}

#[derive(Debug, Serialize)]
pub struct GenerateNoticeResponse {
    pub notice: Notice,
    pub quality: NoticeQuality,
    pub enforcement_targets: Vec<EnforcementTarget>,
}

#[derive(Debug, Deserialize)]
pub struct BulkSubmitRequest {
    pub items: Vec<BatchItemInput>,
    #[serde(flatten)]
    pub attestation: BatchAttestation,
}

#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub summary: BatchSummary,
    pub items: Vec<DmcaQueueItem>,
}

#[derive(Debug, Serialize)]
pub struct CancelBatchResponse {
    pub batch_id: String,
    pub skipped: u64,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub product_id: String,
    pub results: Vec<SearchResult>,
    /// Overrides the configured pass threshold for this request
    #[serde(default)]
    pub min_confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub results: Vec<FilterOutcome>,
    pub kept: usize,
    pub filtered: usize,
    pub uncertain: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct IntelligenceQuery {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntelligenceResponse {
    pub product_id: String,
    pub intelligence: IntelligenceData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamps_available: bool,
}
