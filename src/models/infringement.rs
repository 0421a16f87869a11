//! Infringement records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::evidence::EvidencePacket;

/// Lifecycle of a detected infringement.
///
/// ```text
/// pending_verification ─┬─> active ─┬─> takedown_sent ─┬─> removed
///                       │           │                  └─> disputed ─> takedown_sent | removed
///                       └─> false_positive <─┘
/// ```
/// Any non-terminal state may also be archived. Records are never deleted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InfringementStatus {
    PendingVerification,
    Active,
    FalsePositive,
    TakedownSent,
    Removed,
    Disputed,
    Archived,
}

impl InfringementStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InfringementStatus::Removed
                | InfringementStatus::FalsePositive
                | InfringementStatus::Archived
        )
    }

    /// Whether a notice may be generated for an infringement in this state.
    pub fn allows_notice(self) -> bool {
        matches!(
            self,
            InfringementStatus::Active | InfringementStatus::TakedownSent
        )
    }

    pub fn can_transition_to(self, next: InfringementStatus) -> bool {
        use InfringementStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Archived) => true,
            (PendingVerification, Active | FalsePositive) => true,
            (Active, TakedownSent | FalsePositive | Removed) => true,
            (TakedownSent, Removed | Disputed | TakedownSent) => true,
            (Disputed, TakedownSent | Removed) => true,
            _ => false,
        }
    }
}

/// Hosting and registration details captured when the infringement was detected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureSnapshot {
    pub ip_address: Option<String>,
    pub hosting_provider: Option<String>,
    pub registrar: Option<String>,
    pub registrar_abuse_email: Option<String>,
    pub asn: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Infringement {
    pub id: String,
    pub product_id: String,
    pub source_url: String,
    /// Platform key as returned by `targets::detect_platform`
    pub platform: String,
    pub status: InfringementStatus,
    /// 0-100
    pub severity_score: u8,
    pub match_type: Option<String>,
    pub match_confidence: Option<f64>,
    pub evidence: Option<EvidencePacket>,
    pub infrastructure: InfrastructureSnapshot,
    pub evidence_snapshot_id: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}
