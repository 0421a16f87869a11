//! Evidence packets, snapshots and timestamp proofs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::infringement::InfrastructureSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotStorage {
    /// Re-uploaded to our own storage
    Durable,
    /// Link returned by the rendering service, may expire
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub url: String,
    pub storage: ScreenshotStorage,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedExcerpt {
    /// The product term that matched
    pub term: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionMetadata {
    pub detected_via: Option<String>,
    pub match_type: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub confidence: Option<f64>,
    pub final_url: Option<String>,
    pub wayback_url: Option<String>,
    pub partial_collection: bool,
    pub collection_error: Option<String>,
}

impl Default for DetectionMetadata {
    fn default() -> Self {
        Self {
            detected_via: None,
            match_type: None,
            collected_at: DateTime::<Utc>::UNIX_EPOCH,
            confidence: None,
            final_url: None,
            wayback_url: None,
            partial_collection: false,
            collection_error: None,
        }
    }
}

/// Evidence gathered for one detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidencePacket {
    pub screenshots: Vec<Screenshot>,
    pub matched_excerpts: Vec<MatchedExcerpt>,
    /// File hashes that matched the protected product byte for byte
    pub hash_matches: Vec<String>,
    pub url_chain: Vec<String>,
    pub detection_metadata: DetectionMetadata,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimestampStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Blockchain anchoring proof for an evidence hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampProof {
    /// Hex SHA-256 that was anchored
    pub hash: String,
    /// Base64 encoded notary proof, absent when submission failed
    pub proof: Option<String>,
    pub status: TimestampStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub block_height: Option<u64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyEntry {
    pub action: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub statement: String,
    pub actor: String,
    pub signed_at: DateTime<Utc>,
    /// SHA-256 over statement, actor, signed_at and the content hash
    pub signature: String,
}

/// Everything that is covered by a snapshot's content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotContent {
    pub url: String,
    pub screenshot_ref: Option<String>,
    pub html_ref: Option<String>,
    pub infrastructure: InfrastructureSnapshot,
    pub evidence: EvidencePacket,
    /// RFC 3339 with millisecond precision, kept as text so re-hashing is exact
    pub captured_at: String,
}

/// Immutable, hashed evidence bundle created when an infringement is verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub id: String,
    pub infringement_id: String,
    pub content_hash: String,
    pub content: SnapshotContent,
    pub timestamp_proof: Option<TimestampProof>,
    pub chain_of_custody: Vec<CustodyEntry>,
    pub attestation: Attestation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_decodes_from_partial_json() {
        let packet: EvidencePacket =
            serde_json::from_str(r#"{"hash_matches":["abc123"]}"#).unwrap();
        assert_eq!(packet.hash_matches, vec!["abc123".to_string()]);
        assert!(packet.screenshots.is_empty());
        assert!(!packet.detection_metadata.partial_collection);
    }
}
