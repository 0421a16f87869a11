//! Evidence snapshots: canonical hashing, attestation and integrity checks.
//!
//! The content hash is SHA-256 over the canonical JSON of [`SnapshotContent`].
//! Canonical means object keys in sorted order and no insignificant whitespace,
//! so recomputing the hash from the stored content always reproduces it.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::models::{
    Attestation, CustodyEntry, EvidencePacket, EvidenceSnapshot, Infringement, SnapshotContent,
};

/// Custody action recorded when a snapshot is created.
pub const CUSTODY_CREATED: &str = "snapshot_created";

/// Canonical JSON text of snapshot content.
pub fn canonical_json(content: &SnapshotContent) -> Result<String, serde_json::Error> {
    // Going through Value sorts object keys
    let value = serde_json::to_value(content)?;
    serde_json::to_string(&value)
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Signature binding the attestation to the content hash.
pub fn attestation_signature(
    statement: &str,
    actor: &str,
    signed_at: DateTime<Utc>,
    content_hash: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(statement.as_bytes());
    hasher.update(b"\n");
    hasher.update(actor.as_bytes());
    hasher.update(b"\n");
    hasher.update(signed_at.to_rfc3339_opts(SecondsFormat::Millis, true).as_bytes());
    hasher.update(b"\n");
    hasher.update(content_hash.as_bytes());
    hex::encode(hasher.finalize())
}

fn attestation_statement(actor: &str, url: &str, captured_at: &str, content_hash: &str) -> String {
    format!(
        "I, {actor}, attest that this evidence was captured from {url} at {captured_at} \
         and has not been altered since capture. SHA-256: {content_hash}"
    )
}

pub fn custody_entry(action: &str, actor: &str) -> CustodyEntry {
    CustodyEntry {
        action: action.to_string(),
        actor: actor.to_string(),
        timestamp: Utc::now(),
    }
}

/// Builds an immutable snapshot of `evidence` for `infringement`.
///
/// Returns the snapshot and the canonical text its hash was computed over,
/// which is what gets persisted.
pub fn build_snapshot(
    infringement: &Infringement,
    evidence: &EvidencePacket,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<(EvidenceSnapshot, String), serde_json::Error> {
    let content = SnapshotContent {
        url: infringement.source_url.clone(),
        screenshot_ref: evidence.screenshots.first().map(|s| s.url.clone()),
        html_ref: evidence.detection_metadata.wayback_url.clone(),
        infrastructure: infringement.infrastructure.clone(),
        evidence: evidence.clone(),
        captured_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let canonical = canonical_json(&content)?;
    let content_hash = sha256_hex(canonical.as_bytes());

    let statement = attestation_statement(actor, &content.url, &content.captured_at, &content_hash);
    let signature = attestation_signature(&statement, actor, now, &content_hash);

    let snapshot = EvidenceSnapshot {
        id: uuid::Uuid::new_v4().to_string(),
        infringement_id: infringement.id.clone(),
        content_hash,
        content,
        timestamp_proof: None,
        chain_of_custody: vec![CustodyEntry {
            action: CUSTODY_CREATED.to_string(),
            actor: actor.to_string(),
            timestamp: now,
        }],
        attestation: Attestation {
            statement,
            actor: actor.to_string(),
            signed_at: now,
            signature,
        },
    };
    Ok((snapshot, canonical))
}

/// Recomputes the content hash and attestation signature and compares them
/// with the stored values.
pub fn verify_integrity(snapshot: &EvidenceSnapshot) -> bool {
    let Ok(canonical) = canonical_json(&snapshot.content) else {
        return false;
    };
    if sha256_hex(canonical.as_bytes()) != snapshot.content_hash {
        return false;
    }
    let a = &snapshot.attestation;
    attestation_signature(&a.statement, &a.actor, a.signed_at, &snapshot.content_hash)
        == a.signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InfringementStatus, MatchedExcerpt};
    use crate::storage::test_helpers::sample_infringement;

    fn evidence() -> EvidencePacket {
        EvidencePacket {
            matched_excerpts: vec![MatchedExcerpt {
                term: "Ultimate Brain".into(),
                excerpt: "Download Ultimate Brain for free".into(),
            }],
            hash_matches: vec!["abc123".into()],
            url_chain: vec!["https://a.example".into(), "https://b.example".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_round_trip_after_storage() {
        let inf = sample_infringement("inf-1", "prod-1", InfringementStatus::Active);
        let (snapshot, canonical) = build_snapshot(&inf, &evidence(), "u1", Utc::now()).unwrap();
        assert_eq!(snapshot.content_hash, sha256_hex(canonical.as_bytes()));

        // What the repository does on read
        let reloaded: SnapshotContent = serde_json::from_str(&canonical).unwrap();
        let restored = EvidenceSnapshot {
            content: reloaded,
            ..snapshot.clone()
        };
        assert!(verify_integrity(&restored));
        assert_eq!(canonical_json(&restored.content).unwrap(), canonical);
    }

    #[test]
    fn test_tampering_is_detected() {
        let inf = sample_infringement("inf-1", "prod-1", InfringementStatus::Active);
        let (mut snapshot, _) = build_snapshot(&inf, &evidence(), "u1", Utc::now()).unwrap();
        snapshot.content.evidence.hash_matches.clear();
        assert!(!verify_integrity(&snapshot));

        let (mut snapshot, _) = build_snapshot(&inf, &evidence(), "u1", Utc::now()).unwrap();
        snapshot.attestation.actor = "someone-else".into();
        assert!(!verify_integrity(&snapshot));
    }

    #[test]
    fn test_canonical_json_is_compact_and_stable() {
        let inf = sample_infringement("inf-1", "prod-1", InfringementStatus::Active);
        let (snapshot, canonical) = build_snapshot(&inf, &evidence(), "u1", Utc::now()).unwrap();
        assert!(!canonical.contains(": "));
        assert_eq!(canonical_json(&snapshot.content).unwrap(), canonical);
    }

    #[test]
    fn test_attestation_mentions_hash_and_url() {
        let inf = sample_infringement("inf-1", "prod-1", InfringementStatus::Active);
        let (snapshot, _) = build_snapshot(&inf, &evidence(), "u1", Utc::now()).unwrap();
        assert!(snapshot.attestation.statement.contains(&snapshot.content_hash));
        assert!(snapshot.attestation.statement.contains(&inf.source_url));
        assert_eq!(snapshot.chain_of_custody[0].action, CUSTODY_CREATED);
    }
}
