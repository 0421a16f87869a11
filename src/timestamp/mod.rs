//! Blockchain timestamping of evidence hashes.
//!
//! [`TimestampService`] never returns an error. Notary failures degrade the
//! returned proof instead, and a proof's status only ever moves from `pending`
//! to `confirmed` or `failed`. Whether a notary is available at all is decided
//! once, when the service is constructed.

mod notary;
mod ots;
mod upgrade;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;

use crate::models::{TimestampProof, TimestampStatus};

pub use notary::{bitcoin_attestation_height, BlockAttestation, Notary, OpenTimestampsNotary};
pub use ots::BITCOIN_ATTESTATION_TAG;
pub use upgrade::{upgrade_pending_timestamps, UpgradeStats};

const UNAVAILABLE: &str = "Timestamping is not available";

#[derive(Clone)]
pub struct TimestampService {
    notary: Option<Arc<dyn Notary>>,
}

impl TimestampService {
    pub fn new(notary: Option<Arc<dyn Notary>>) -> Self {
        if notary.is_none() {
            log::warn!("{UNAVAILABLE}; evidence proofs will be recorded as failed");
        }
        Self { notary }
    }

    pub fn is_available(&self) -> bool {
        self.notary.is_some()
    }

    /// Anchors a hex SHA-256 hash. The proof is `pending` on success and
    /// `failed` when the notary is unavailable or rejects the submission.
    pub async fn create_timestamp(&self, hash: &str) -> TimestampProof {
        let mut proof = TimestampProof {
            hash: hash.to_string(),
            proof: None,
            status: TimestampStatus::Pending,
            confirmed_at: None,
            block_height: None,
            error: None,
            created_at: Utc::now(),
        };
        let Some(notary) = &self.notary else {
            return failed(proof, UNAVAILABLE.to_string());
        };
        let digest = match hex::decode(hash) {
            Ok(d) if d.len() == 32 => d,
            _ => return failed(proof, format!("Not a SHA-256 hex digest: {hash}")),
        };
        match notary.stamp(&digest).await {
            Ok(bytes) => {
                proof.proof = Some(BASE64.encode(bytes));
                proof
            }
            Err(e) => {
                log::warn!("Timestamp submission failed for {hash}: {e}");
                failed(proof, e.to_string())
            }
        }
    }

    /// Confirms a pending proof when it resolves to a Bitcoin block with a
    /// positive block time. Otherwise the proof is returned unchanged.
    pub async fn verify_timestamp(&self, proof: &TimestampProof) -> TimestampProof {
        if proof.status != TimestampStatus::Pending {
            return proof.clone();
        }
        let Some(notary) = &self.notary else {
            return failed(proof.clone(), UNAVAILABLE.to_string());
        };
        let bytes = match decode_proof(proof) {
            Ok(bytes) => bytes,
            Err(message) => return failed(proof.clone(), message),
        };
        match notary.verify(&bytes).await {
            Ok(Some(block)) if block.time.timestamp() > 0 => TimestampProof {
                status: TimestampStatus::Confirmed,
                confirmed_at: Some(block.time),
                block_height: Some(block.height),
                error: None,
                ..proof.clone()
            },
            Ok(_) => proof.clone(),
            Err(e) => {
                log::debug!("Timestamp verification for {} deferred: {e}", proof.hash);
                proof.clone()
            }
        }
    }

    /// Fetches the completed attestation for a pending proof.
    ///
    /// On success the upgraded proof replaces the stored one and the status
    /// becomes `confirmed`. Proofs that are not pending are returned as is.
    pub async fn upgrade_timestamp(&self, proof: &TimestampProof) -> TimestampProof {
        if proof.status != TimestampStatus::Pending {
            return proof.clone();
        }
        let Some(notary) = &self.notary else {
            return failed(proof.clone(), UNAVAILABLE.to_string());
        };
        let bytes = match decode_proof(proof) {
            Ok(bytes) => bytes,
            Err(message) => return failed(proof.clone(), message),
        };
        let Ok(digest) = hex::decode(&proof.hash) else {
            return failed(proof.clone(), format!("Not a hex digest: {}", proof.hash));
        };

        let upgraded = match notary.upgrade(&digest, &bytes).await {
            Ok(Some(upgraded)) => upgraded,
            Ok(None) => return proof.clone(),
            Err(e) => {
                log::debug!("Timestamp upgrade for {} deferred: {e}", proof.hash);
                return TimestampProof {
                    error: Some(e.to_string()),
                    ..proof.clone()
                };
            }
        };

        let block = notary
            .verify(&upgraded)
            .await
            .ok()
            .flatten()
            .filter(|b| b.time.timestamp() > 0);
        TimestampProof {
            proof: Some(BASE64.encode(&upgraded)),
            status: TimestampStatus::Confirmed,
            confirmed_at: Some(block.map(|b| b.time).unwrap_or_else(Utc::now)),
            block_height: block
                .map(|b| b.height)
                .or_else(|| bitcoin_attestation_height(&upgraded)),
            error: None,
            ..proof.clone()
        }
    }
}

fn failed(proof: TimestampProof, message: String) -> TimestampProof {
    TimestampProof {
        status: TimestampStatus::Failed,
        error: Some(message),
        ..proof
    }
}

fn decode_proof(proof: &TimestampProof) -> Result<Vec<u8>, String> {
    let encoded = proof
        .proof
        .as_deref()
        .ok_or_else(|| "Proof has no notary data".to_string())?;
    BASE64
        .decode(encoded)
        .map_err(|e| format!("Proof is not valid base64: {e}"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;

    use crate::error_handling::NotaryError;

    /// In-process notary with scripted answers.
    pub struct FakeNotary {
        pub fail_stamp: bool,
        pub upgraded: Option<Vec<u8>>,
        pub block_time: i64,
    }

    #[async_trait]
    impl Notary for FakeNotary {
        async fn stamp(&self, digest: &[u8]) -> Result<Vec<u8>, NotaryError> {
            if self.fail_stamp {
                return Err(NotaryError::Status(503));
            }
            Ok(digest.to_vec())
        }

        async fn upgrade(&self, _: &[u8], _: &[u8]) -> Result<Option<Vec<u8>>, NotaryError> {
            Ok(self.upgraded.clone())
        }

        async fn verify(&self, proof: &[u8]) -> Result<Option<BlockAttestation>, NotaryError> {
            if self.upgraded.as_deref() != Some(proof) {
                return Ok(None);
            }
            Ok(DateTime::from_timestamp(self.block_time, 0)
                .map(|time| BlockAttestation { height: 840_000, time }))
        }
    }

    pub fn service(notary: FakeNotary) -> TimestampService {
        TimestampService::new(Some(Arc::new(notary)))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{service, FakeNotary};
    use super::*;

    const HASH: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn pending_notary() -> FakeNotary {
        FakeNotary {
            fail_stamp: false,
            upgraded: None,
            block_time: 0,
        }
    }

    #[tokio::test]
    async fn test_create_is_pending_with_proof() {
        let proof = service(pending_notary()).create_timestamp(HASH).await;
        assert_eq!(proof.status, TimestampStatus::Pending);
        assert!(proof.proof.is_some());
        assert_eq!(proof.hash, HASH);
    }

    #[tokio::test]
    async fn test_unavailable_notary_fails_without_error() {
        let svc = TimestampService::new(None);
        assert!(!svc.is_available());
        let proof = svc.create_timestamp(HASH).await;
        assert_eq!(proof.status, TimestampStatus::Failed);
        assert!(proof.error.is_some());
    }

    #[tokio::test]
    async fn test_submission_failure_marks_failed() {
        let svc = service(FakeNotary {
            fail_stamp: true,
            ..pending_notary()
        });
        assert_eq!(svc.create_timestamp(HASH).await.status, TimestampStatus::Failed);
        assert_eq!(svc.create_timestamp("zz").await.status, TimestampStatus::Failed);
    }

    #[tokio::test]
    async fn test_verify_leaves_unanchored_proof_pending() {
        let svc = service(pending_notary());
        let proof = svc.create_timestamp(HASH).await;
        assert_eq!(svc.verify_timestamp(&proof).await.status, TimestampStatus::Pending);
    }

    #[tokio::test]
    async fn test_upgrade_confirms_with_block_time() {
        let svc = service(FakeNotary {
            upgraded: Some(vec![1, 2, 3]),
            block_time: 1_713_571_767,
            ..pending_notary()
        });
        let proof = svc.create_timestamp(HASH).await;
        let upgraded = svc.upgrade_timestamp(&proof).await;
        assert_eq!(upgraded.status, TimestampStatus::Confirmed);
        assert_eq!(upgraded.block_height, Some(840_000));
        assert_eq!(upgraded.confirmed_at.map(|t| t.timestamp()), Some(1_713_571_767));
        assert_eq!(upgraded.proof.as_deref(), Some("AQID"));
    }

    #[tokio::test]
    async fn test_status_never_moves_backward() {
        let svc = service(pending_notary());
        let confirmed = TimestampProof {
            hash: HASH.to_string(),
            proof: Some("AQID".to_string()),
            status: TimestampStatus::Confirmed,
            confirmed_at: Some(Utc::now()),
            block_height: Some(1),
            error: None,
            created_at: Utc::now(),
        };
        assert_eq!(svc.upgrade_timestamp(&confirmed).await, confirmed);
        assert_eq!(svc.verify_timestamp(&confirmed).await, confirmed);

        let failed_proof = TimestampProof {
            status: TimestampStatus::Failed,
            ..confirmed.clone()
        };
        assert_eq!(
            TimestampService::new(None).upgrade_timestamp(&failed_proof).await.status,
            TimestampStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_zero_block_time_is_not_a_confirmation() {
        let svc = service(FakeNotary {
            upgraded: Some(vec![9]),
            block_time: 0,
            ..pending_notary()
        });
        let mut proof = svc.create_timestamp(HASH).await;
        proof.proof = Some(BASE64.encode([9u8]));
        assert_eq!(svc.verify_timestamp(&proof).await.status, TimestampStatus::Pending);
    }
}
