//! Verify and reject actions on detected infringements.
//!
//! Verifying preserves the evidence: infrastructure is enriched, evidence is
//! collected and scored, an attested snapshot is stored and its hash is
//! anchored. Both actions feed the decision back into the intelligence engine.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::audit::{AuditEntry, AuditLog};
use crate::error_handling::PipelineError;
use crate::evidence::{build_snapshot, collect_evidence, Detection, EvidenceContext};
use crate::intelligence::learn_from_feedback;
use crate::models::{Infringement, InfringementStatus, Product, TimestampStatus};
use crate::side_effects::{SideEffect, SideEffects};
use crate::storage::{infringements, products};
use crate::timestamp::TimestampService;
use crate::whois::{enrich_infrastructure, WhoisClient};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyOutcome {
    pub infringement_id: String,
    pub status: InfringementStatus,
    pub snapshot_id: String,
    pub content_hash: String,
    pub match_confidence: f64,
    pub timestamp_status: TimestampStatus,
    pub partial_collection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectOutcome {
    pub infringement_id: String,
    pub status: InfringementStatus,
}

/// Collaborators of the verify/reject flow.
#[derive(Clone)]
pub struct EnforcementPipeline {
    pool: SqlitePool,
    evidence: EvidenceContext,
    whois: Option<Arc<WhoisClient>>,
    timestamps: TimestampService,
    side_effects: SideEffects,
}

impl EnforcementPipeline {
    pub fn new(
        pool: SqlitePool,
        evidence: EvidenceContext,
        whois: Option<Arc<WhoisClient>>,
        timestamps: TimestampService,
        side_effects: SideEffects,
    ) -> Self {
        Self {
            pool,
            evidence,
            whois,
            timestamps,
            side_effects,
        }
    }

    /// Loads an infringement and its product, checking that `user_id` owns it.
    pub async fn load_owned(
        &self,
        user_id: &str,
        infringement_id: &str,
    ) -> Result<(Infringement, Product), PipelineError> {
        let infringement = infringements::get_infringement(&self.pool, infringement_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(infringement_id.to_string()))?;
        let product = products::get_product(&self.pool, &infringement.product_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(infringement_id.to_string()))?;
        if product.user_id != user_id {
            return Err(PipelineError::Forbidden);
        }
        Ok((infringement, product))
    }

    async fn transition(
        &self,
        infringement: &Infringement,
        next: InfringementStatus,
    ) -> Result<(), PipelineError> {
        let moved = infringements::update_infringement_status(
            &self.pool,
            &infringement.id,
            infringement.status,
            next,
        )
        .await?;
        if !moved {
            return Err(PipelineError::InvalidTransition {
                from: infringement.status.to_string(),
                to: next.to_string(),
            });
        }
        Ok(())
    }

    async fn learn(&self, infringement: &Infringement, product: &Product, verified: bool) {
        if let Err(e) = learn_from_feedback(&self.pool, infringement, product, verified).await {
            log::warn!("Failed to learn from feedback on {}: {e}", infringement.id);
        }
    }

    /// Confirms a pending detection and preserves its evidence.
    ///
    /// External collaborators degrade to partial evidence; only a failure to
    /// persist the snapshot is an error. Nothing is written until evidence is
    /// collected, and the status change commits together with the snapshot,
    /// so a failed attempt leaves the detection pending and retryable.
    pub async fn verify_infringement(
        &self,
        user_id: &str,
        infringement_id: &str,
        audit: &AuditLog,
    ) -> Result<VerifyOutcome, PipelineError> {
        let (mut infringement, product) = self.load_owned(user_id, infringement_id).await?;
        let previous = infringement.status;
        let invalid = || PipelineError::InvalidTransition {
            from: previous.to_string(),
            to: InfringementStatus::Active.to_string(),
        };
        if !previous.can_transition_to(InfringementStatus::Active) {
            return Err(invalid());
        }

        infringement.infrastructure = enrich_infrastructure(
            self.whois.as_deref(),
            &infringement.source_url,
            infringement.infrastructure,
        )
        .await;
        infringement.status = InfringementStatus::Active;

        let packet = collect_evidence(&Detection::new(&infringement, &product), &self.evidence).await;
        let confidence = packet.detection_metadata.confidence.unwrap_or(0.0);
        infringement.evidence = Some(packet.clone());

        let (mut snapshot, canonical) = build_snapshot(&infringement, &packet, user_id, Utc::now())?;
        let proof = self.timestamps.create_timestamp(&snapshot.content_hash).await;
        let timestamp_status = proof.status;
        snapshot.timestamp_proof = Some(proof);
        let committed = infringements::commit_verification(
            &self.pool,
            &infringement,
            previous,
            confidence,
            &snapshot,
            &canonical,
        )
        .await?;
        if !committed {
            return Err(invalid());
        }
        log::info!(
            "Verified {} with snapshot {} (confidence {confidence:.2}, timestamp {timestamp_status})",
            infringement.id,
            snapshot.id
        );

        self.learn(&infringement, &product, true).await;
        self.side_effects.emit(SideEffect::InfringementVerified {
            user_id: user_id.to_string(),
            infringement_id: infringement.id.clone(),
            platform: infringement.platform.clone(),
        });
        audit
            .record(
                AuditEntry::new("infringement_verified")
                    .user(user_id)
                    .target(&infringement.id)
                    .details(serde_json::json!({
                        "snapshot_id": snapshot.id,
                        "content_hash": snapshot.content_hash,
                        "confidence": confidence,
                    })),
            )
            .await;

        Ok(VerifyOutcome {
            infringement_id: infringement.id,
            status: InfringementStatus::Active,
            snapshot_id: snapshot.id,
            content_hash: snapshot.content_hash,
            match_confidence: confidence,
            timestamp_status,
            partial_collection: packet.detection_metadata.partial_collection,
        })
    }

    /// Marks a detection as a false positive.
    pub async fn reject_infringement(
        &self,
        user_id: &str,
        infringement_id: &str,
        audit: &AuditLog,
    ) -> Result<RejectOutcome, PipelineError> {
        let (infringement, product) = self.load_owned(user_id, infringement_id).await?;
        self.transition(&infringement, InfringementStatus::FalsePositive).await?;
        self.learn(&infringement, &product, false).await;
        audit
            .record(
                AuditEntry::new("infringement_rejected")
                    .user(user_id)
                    .target(&infringement.id)
                    .details(serde_json::json!({"previous_status": infringement.status})),
            )
            .await;
        log::info!("Rejected {} as a false positive", infringement.id);
        Ok(RejectOutcome {
            infringement_id: infringement.id,
            status: InfringementStatus::FalsePositive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::SqliteAuditSink;
    use crate::evidence::verify_integrity;
    use crate::models::PatternType;
    use crate::storage::{patterns, snapshots};
    use crate::storage::test_helpers::{create_test_pool, sample_infringement, sample_product, sample_profile};
    use crate::timestamp::test_support::{service, FakeNotary};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(url: &str) -> SqlitePool {
        let pool = create_test_pool().await;
        products::insert_product(&pool, &sample_product("prod-1", "u1")).await.unwrap();
        products::upsert_profile(&pool, &sample_profile("u1")).await.unwrap();
        let mut inf = sample_infringement("inf-1", "prod-1", InfringementStatus::PendingVerification);
        inf.source_url = url.to_string();
        infringements::insert_infringement(&pool, &inf).await.unwrap();
        pool
    }

    fn pipeline(pool: &SqlitePool) -> EnforcementPipeline {
        let client = reqwest::Client::new();
        let redirect_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        EnforcementPipeline::new(
            pool.clone(),
            EvidenceContext {
                client,
                redirect_client,
                screenshot: None,
                wayback_url: None,
            },
            None,
            service(FakeNotary {
                fail_stamp: false,
                upgraded: None,
                block_time: 0,
            }),
            SideEffects::disabled(),
        )
    }

    fn audit(pool: &SqlitePool) -> AuditLog {
        AuditLog::new(Arc::new(SqliteAuditSink::new(pool.clone())), 10)
    }

    #[tokio::test]
    async fn test_verify_stores_attested_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/leak"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><p>Download Ultimate Brain for free, the best notion template.</p></body></html>",
            ))
            .mount(&server)
            .await;
        let url = format!("{}/leak", server.uri());
        let pool = setup(&url).await;
        let audit = audit(&pool);

        let outcome = pipeline(&pool).verify_infringement("u1", "inf-1", &audit).await.unwrap();
        audit.flush().await;
        assert_eq!(outcome.status, InfringementStatus::Active);
        assert_eq!(outcome.timestamp_status, TimestampStatus::Pending);
        assert!(outcome.match_confidence > 0.0);

        let stored = infringements::get_infringement(&pool, "inf-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InfringementStatus::Active);
        assert_eq!(stored.evidence_snapshot_id.as_deref(), Some(outcome.snapshot_id.as_str()));
        assert!(!stored.evidence.unwrap().matched_excerpts.is_empty());

        let snapshot = snapshots::get_snapshot(&pool, &outcome.snapshot_id).await.unwrap().unwrap();
        assert!(verify_integrity(&snapshot));
        assert_eq!(snapshot.content_hash, outcome.content_hash);

        let learned = patterns::top_patterns(&pool, "prod-1", PatternType::VerifiedHosting, 0.6, 10)
            .await
            .unwrap();
        assert_eq!(learned[0].pattern_value, "Cloudflare");
    }

    #[tokio::test]
    async fn test_verify_twice_is_rejected() {
        let pool = setup("http://127.0.0.1:9/unreachable").await;
        let audit = audit(&pool);
        let p = pipeline(&pool);
        let outcome = p.verify_infringement("u1", "inf-1", &audit).await.unwrap();
        assert!(outcome.partial_collection);
        let err = p.verify_infringement("u1", "inf-1", &audit).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_can_be_retried() {
        let pool = setup("http://127.0.0.1:9/unreachable").await;
        let audit = audit(&pool);
        let p = pipeline(&pool);
        sqlx::query(
            "CREATE TRIGGER reject_snapshots BEFORE INSERT ON evidence_snapshots
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = p.verify_infringement("u1", "inf-1", &audit).await.unwrap_err();
        assert!(matches!(err, PipelineError::Database(_)));
        let stored = infringements::get_infringement(&pool, "inf-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InfringementStatus::PendingVerification);
        assert!(stored.evidence_snapshot_id.is_none());
        assert!(snapshots::get_snapshot_for_infringement(&pool, "inf-1")
            .await
            .unwrap()
            .is_none());

        sqlx::query("DROP TRIGGER reject_snapshots")
            .execute(&pool)
            .await
            .unwrap();
        let outcome = p.verify_infringement("u1", "inf-1", &audit).await.unwrap();
        let stored = infringements::get_infringement(&pool, "inf-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InfringementStatus::Active);
        assert_eq!(stored.evidence_snapshot_id.as_deref(), Some(outcome.snapshot_id.as_str()));
    }

    #[tokio::test]
    async fn test_ownership_and_existence() {
        let pool = setup("http://127.0.0.1:9/").await;
        let audit = audit(&pool);
        let p = pipeline(&pool);
        assert!(matches!(
            p.reject_infringement("u2", "inf-1", &audit).await,
            Err(PipelineError::Forbidden)
        ));
        assert!(matches!(
            p.reject_infringement("u1", "missing", &audit).await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reject_marks_false_positive_and_learns() {
        let pool = setup("https://www.reddit.com/r/notion/comments/abc").await;
        let audit = audit(&pool);
        let outcome = pipeline(&pool).reject_infringement("u1", "inf-1", &audit).await.unwrap();
        assert_eq!(outcome.status, InfringementStatus::FalsePositive);
        let fp = patterns::top_patterns(&pool, "prod-1", PatternType::FalsePositiveDomain, 0.7, 10)
            .await
            .unwrap();
        assert_eq!(fp[0].pattern_value, "reddit.com");
    }
}
