//! One pass of the queue worker over due items.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::audit::{AuditEntry, AuditLog, AuditSink};
use crate::config::{
    Config, CLAIM_LEASE_SECS, MAX_DELIVERY_ATTEMPTS, QUEUE_PROCESS_LIMIT, RETRY_BACKOFF_SECS,
};
use crate::error_handling::{DatabaseError, DeliveryError};
use crate::models::{DmcaQueueItem, InfringementStatus};
use crate::side_effects::{SideEffect, SideEffects};
use crate::storage::{infringements, products, queue as queue_store};

use super::delivery::Mailer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    /// Stale claims returned to the queue at the start of the pass
    pub released: usize,
    pub parked_web_forms: usize,
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
    pub requeued: usize,
    /// Items whose processing hit a store error and were released
    pub errors: usize,
}

enum Delivery {
    Sent,
    Requeued,
    Failed,
}

impl ProcessStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct QueueProcessor {
    pool: SqlitePool,
    mailer: Option<Arc<dyn Mailer>>,
    audit_sink: Arc<dyn AuditSink>,
    audit_buffer_size: usize,
    side_effects: SideEffects,
    limit: i64,
    retry_backoff: Duration,
    claim_lease: Duration,
}

impl QueueProcessor {
    pub fn new(
        pool: SqlitePool,
        mailer: Option<Arc<dyn Mailer>>,
        audit_sink: Arc<dyn AuditSink>,
        side_effects: SideEffects,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            mailer,
            audit_sink,
            audit_buffer_size: config.audit_buffer_size,
            side_effects,
            limit: QUEUE_PROCESS_LIMIT,
            retry_backoff: Duration::from_secs(RETRY_BACKOFF_SECS),
            claim_lease: Duration::from_secs(CLAIM_LEASE_SECS),
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    fn retry_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::from_std(self.retry_backoff).unwrap_or_else(|_| chrono::Duration::zero())
    }

    /// Releases expired claims, parks due web form items, then claims and
    /// sends due email items.
    ///
    /// Items are claimed in the store before sending, so two concurrent runs
    /// never send the same item. A failed send is retried after the backoff
    /// until the attempt limit is reached. A store error on one item releases
    /// that item and the pass continues; a claim left behind by a crashed
    /// worker is released once its lease expires, so delivery is at least once.
    pub async fn process_due_items(&self, now: DateTime<Utc>) -> Result<ProcessStats, DatabaseError> {
        let mut stats = ProcessStats::default();
        let audit = AuditLog::new(self.audit_sink.clone(), self.audit_buffer_size);

        let lease = chrono::Duration::from_std(self.claim_lease).unwrap_or_else(|_| chrono::Duration::zero());
        let released =
            queue_store::release_stale_claims(&self.pool, now - lease, now, MAX_DELIVERY_ATTEMPTS).await?;
        if released > 0 {
            log::warn!("Released {released} queue item(s) whose claim expired");
        }
        stats.released = released as usize;

        let parked = queue_store::mark_due_web_forms(&self.pool, now).await?;
        stats.parked_web_forms = parked.len();
        for item in &parked {
            audit
                .record(
                    AuditEntry::new("notice_awaiting_manual_submission")
                        .user(&item.user_id)
                        .target(&item.infringement_id)
                        .details(serde_json::json!({"queue_item_id": item.id, "recipient": item.recipient})),
                )
                .await;
        }

        let Some(mailer) = &self.mailer else {
            log::warn!("Email delivery is not configured; email items stay pending");
            audit.flush().await;
            return Ok(stats);
        };

        let claimed = queue_store::claim_due_email_items(&self.pool, now, self.limit).await?;
        stats.claimed = claimed.len();
        for item in &claimed {
            match self.deliver(&**mailer, item, now, &audit).await {
                Ok(Delivery::Sent) => stats.sent += 1,
                Ok(Delivery::Requeued) => stats.requeued += 1,
                Ok(Delivery::Failed) => stats.failed += 1,
                Err(e) => {
                    stats.errors += 1;
                    log::error!("Processing of queue item {} failed: {e}", item.id);
                    let released = queue_store::release_claim(
                        &self.pool,
                        &item.id,
                        &e.to_string(),
                        self.retry_at(now),
                        MAX_DELIVERY_ATTEMPTS,
                    )
                    .await;
                    if let Err(e) = released {
                        log::error!("Queue item {} stays claimed until its lease expires: {e}", item.id);
                    }
                }
            }
        }

        audit.flush().await;
        Ok(stats)
    }

    async fn deliver(
        &self,
        mailer: &dyn Mailer,
        item: &DmcaQueueItem,
        now: DateTime<Utc>,
        audit: &AuditLog,
    ) -> Result<Delivery, DatabaseError> {
        let reply_to = products::get_profile(&self.pool, &item.user_id)
            .await?
            .and_then(|p| p.email);
        match mailer.send(item, reply_to.as_deref()).await {
            Ok(message_id) => {
                self.complete(item, message_id, now, audit).await?;
                Ok(Delivery::Sent)
            }
            Err(e) => {
                if self.fail(item, &e, now, audit).await? {
                    Ok(Delivery::Requeued)
                } else {
                    Ok(Delivery::Failed)
                }
            }
        }
    }

    async fn complete(
        &self,
        item: &DmcaQueueItem,
        message_id: Option<String>,
        now: DateTime<Utc>,
        audit: &AuditLog,
    ) -> Result<(), DatabaseError> {
        if !queue_store::mark_sent(&self.pool, &item.id, now).await? {
            log::warn!("Queue item {} was no longer processing when marked sent", item.id);
            return Ok(());
        }
        if let Err(e) = self.advance_infringement(&item.infringement_id).await {
            log::warn!("Notice for {} sent but its status was not updated: {e}", item.infringement_id);
        }
        log::info!(
            "Sent notice for {} to {}",
            item.infringement_id,
            item.recipient.as_deref().unwrap_or("-")
        );
        self.side_effects.emit(SideEffect::TakedownSent {
            user_id: item.user_id.clone(),
            infringement_id: item.infringement_id.clone(),
            recipient: item.recipient.clone(),
        });
        audit
            .record(
                AuditEntry::new("takedown_sent")
                    .user(&item.user_id)
                    .target(&item.infringement_id)
                    .details(serde_json::json!({
                        "queue_item_id": item.id,
                        "batch_id": item.batch_id,
                        "recipient": item.recipient,
                        "message_id": message_id,
                    })),
            )
            .await;
        Ok(())
    }

    async fn advance_infringement(&self, infringement_id: &str) -> Result<(), DatabaseError> {
        if let Some(infringement) = infringements::get_infringement(&self.pool, infringement_id).await? {
            if infringement.status != InfringementStatus::TakedownSent
                && infringement.status.can_transition_to(InfringementStatus::TakedownSent)
            {
                infringements::update_infringement_status(
                    &self.pool,
                    &infringement.id,
                    infringement.status,
                    InfringementStatus::TakedownSent,
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Records the failure. Returns whether the item was requeued.
    async fn fail(
        &self,
        item: &DmcaQueueItem,
        error: &DeliveryError,
        now: DateTime<Utc>,
        audit: &AuditLog,
    ) -> Result<bool, DatabaseError> {
        let message = error.to_string();
        queue_store::mark_failed(&self.pool, &item.id, &message, now).await?;
        let requeued = error.is_retriable()
            && queue_store::requeue_failed(&self.pool, &item.id, self.retry_at(now), MAX_DELIVERY_ATTEMPTS)
                .await?;
        if requeued {
            log::warn!(
                "Delivery of {} failed (attempt {}), will retry: {message}",
                item.id,
                item.attempt_count
            );
        } else {
            log::error!("Delivery of {} failed permanently: {message}", item.id);
            audit
                .record(
                    AuditEntry::new("takedown_failed")
                        .user(&item.user_id)
                        .target(&item.infringement_id)
                        .details(serde_json::json!({
                            "queue_item_id": item.id,
                            "attempts": item.attempt_count,
                            "error": message,
                        })),
                )
                .await;
        }
        Ok(requeued)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audit::SqliteAuditSink;
    use crate::models::{DeliveryMethod, QueueStatus};
    use crate::storage::test_helpers::{create_test_pool, seed_infringement};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        sent: Mutex<Vec<String>>,
        fail_with: Option<u16>,
    }

    impl RecordingMailer {
        pub(crate) fn failing(status: u16) -> Self {
            Self {
                sent: Mutex::default(),
                fail_with: Some(status),
            }
        }

        pub(crate) async fn sent_count(&self) -> usize {
            self.sent.lock().await.len()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            item: &DmcaQueueItem,
            _reply_to: Option<&str>,
        ) -> Result<Option<String>, DeliveryError> {
            if let Some(status) = self.fail_with {
                return Err(DeliveryError::Rejected {
                    status,
                    body: "rejected".into(),
                });
            }
            self.sent.lock().await.push(item.id.clone());
            Ok(Some(format!("msg-{}", item.id)))
        }
    }

    pub(crate) fn processor_with(
        pool: &SqlitePool,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> QueueProcessor {
        QueueProcessor::new(
            pool.clone(),
            mailer,
            Arc::new(SqliteAuditSink::new(pool.clone())),
            SideEffects::disabled(),
            &Config::default(),
        )
    }

    fn queued(id: &str, infringement_id: &str, method: DeliveryMethod, at: DateTime<Utc>) -> DmcaQueueItem {
        DmcaQueueItem {
            id: id.into(),
            batch_id: "b1".into(),
            user_id: "u1".into(),
            infringement_id: infringement_id.into(),
            recipient: Some("abuse@host.example".into()),
            recipient_name: None,
            delivery_method: method,
            notice_subject: "DMCA Takedown Notice".into(),
            notice_body: "body".into(),
            status: QueueStatus::Pending,
            attempt_count: 0,
            scheduled_for: at,
            created_at: at,
            completed_at: None,
            error_message: None,
        }
    }

    pub(crate) async fn queue_email(pool: &SqlitePool, id: &str, at: DateTime<Utc>) {
        queue_store::insert_batch(pool, &[queued(id, "inf-1", DeliveryMethod::Email, at)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_due_email_is_sent_and_infringement_advanced() {
        let pool = create_test_pool().await;
        seed_infringement(&pool, "u1", InfringementStatus::Active).await;
        let now = Utc::now();
        queue_store::insert_batch(
            &pool,
            &[
                queued("q1", "inf-1", DeliveryMethod::Email, now),
                queued("q2", "inf-1", DeliveryMethod::Email, now + chrono::Duration::minutes(3)),
                queued("q3", "inf-1", DeliveryMethod::WebForm, now),
            ],
        )
        .await
        .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(&pool, Some(mailer.clone()));
        let stats = processor.process_due_items(now).await.unwrap();
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.parked_web_forms, 1);
        assert_eq!(mailer.sent_count().await, 1);

        let sent = queue_store::get_item(&pool, "q1").await.unwrap().unwrap();
        assert_eq!(sent.status, QueueStatus::Sent);
        assert!(sent.completed_at.is_some());
        let later = queue_store::get_item(&pool, "q2").await.unwrap().unwrap();
        assert_eq!(later.status, QueueStatus::Pending);
        let inf = infringements::get_infringement(&pool, "inf-1").await.unwrap().unwrap();
        assert_eq!(inf.status, InfringementStatus::TakedownSent);

        let audited: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE action = 'takedown_sent'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(audited, 1);
    }

    #[tokio::test]
    async fn test_retriable_failure_is_bounded() {
        let pool = create_test_pool().await;
        let now = Utc::now();
        queue_email(&pool, "q1", now).await;
        let processor = processor_with(&pool, Some(Arc::new(RecordingMailer::failing(503))))
            .with_retry_backoff(Duration::ZERO);

        for _ in 0..2 {
            let stats = processor.process_due_items(now).await.unwrap();
            assert_eq!(stats.requeued, 1);
        }
        let stats = processor.process_due_items(now).await.unwrap();
        assert_eq!(stats.failed, 1);

        let item = queue_store::get_item(&pool, "q1").await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Failed);
        assert_eq!(item.attempt_count, MAX_DELIVERY_ATTEMPTS);
        assert!(processor.process_due_items(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let pool = create_test_pool().await;
        let now = Utc::now();
        queue_email(&pool, "q1", now).await;
        let processor = processor_with(&pool, Some(Arc::new(RecordingMailer::failing(422))));
        let stats = processor.process_due_items(now).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.requeued, 0);
    }

    #[tokio::test]
    async fn test_store_error_releases_claimed_items() {
        let pool = create_test_pool().await;
        seed_infringement(&pool, "u1", InfringementStatus::Active).await;
        let now = Utc::now();
        queue_store::insert_batch(
            &pool,
            &[
                queued("q1", "inf-1", DeliveryMethod::Email, now),
                queued("q2", "inf-1", DeliveryMethod::Email, now),
            ],
        )
        .await
        .unwrap();
        sqlx::query("ALTER TABLE profiles RENAME TO profiles_offline")
            .execute(&pool)
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(&pool, Some(mailer.clone())).with_retry_backoff(Duration::ZERO);
        let stats = processor.process_due_items(now).await.unwrap();
        assert_eq!(stats.claimed, 2);
        assert_eq!(stats.errors, 2);
        assert_eq!(mailer.sent_count().await, 0);
        for id in ["q1", "q2"] {
            let item = queue_store::get_item(&pool, id).await.unwrap().unwrap();
            assert_eq!(item.status, QueueStatus::Pending, "{id}");
        }

        sqlx::query("ALTER TABLE profiles_offline RENAME TO profiles")
            .execute(&pool)
            .await
            .unwrap();
        let stats = processor.process_due_items(now).await.unwrap();
        assert_eq!(stats.sent, 2);
        let items = queue_store::list_batch_items(&pool, "b1").await.unwrap();
        assert!(items.iter().all(|i| i.status == QueueStatus::Sent));
    }

    #[tokio::test]
    async fn test_abandoned_claim_is_retried_after_lease() {
        let pool = create_test_pool().await;
        seed_infringement(&pool, "u1", InfringementStatus::Active).await;
        let now = Utc::now();
        queue_email(&pool, "q1", now).await;
        // A worker that claimed the item and then died
        queue_store::claim_due_email_items(&pool, now, 10).await.unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let processor = processor_with(&pool, Some(mailer.clone()));
        let early = processor.process_due_items(now + chrono::Duration::minutes(1)).await.unwrap();
        assert_eq!(early.released, 0);
        assert_eq!(early.claimed, 0);

        let later = now + chrono::Duration::seconds(CLAIM_LEASE_SECS as i64 + 1);
        let stats = processor.process_due_items(later).await.unwrap();
        assert_eq!(stats.released, 1);
        assert_eq!(stats.sent, 1);
        let item = queue_store::get_item(&pool, "q1").await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Sent);
        assert_eq!(item.attempt_count, 2);
    }

    #[tokio::test]
    async fn test_without_mailer_emails_stay_pending() {
        let pool = create_test_pool().await;
        let now = Utc::now();
        queue_email(&pool, "q1", now).await;
        let stats = processor_with(&pool, None).process_due_items(now).await.unwrap();
        assert_eq!(stats.claimed, 0);
        let item = queue_store::get_item(&pool, "q1").await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
    }
}
