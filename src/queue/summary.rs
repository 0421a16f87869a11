//! Batch progress aggregation.

use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::models::{BatchSummary, DmcaQueueItem, QueueStatus};
use crate::storage::queue as queue_store;

pub fn summarize_batch(batch_id: &str, items: &[DmcaQueueItem]) -> BatchSummary {
    let mut summary = BatchSummary {
        batch_id: batch_id.to_string(),
        total: items.len(),
        ..Default::default()
    };
    for item in items {
        match item.status {
            QueueStatus::Sent => summary.sent += 1,
            QueueStatus::Pending | QueueStatus::Processing => {
                summary.pending += 1;
                if item.status == QueueStatus::Pending {
                    summary.next_scheduled = Some(
                        summary
                            .next_scheduled
                            .map_or(item.scheduled_for, |t| t.min(item.scheduled_for)),
                    );
                }
            }
            QueueStatus::WebForm => summary.web_form += 1,
            QueueStatus::Failed => summary.failed += 1,
            QueueStatus::Skipped => summary.skipped += 1,
        }
    }
    summary.created_at = items.iter().map(|i| i.created_at).min();
    summary.is_complete = summary.pending == 0;
    summary
}

/// Summary and items of a batch owned by `user_id`; `None` when the batch
/// does not exist or belongs to another user.
pub async fn load_batch(
    pool: &SqlitePool,
    batch_id: &str,
    user_id: &str,
) -> Result<Option<(BatchSummary, Vec<DmcaQueueItem>)>, DatabaseError> {
    let items = queue_store::list_batch_items(pool, batch_id).await?;
    if items.is_empty() || items.iter().any(|i| i.user_id != user_id) {
        return Ok(None);
    }
    Ok(Some((summarize_batch(batch_id, &items), items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryMethod;
    use chrono::{Duration, Utc};

    fn item(status: QueueStatus, offset_min: i64) -> DmcaQueueItem {
        let now = Utc::now();
        DmcaQueueItem {
            id: format!("{status}-{offset_min}"),
            batch_id: "b1".into(),
            user_id: "u1".into(),
            infringement_id: "inf".into(),
            recipient: None,
            recipient_name: None,
            delivery_method: DeliveryMethod::Email,
            notice_subject: String::new(),
            notice_body: String::new(),
            status,
            attempt_count: 0,
            scheduled_for: now + Duration::minutes(offset_min),
            created_at: now,
            completed_at: None,
            error_message: None,
        }
    }

    #[test]
    fn test_counts_and_next_scheduled() {
        let items = vec![
            item(QueueStatus::Sent, 0),
            item(QueueStatus::Processing, 3),
            item(QueueStatus::Pending, 9),
            item(QueueStatus::Pending, 6),
            item(QueueStatus::WebForm, 0),
            item(QueueStatus::Failed, 0),
        ];
        let summary = summarize_batch("b1", &items);
        assert_eq!(summary.total, 6);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.pending, 3);
        assert_eq!(summary.web_form, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.next_scheduled, Some(items[3].scheduled_for));
        assert!(!summary.is_complete);
    }

    #[test]
    fn test_complete_when_nothing_pending() {
        let summary = summarize_batch(
            "b1",
            &[item(QueueStatus::Sent, 0), item(QueueStatus::Skipped, 3)],
        );
        assert!(summary.is_complete);
        assert_eq!(summary.next_scheduled, None);
    }
}
