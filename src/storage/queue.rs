//! DMCA queue repository.
//!
//! Every status change is a conditional `UPDATE ... WHERE status = ?` so the
//! store, not process memory, decides which worker owns an item.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::{DmcaQueueItem, QueueStatus};

use super::utils::{from_ms, parse_enum, to_ms};

const ITEM_COLUMNS: &str = "id, batch_id, user_id, infringement_id, recipient, recipient_name,
    delivery_method, notice_subject, notice_body, status, attempt_count, scheduled_for_ms,
    created_at_ms, completed_at_ms, error_message";

fn row_to_item(row: &SqliteRow) -> Result<DmcaQueueItem, DatabaseError> {
    let method: String = row.try_get("delivery_method")?;
    let status: String = row.try_get("status")?;
    let completed_at: Option<i64> = row.try_get("completed_at_ms")?;
    Ok(DmcaQueueItem {
        id: row.try_get("id")?,
        batch_id: row.try_get("batch_id")?,
        user_id: row.try_get("user_id")?,
        infringement_id: row.try_get("infringement_id")?,
        recipient: row.try_get("recipient")?,
        recipient_name: row.try_get("recipient_name")?,
        delivery_method: parse_enum("dmca_queue.delivery_method", &method)?,
        notice_subject: row.try_get("notice_subject")?,
        notice_body: row.try_get("notice_body")?,
        status: parse_enum("dmca_queue.status", &status)?,
        attempt_count: row.try_get("attempt_count")?,
        scheduled_for: from_ms(row.try_get("scheduled_for_ms")?),
        created_at: from_ms(row.try_get("created_at_ms")?),
        completed_at: completed_at.map(from_ms),
        error_message: row.try_get("error_message")?,
    })
}

/// Inserts all items of a batch in one transaction; either every item is
/// queued or none is.
pub async fn insert_batch(pool: &SqlitePool, items: &[DmcaQueueItem]) -> Result<(), DatabaseError> {
    insert_items(pool, items, None).await?;
    Ok(())
}

/// Inserts the batch only if `user_id` has no batch created after `since`.
///
/// The check is the first statement of the insert transaction, so the write
/// lock is held while it runs and two concurrent submissions cannot both pass.
/// Returns `Ok(false)` and inserts nothing when a recent batch exists.
pub async fn insert_batch_unless_recent(
    pool: &SqlitePool,
    items: &[DmcaQueueItem],
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    insert_items(pool, items, Some((user_id, since))).await
}

async fn insert_items(
    pool: &SqlitePool,
    items: &[DmcaQueueItem],
    recent_guard: Option<(&str, DateTime<Utc>)>,
) -> Result<bool, DatabaseError> {
    let plain = format!(
        "INSERT INTO dmca_queue ({ITEM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    let guarded = format!(
        "INSERT INTO dmca_queue ({ITEM_COLUMNS})
         SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
         WHERE NOT EXISTS (SELECT 1 FROM dmca_queue WHERE user_id = ? AND created_at_ms > ?)"
    );

    let mut tx = pool.begin().await?;
    for (index, item) in items.iter().enumerate() {
        let guard = recent_guard.filter(|_| index == 0);
        let sql = if guard.is_some() { &guarded } else { &plain };
        let mut query = sqlx::query(sql)
            .bind(&item.id)
            .bind(&item.batch_id)
            .bind(&item.user_id)
            .bind(&item.infringement_id)
            .bind(&item.recipient)
            .bind(&item.recipient_name)
            .bind(item.delivery_method.as_ref())
            .bind(&item.notice_subject)
            .bind(&item.notice_body)
            .bind(item.status.as_ref())
            .bind(item.attempt_count)
            .bind(to_ms(item.scheduled_for))
            .bind(to_ms(item.created_at))
            .bind(item.completed_at.map(to_ms))
            .bind(&item.error_message);
        if let Some((user_id, since)) = guard {
            query = query.bind(user_id).bind(to_ms(since));
        }
        let result = query.execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
    }
    tx.commit().await?;
    Ok(true)
}

/// Creation time of the user's most recent batch.
pub async fn last_batch_created_at(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    let ms: Option<i64> =
        sqlx::query_scalar("SELECT MAX(created_at_ms) FROM dmca_queue WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(ms.map(from_ms))
}

/// Parks due web form and manual items as `web_form`; they are never sent
/// automatically. Returns the parked items.
pub async fn mark_due_web_forms(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<Vec<DmcaQueueItem>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "UPDATE dmca_queue SET status = 'web_form', completed_at_ms = ?
         WHERE status = 'pending' AND delivery_method != 'email' AND scheduled_for_ms <= ?
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(to_ms(now))
    .bind(to_ms(now))
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_item).collect()
}

/// Claims up to `limit` due email items by moving them to `processing` and
/// counting the attempt. An item claimed here is invisible to other workers
/// until it is finished, released, or its lease expires.
pub async fn claim_due_email_items(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<DmcaQueueItem>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "UPDATE dmca_queue
         SET status = 'processing', attempt_count = attempt_count + 1, claimed_at_ms = ?
         WHERE id IN (
             SELECT id FROM dmca_queue
             WHERE status = 'pending' AND delivery_method = 'email' AND scheduled_for_ms <= ?
             ORDER BY scheduled_for_ms ASC
             LIMIT ?
         ) AND status = 'pending'
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(to_ms(now))
    .bind(to_ms(now))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    let mut items = rows
        .iter()
        .map(row_to_item)
        .collect::<Result<Vec<_>, _>>()?;
    items.sort_by_key(|item| item.scheduled_for);
    Ok(items)
}

pub async fn mark_sent(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE dmca_queue SET status = 'sent', completed_at_ms = ?, error_message = NULL
         WHERE id = ? AND status = 'processing'",
    )
    .bind(to_ms(now))
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_failed(
    pool: &SqlitePool,
    id: &str,
    error: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE dmca_queue SET status = 'failed', completed_at_ms = ?, error_message = ?
         WHERE id = ? AND status = 'processing'",
    )
    .bind(to_ms(now))
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Puts a failed item back to `pending` for another attempt at `retry_at`,
/// provided it has not used up `max_attempts`.
pub async fn requeue_failed(
    pool: &SqlitePool,
    id: &str,
    retry_at: DateTime<Utc>,
    max_attempts: i64,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE dmca_queue SET status = 'pending', scheduled_for_ms = ?, completed_at_ms = NULL
         WHERE id = ? AND status = 'failed' AND attempt_count < ?",
    )
    .bind(to_ms(retry_at))
    .bind(id)
    .bind(max_attempts)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

// Back to `pending` while attempts remain, otherwise `failed`.
const RELEASE_SET: &str = "status = CASE WHEN attempt_count < ? THEN 'pending' ELSE 'failed' END,
    completed_at_ms = CASE WHEN attempt_count < ? THEN NULL ELSE ? END,
    scheduled_for_ms = ?, claimed_at_ms = NULL, error_message = ?";

/// Returns one claimed item to the queue after its processing was interrupted.
pub async fn release_claim(
    pool: &SqlitePool,
    id: &str,
    error: &str,
    retry_at: DateTime<Utc>,
    max_attempts: i64,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(&format!(
        "UPDATE dmca_queue SET {RELEASE_SET} WHERE id = ? AND status = 'processing'"
    ))
    .bind(max_attempts)
    .bind(max_attempts)
    .bind(to_ms(retry_at))
    .bind(to_ms(retry_at))
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Releases every claim taken at or before `claimed_before` whose worker never
/// finished it. Returns the number released.
pub async fn release_stale_claims(
    pool: &SqlitePool,
    claimed_before: DateTime<Utc>,
    now: DateTime<Utc>,
    max_attempts: i64,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(&format!(
        "UPDATE dmca_queue SET {RELEASE_SET}
         WHERE status = 'processing' AND COALESCE(claimed_at_ms, 0) <= ?"
    ))
    .bind(max_attempts)
    .bind(max_attempts)
    .bind(to_ms(now))
    .bind(to_ms(now))
    .bind("Claim expired before delivery was recorded")
    .bind(to_ms(claimed_before))
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn get_item(pool: &SqlitePool, id: &str) -> Result<Option<DmcaQueueItem>, DatabaseError> {
    let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM dmca_queue WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_item).transpose()
}

/// Items of one batch in enqueue (schedule) order.
pub async fn list_batch_items(
    pool: &SqlitePool,
    batch_id: &str,
) -> Result<Vec<DmcaQueueItem>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM dmca_queue WHERE batch_id = ?
         ORDER BY scheduled_for_ms ASC, rowid ASC"
    ))
    .bind(batch_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_item).collect()
}

/// Skips every item of the batch that is still `pending`. Returns the number skipped.
pub async fn cancel_batch(
    pool: &SqlitePool,
    batch_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "UPDATE dmca_queue SET status = 'skipped', completed_at_ms = ?, error_message = 'Cancelled by user'
         WHERE batch_id = ? AND status = ?",
    )
    .bind(to_ms(now))
    .bind(batch_id)
    .bind(QueueStatus::Pending.as_ref())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
