//! Infringement repository.
//!
//! Status changes go through [`update_infringement_status`], which checks the
//! transition in the application and then applies it as a compare-and-set on
//! the stored status so two concurrent reviews cannot both win.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::{
    EvidencePacket, EvidenceSnapshot, InfrastructureSnapshot, Infringement, InfringementStatus,
};

use super::snapshots;
use super::utils::{from_json_opt, from_ms, parse_enum, to_json, to_ms};

const SELECT_COLUMNS: &str = "SELECT id, product_id, source_url, platform, status, severity_score,
    match_type, match_confidence, evidence, infrastructure, evidence_snapshot_id,
    detected_at_ms, verified_at_ms FROM infringements";

fn row_to_infringement(row: &SqliteRow) -> Result<Infringement, DatabaseError> {
    let status: String = row.try_get("status")?;
    let severity: i64 = row.try_get("severity_score")?;
    let evidence: Option<EvidencePacket> = from_json_opt(row.try_get("evidence")?)?;
    let infrastructure: Option<InfrastructureSnapshot> =
        from_json_opt(row.try_get("infrastructure")?)?;
    let verified_at: Option<i64> = row.try_get("verified_at_ms")?;

    Ok(Infringement {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        source_url: row.try_get("source_url")?,
        platform: row.try_get("platform")?,
        status: parse_enum("infringements.status", &status)?,
        severity_score: severity.clamp(0, 100) as u8,
        match_type: row.try_get("match_type")?,
        match_confidence: row.try_get("match_confidence")?,
        evidence,
        infrastructure: infrastructure.unwrap_or_default(),
        evidence_snapshot_id: row.try_get("evidence_snapshot_id")?,
        detected_at: from_ms(row.try_get("detected_at_ms")?),
        verified_at: verified_at.map(from_ms),
    })
}

/// Inserts a new infringement as produced by scan ingestion.
pub async fn insert_infringement(
    pool: &SqlitePool,
    infringement: &Infringement,
) -> Result<(), DatabaseError> {
    let evidence = infringement.evidence.as_ref().map(to_json).transpose()?;
    sqlx::query(
        "INSERT INTO infringements (
            id, product_id, source_url, platform, status, severity_score, match_type,
            match_confidence, evidence, infrastructure, evidence_snapshot_id,
            detected_at_ms, verified_at_ms, updated_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&infringement.id)
    .bind(&infringement.product_id)
    .bind(&infringement.source_url)
    .bind(&infringement.platform)
    .bind(infringement.status.as_ref())
    .bind(i64::from(infringement.severity_score.min(100)))
    .bind(&infringement.match_type)
    .bind(infringement.match_confidence)
    .bind(evidence)
    .bind(to_json(&infringement.infrastructure)?)
    .bind(&infringement.evidence_snapshot_id)
    .bind(to_ms(infringement.detected_at))
    .bind(infringement.verified_at.map(to_ms))
    .bind(to_ms(Utc::now()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_infringement(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Infringement>, DatabaseError> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_infringement).transpose()
}

/// Moves an infringement from `expected` to `next`.
///
/// Returns `Ok(false)` when the transition is not allowed or when the stored
/// status no longer equals `expected`. Leaving `pending_verification` stamps
/// `verified_at_ms`, which records when the owner reviewed the detection.
pub async fn update_infringement_status(
    pool: &SqlitePool,
    id: &str,
    expected: InfringementStatus,
    next: InfringementStatus,
) -> Result<bool, DatabaseError> {
    if !expected.can_transition_to(next) {
        return Ok(false);
    }
    let now = to_ms(Utc::now());
    let reviewed_at = (expected == InfringementStatus::PendingVerification).then_some(now);
    let result = sqlx::query(
        "UPDATE infringements
         SET status = ?, updated_at_ms = ?, verified_at_ms = COALESCE(?, verified_at_ms)
         WHERE id = ? AND status = ?",
    )
    .bind(next.as_ref())
    .bind(now)
    .bind(reviewed_at)
    .bind(id)
    .bind(expected.as_ref())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Records a completed verification in one transaction.
///
/// The status moves from `expected` to `active` as a compare-and-set, the
/// enriched infrastructure, evidence and snapshot link are written, and the
/// snapshot itself is inserted. Returns `Ok(false)` without writing anything
/// when the stored status no longer equals `expected`. Any error rolls the
/// whole verification back, so a failed attempt can be retried.
pub async fn commit_verification(
    pool: &SqlitePool,
    infringement: &Infringement,
    expected: InfringementStatus,
    match_confidence: f64,
    snapshot: &EvidenceSnapshot,
    canonical_content: &str,
) -> Result<bool, DatabaseError> {
    if !expected.can_transition_to(InfringementStatus::Active) {
        return Ok(false);
    }
    let now = to_ms(Utc::now());
    let reviewed_at = (expected == InfringementStatus::PendingVerification).then_some(now);
    let evidence = infringement.evidence.as_ref().map(to_json).transpose()?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE infringements
         SET status = ?, infrastructure = ?, evidence = ?, match_confidence = ?,
             evidence_snapshot_id = ?, updated_at_ms = ?,
             verified_at_ms = COALESCE(?, verified_at_ms)
         WHERE id = ? AND status = ? AND evidence_snapshot_id IS NULL",
    )
    .bind(InfringementStatus::Active.as_ref())
    .bind(to_json(&infringement.infrastructure)?)
    .bind(evidence)
    .bind(match_confidence)
    .bind(&snapshot.id)
    .bind(now)
    .bind(reviewed_at)
    .bind(&infringement.id)
    .bind(expected.as_ref())
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() != 1 {
        return Ok(false);
    }
    snapshots::insert_snapshot(&mut *tx, snapshot, canonical_content).await?;
    tx.commit().await?;
    Ok(true)
}

/// Most recently reviewed infringements of a product in the given status,
/// used as few-shot examples for the AI filter.
pub async fn list_feedback_examples(
    pool: &SqlitePool,
    product_id: &str,
    status: InfringementStatus,
    limit: i64,
) -> Result<Vec<Infringement>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "{SELECT_COLUMNS} WHERE product_id = ? AND status = ? AND verified_at_ms IS NOT NULL
         ORDER BY verified_at_ms DESC LIMIT ?"
    ))
    .bind(product_id)
    .bind(status.as_ref())
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_infringement).collect()
}

/// Number of verify/reject decisions recorded for a product.
pub async fn count_feedback(pool: &SqlitePool, product_id: &str) -> Result<i64, DatabaseError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM infringements WHERE product_id = ? AND verified_at_ms IS NOT NULL",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
