//! Evidence snapshot repository.
//!
//! The canonical content and its hash are written once. Only the timestamp
//! proof (pending to confirmed/failed) and the append-only chain of custody
//! change afterwards.

use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::{
    Attestation, CustodyEntry, EvidenceSnapshot, SnapshotContent, TimestampProof,
};

use super::utils::{from_json_opt, to_json, to_ms};

const SELECT_COLUMNS: &str = "SELECT id, infringement_id, content_hash, canonical_content,
    timestamp_proof, chain_of_custody, attestation FROM evidence_snapshots";

fn row_to_snapshot(row: &SqliteRow) -> Result<EvidenceSnapshot, DatabaseError> {
    let content: String = row.try_get("canonical_content")?;
    let custody: Option<Vec<CustodyEntry>> = from_json_opt(row.try_get("chain_of_custody")?)?;
    let attestation: String = row.try_get("attestation")?;
    Ok(EvidenceSnapshot {
        id: row.try_get("id")?,
        infringement_id: row.try_get("infringement_id")?,
        content_hash: row.try_get("content_hash")?,
        content: serde_json::from_str::<SnapshotContent>(&content)?,
        timestamp_proof: from_json_opt(row.try_get("timestamp_proof")?)?,
        chain_of_custody: custody.unwrap_or_default(),
        attestation: serde_json::from_str::<Attestation>(&attestation)?,
    })
}

/// Persists a new snapshot together with the exact canonical text that was hashed.
///
/// Takes any executor so the insert can join the verification transaction.
pub async fn insert_snapshot<'e, E>(
    executor: E,
    snapshot: &EvidenceSnapshot,
    canonical_content: &str,
) -> Result<(), DatabaseError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let captured_at_ms = DateTime::parse_from_rfc3339(&snapshot.content.captured_at)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|_| to_ms(snapshot.attestation.signed_at));
    let proof = snapshot.timestamp_proof.as_ref().map(to_json).transpose()?;

    sqlx::query(
        "INSERT INTO evidence_snapshots (
            id, infringement_id, content_hash, canonical_content, timestamp_proof,
            chain_of_custody, attestation, captured_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&snapshot.id)
    .bind(&snapshot.infringement_id)
    .bind(&snapshot.content_hash)
    .bind(canonical_content)
    .bind(proof)
    .bind(to_json(&snapshot.chain_of_custody)?)
    .bind(to_json(&snapshot.attestation)?)
    .bind(captured_at_ms)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_snapshot(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<EvidenceSnapshot>, DatabaseError> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_snapshot).transpose()
}

pub async fn get_snapshot_for_infringement(
    pool: &SqlitePool,
    infringement_id: &str,
) -> Result<Option<EvidenceSnapshot>, DatabaseError> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE infringement_id = ?"))
        .bind(infringement_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_snapshot).transpose()
}

/// Stores a new proof, but only while the stored one is absent or pending.
///
/// Returns `Ok(false)` when the stored proof already reached a final status.
pub async fn update_timestamp_proof(
    pool: &SqlitePool,
    id: &str,
    proof: &TimestampProof,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE evidence_snapshots SET timestamp_proof = ?
         WHERE id = ?
           AND (timestamp_proof IS NULL OR json_extract(timestamp_proof, '$.status') = 'pending')",
    )
    .bind(to_json(proof)?)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Appends one custody entry in place, without rewriting existing entries.
pub async fn append_custody(
    pool: &SqlitePool,
    id: &str,
    entry: &CustodyEntry,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE evidence_snapshots
         SET chain_of_custody = json_insert(chain_of_custody, '$[#]', json(?))
         WHERE id = ?",
    )
    .bind(to_json(entry)?)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Snapshots whose proof is still waiting for a Bitcoin attestation, oldest first.
pub async fn list_pending_timestamps(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<EvidenceSnapshot>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "{SELECT_COLUMNS} WHERE json_extract(timestamp_proof, '$.status') = 'pending'
         ORDER BY captured_at_ms ASC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_snapshot).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidencePacket, InfrastructureSnapshot, InfringementStatus, TimestampStatus};
    use crate::storage::test_helpers::{create_test_pool, seed_infringement};
    use chrono::Utc;

    fn snapshot(infringement_id: &str, proof: Option<TimestampProof>) -> EvidenceSnapshot {
        let now = Utc::now();
        EvidenceSnapshot {
            id: "snap-1".to_string(),
            infringement_id: infringement_id.to_string(),
            content_hash: "ab".repeat(32),
            content: SnapshotContent {
                url: "https://leaks.example.net/x".to_string(),
                screenshot_ref: None,
                html_ref: None,
                infrastructure: InfrastructureSnapshot::default(),
                evidence: EvidencePacket::default(),
                captured_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
            timestamp_proof: proof,
            chain_of_custody: vec![CustodyEntry {
                action: "created".to_string(),
                actor: "u1".to_string(),
                timestamp: now,
            }],
            attestation: Attestation {
                statement: "statement".to_string(),
                actor: "u1".to_string(),
                signed_at: now,
                signature: "cd".repeat(32),
            },
        }
    }

    fn proof(status: TimestampStatus) -> TimestampProof {
        TimestampProof {
            hash: "ab".repeat(32),
            proof: Some("AAEC".to_string()),
            status,
            confirmed_at: None,
            block_height: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_custody_is_appended() {
        let pool = create_test_pool().await;
        let inf = seed_infringement(&pool, "u1", InfringementStatus::Active).await;
        let snap = snapshot(&inf.id, None);
        let canonical = serde_json::to_string(&snap.content).unwrap();
        insert_snapshot(&pool, &snap, &canonical).await.unwrap();

        append_custody(
            &pool,
            &snap.id,
            &CustodyEntry {
                action: "notice_generated".to_string(),
                actor: "u1".to_string(),
                timestamp: Utc::now(),
            },
        )
        .await
        .unwrap();

        let loaded = get_snapshot_for_infringement(&pool, &inf.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.chain_of_custody.len(), 2);
        assert_eq!(loaded.chain_of_custody[0].action, "created");
        assert_eq!(loaded.chain_of_custody[1].action, "notice_generated");
        assert_eq!(loaded.content, snap.content);
    }

    #[tokio::test]
    async fn test_final_proof_is_never_overwritten() {
        let pool = create_test_pool().await;
        let inf = seed_infringement(&pool, "u1", InfringementStatus::Active).await;
        let snap = snapshot(&inf.id, Some(proof(TimestampStatus::Pending)));
        let canonical = serde_json::to_string(&snap.content).unwrap();
        insert_snapshot(&pool, &snap, &canonical).await.unwrap();

        assert_eq!(list_pending_timestamps(&pool, 10).await.unwrap().len(), 1);
        assert!(
            update_timestamp_proof(&pool, &snap.id, &proof(TimestampStatus::Confirmed))
                .await
                .unwrap()
        );
        assert!(
            !update_timestamp_proof(&pool, &snap.id, &proof(TimestampStatus::Pending))
                .await
                .unwrap()
        );
        let loaded = get_snapshot(&pool, &snap.id).await.unwrap().unwrap();
        assert_eq!(
            loaded.timestamp_proof.map(|p| p.status),
            Some(TimestampStatus::Confirmed)
        );
        assert!(list_pending_timestamps(&pool, 10).await.unwrap().is_empty());
    }
}
