//! Periodic upgrade of pending timestamp proofs.

use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::evidence::custody_entry;
use crate::models::TimestampStatus;
use crate::storage::snapshots;

use super::TimestampService;

/// Custody actor for changes made by background jobs.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeStats {
    pub checked: usize,
    pub confirmed: usize,
    pub failed: usize,
}

/// Walks snapshots with pending proofs (oldest first, at most `limit`) and
/// stores every proof whose status changed, with a custody entry.
pub async fn upgrade_pending_timestamps(
    pool: &SqlitePool,
    service: &TimestampService,
    limit: i64,
) -> Result<UpgradeStats, DatabaseError> {
    let mut stats = UpgradeStats::default();
    for snapshot in snapshots::list_pending_timestamps(pool, limit).await? {
        let Some(proof) = &snapshot.timestamp_proof else {
            continue;
        };
        stats.checked += 1;
        let upgraded = service.upgrade_timestamp(proof).await;
        let action = match upgraded.status {
            TimestampStatus::Pending => continue,
            TimestampStatus::Confirmed => {
                stats.confirmed += 1;
                "timestamp_confirmed"
            }
            TimestampStatus::Failed => {
                stats.failed += 1;
                "timestamp_failed"
            }
        };
        if snapshots::update_timestamp_proof(pool, &snapshot.id, &upgraded).await? {
            snapshots::append_custody(pool, &snapshot.id, &custody_entry(action, SYSTEM_ACTOR))
                .await?;
            log::info!("Snapshot {} {action}", snapshot.id);
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::build_snapshot;
    use crate::models::{EvidencePacket, InfringementStatus};
    use crate::storage::test_helpers::{create_test_pool, seed_infringement};
    use crate::timestamp::test_support::{service, FakeNotary};
    use chrono::Utc;

    #[tokio::test]
    async fn test_pending_proofs_are_confirmed_and_logged() {
        let pool = create_test_pool().await;
        let inf = seed_infringement(&pool, "u1", InfringementStatus::Active).await;
        let svc = service(FakeNotary {
            fail_stamp: false,
            upgraded: Some(vec![7, 7]),
            block_time: 1_713_571_767,
        });

        let (mut snap, canonical) =
            build_snapshot(&inf, &EvidencePacket::default(), "u1", Utc::now()).unwrap();
        snap.timestamp_proof = Some(svc.create_timestamp(&snap.content_hash).await);
        snapshots::insert_snapshot(&pool, &snap, &canonical).await.unwrap();

        let stats = upgrade_pending_timestamps(&pool, &svc, 10).await.unwrap();
        assert_eq!(
            stats,
            UpgradeStats {
                checked: 1,
                confirmed: 1,
                failed: 0
            }
        );

        let stored = snapshots::get_snapshot(&pool, &snap.id).await.unwrap().unwrap();
        assert_eq!(
            stored.timestamp_proof.map(|p| p.status),
            Some(TimestampStatus::Confirmed)
        );
        assert_eq!(stored.chain_of_custody.last().unwrap().action, "timestamp_confirmed");

        // Nothing left to do
        let stats = upgrade_pending_timestamps(&pool, &svc, 10).await.unwrap();
        assert_eq!(stats.checked, 0);
    }

    #[tokio::test]
    async fn test_still_pending_is_left_alone() {
        let pool = create_test_pool().await;
        let inf = seed_infringement(&pool, "u1", InfringementStatus::Active).await;
        let svc = service(FakeNotary {
            fail_stamp: false,
            upgraded: None,
            block_time: 0,
        });
        let (mut snap, canonical) =
            build_snapshot(&inf, &EvidencePacket::default(), "u1", Utc::now()).unwrap();
        snap.timestamp_proof = Some(svc.create_timestamp(&snap.content_hash).await);
        snapshots::insert_snapshot(&pool, &snap, &canonical).await.unwrap();

        let stats = upgrade_pending_timestamps(&pool, &svc, 10).await.unwrap();
        assert_eq!(stats.checked, 1);
        assert_eq!(stats.confirmed, 0);
        let stored = snapshots::get_snapshot(&pool, &snap.id).await.unwrap().unwrap();
        assert_eq!(stored.chain_of_custody.len(), 1);
    }
}
