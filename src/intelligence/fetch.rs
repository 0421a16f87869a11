//! Intelligence snapshot for a scan.

use futures::future::join_all;
use sqlx::SqlitePool;
use strum::IntoEnumIterator;

use crate::config::INTELLIGENCE_TOP_N;
use crate::models::{IntelligenceData, PatternType};
use crate::storage::{infringements, patterns};

/// Builds [`IntelligenceData`] from the top patterns of every type, queried in
/// parallel. A failing query leaves its slot empty; this never fails.
pub async fn fetch_intelligence_for_scan(pool: &SqlitePool, product_id: &str) -> IntelligenceData {
    let queries = PatternType::iter().map(|kind| async move {
        let result = patterns::top_patterns(
            pool,
            product_id,
            kind,
            kind.min_confidence(),
            INTELLIGENCE_TOP_N,
        )
        .await;
        (kind, result)
    });

    let mut data = IntelligenceData::default();
    for (kind, result) in join_all(queries).await {
        match result {
            Ok(found) => {
                *data.slot_mut(kind) = found.into_iter().map(|p| p.pattern_value).collect();
            }
            Err(e) => log::warn!("Failed to load {kind} patterns for {product_id}: {e}"),
        }
    }
    data.feedback_count = infringements::count_feedback(pool, product_id)
        .await
        .unwrap_or_else(|e| {
            log::warn!("Failed to count feedback for {product_id}: {e}");
            0
        });
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::create_test_pool;

    #[tokio::test]
    async fn test_thresholds_applied_per_type() {
        let pool = create_test_pool().await;
        for verified in [true, true, false] {
            patterns::upsert_pattern(&pool, "p1", PatternType::VerifiedPlatform, "telegram", verified)
                .await
                .unwrap();
            // Two rejections out of three is 0.67, below the 0.7 exclusion bar
            patterns::upsert_pattern(&pool, "p1", PatternType::FalsePositiveDomain, "reddit.com", !verified)
                .await
                .unwrap();
        }
        let data = fetch_intelligence_for_scan(&pool, "p1").await;
        assert_eq!(data.verified_platforms, vec!["telegram".to_string()]);
        assert!(data.false_positive_domains.is_empty());
        assert_eq!(data.feedback_count, 0);
    }

    #[tokio::test]
    async fn test_failure_yields_empty_data() {
        let pool = create_test_pool().await;
        pool.close().await;
        let data = fetch_intelligence_for_scan(&pool, "p1").await;
        assert!(data.is_empty());
    }
}
