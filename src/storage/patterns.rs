//! Learning pattern repository.
//!
//! Counters are incremented inside the upsert itself, so concurrent feedback
//! events on the same key merge their counts instead of overwriting each other.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::{LearningPattern, PatternType};

use super::utils::{parse_enum, to_ms};

/// Records one verify (`verified = true`) or reject observation of a pattern.
///
/// `verified_count` always counts verifications. Confidence is the share of
/// observations supporting the pattern: verifications for `verified_*` types,
/// rejections for `false_positive_*` types.
pub async fn upsert_pattern(
    pool: &SqlitePool,
    product_id: &str,
    pattern_type: PatternType,
    pattern_value: &str,
    verified: bool,
) -> Result<(), DatabaseError> {
    let verified_inc: i64 = i64::from(verified);
    let fp = i64::from(pattern_type.is_false_positive());
    // confidence = supporting / occurrences, computed from the post-increment counters
    sqlx::query(
        "INSERT INTO learning_patterns (
            product_id, pattern_type, pattern_value, confidence_score, occurrences, verified_count, last_seen_ms
        ) VALUES (?1, ?2, ?3,
            CASE WHEN ?5 = 1 THEN 1.0 - ?4 ELSE ?4 END,
            1, ?4, ?6)
        ON CONFLICT(product_id, pattern_type, pattern_value) DO UPDATE SET
            occurrences = occurrences + 1,
            verified_count = verified_count + ?4,
            confidence_score = CASE WHEN ?5 = 1
                THEN CAST((occurrences + 1) - (verified_count + ?4) AS REAL) / (occurrences + 1)
                ELSE CAST(verified_count + ?4 AS REAL) / (occurrences + 1)
            END,
            last_seen_ms = ?6",
    )
    .bind(product_id)
    .bind(pattern_type.as_ref())
    .bind(pattern_value)
    .bind(verified_inc)
    .bind(fp)
    .bind(to_ms(Utc::now()))
    .execute(pool)
    .await?;
    Ok(())
}

/// Highest-confidence patterns of one type for a product.
pub async fn top_patterns(
    pool: &SqlitePool,
    product_id: &str,
    pattern_type: PatternType,
    min_confidence: f64,
    limit: i64,
) -> Result<Vec<LearningPattern>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT product_id, pattern_type, pattern_value, confidence_score, occurrences, verified_count
         FROM learning_patterns
         WHERE product_id = ? AND pattern_type = ? AND confidence_score >= ?
         ORDER BY confidence_score DESC, occurrences DESC
         LIMIT ?",
    )
    .bind(product_id)
    .bind(pattern_type.as_ref())
    .bind(min_confidence)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let kind: String = row.try_get("pattern_type")?;
            Ok(LearningPattern {
                product_id: row.try_get("product_id")?,
                pattern_type: parse_enum("learning_patterns.pattern_type", &kind)?,
                pattern_value: row.try_get("pattern_value")?,
                confidence_score: row.try_get("confidence_score")?,
                occurrences: row.try_get("occurrences")?,
                verified_count: row.try_get("verified_count")?,
            })
        })
        .collect()
}
