//! Feedback-driven refresh of a product's extracted keywords.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::{KEYWORD_REFRESH_COOLDOWN_HOURS, KEYWORD_REFRESH_MIN_FEEDBACK};
use crate::models::{AiExtractedData, IntelligenceData, Product, AI_EXTRACTED_DATA_VERSION};
use crate::storage::products;

use super::fetch::fetch_intelligence_for_scan;
use super::llm::LlmClient;

const EXTRACTION_PROMPT: &str = "You extract search keywords for finding pirated copies of a digital product. \
Return a JSON object with string arrays \"keywords\", \"unique_identifiers\" (phrases that only appear in \
this product), \"brand_terms\" and \"exclusion_terms\" (words that indicate unrelated results), and an \
optional \"description\" string.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Refreshed { added_keywords: usize },
    Cooldown { next_allowed_at: DateTime<Utc> },
    InsufficientFeedback { feedback_count: i64, required: i64 },
    NotConfigured,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Extraction {
    keywords: Vec<String>,
    unique_identifiers: Vec<String>,
    brand_terms: Vec<String>,
    exclusion_terms: Vec<String>,
    description: Option<String>,
}

fn merge_terms(existing: &mut Vec<String>, new: Vec<String>) -> usize {
    let mut added = 0;
    for term in new {
        let term = term.trim();
        if !term.is_empty() && !existing.iter().any(|e| e.eq_ignore_ascii_case(term)) {
            existing.push(term.to_string());
            added += 1;
        }
    }
    added
}

/// Merges an extraction into stored data. Existing terms and unknown fields
/// are kept; returns the number of new keywords.
fn merge_extraction(data: &mut AiExtractedData, extraction: Extraction, now: DateTime<Utc>) -> usize {
    let added = merge_terms(&mut data.keywords, extraction.keywords);
    merge_terms(&mut data.unique_identifiers, extraction.unique_identifiers);
    merge_terms(&mut data.brand_terms, extraction.brand_terms);
    merge_terms(&mut data.exclusion_terms, extraction.exclusion_terms);
    if let Some(description) = extraction.description.filter(|d| !d.trim().is_empty()) {
        data.description = Some(description);
    }
    data.schema_version = AI_EXTRACTED_DATA_VERSION;
    data.last_refreshed_at = Some(now.to_rfc3339_opts(SecondsFormat::Secs, true));
    added
}

fn user_prompt(product: &Product, intelligence: &IntelligenceData) -> String {
    let mut prompt = format!("Product: {}", product.name);
    if let Some(kind) = &product.product_type {
        prompt.push_str(&format!("\nType: {kind}"));
    }
    if let Some(url) = &product.url {
        prompt.push_str(&format!("\nURL: {url}"));
    }
    prompt.push_str(&format!("\nCurrent keywords: {}", product.all_keywords().join(", ")));
    if !intelligence.verified_keywords.is_empty() {
        prompt.push_str(&format!(
            "\nKeywords found in confirmed infringements: {}",
            intelligence.verified_keywords.join(", ")
        ));
    }
    if !intelligence.false_positive_domains.is_empty() {
        prompt.push_str(&format!(
            "\nSites that produced false positives: {}",
            intelligence.false_positive_domains.join(", ")
        ));
    }
    prompt
}

/// Re-runs keyword extraction with learned intelligence once enough feedback
/// exists and the cooldown since the last refresh has passed.
pub async fn refresh_keywords(
    pool: &SqlitePool,
    llm: Option<&dyn LlmClient>,
    product_id: &str,
    now: DateTime<Utc>,
) -> Result<RefreshOutcome> {
    let Some(llm) = llm else {
        return Ok(RefreshOutcome::NotConfigured);
    };
    if let Some(last) = products::last_keyword_refresh(pool, product_id).await? {
        let next_allowed_at = last + Duration::hours(KEYWORD_REFRESH_COOLDOWN_HOURS);
        if now < next_allowed_at {
            return Ok(RefreshOutcome::Cooldown { next_allowed_at });
        }
    }
    let intelligence = fetch_intelligence_for_scan(pool, product_id).await;
    if intelligence.feedback_count < KEYWORD_REFRESH_MIN_FEEDBACK {
        return Ok(RefreshOutcome::InsufficientFeedback {
            feedback_count: intelligence.feedback_count,
            required: KEYWORD_REFRESH_MIN_FEEDBACK,
        });
    }
    let product = products::get_product(pool, product_id)
        .await?
        .with_context(|| format!("Product {product_id} not found"))?;

    let value = llm
        .complete_json(EXTRACTION_PROMPT, &user_prompt(&product, &intelligence))
        .await
        .context("Keyword extraction failed")?;
    let extraction: Extraction =
        serde_json::from_value(value).context("Keyword extraction returned an unexpected shape")?;

    let mut data = product.ai_extracted_data.unwrap_or_default();
    let added_keywords = merge_extraction(&mut data, extraction, now);
    products::update_ai_extracted_data(pool, product_id, &data).await?;
    products::record_keyword_refresh(pool, product_id, intelligence.feedback_count).await?;
    log::info!("Refreshed keywords for {product_id}: {added_keywords} new");
    Ok(RefreshOutcome::Refreshed { added_keywords })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::llm::test_support::ScriptedLlm;
    use crate::models::{InfringementStatus, Infringement};
    use crate::storage::infringements;
    use crate::storage::test_helpers::{create_test_pool, sample_infringement, sample_product};
    use serde_json::json;

    async fn seed_reviewed(pool: &SqlitePool, count: usize) {
        let mut product = sample_product("prod-1", "u1");
        let mut data = AiExtractedData {
            keywords: vec!["ultimate brain".into()],
            ..Default::default()
        };
        data.extra.insert("source".into(), json!("onboarding"));
        product.ai_extracted_data = Some(data);
        products::insert_product(pool, &product).await.unwrap();
        for i in 0..count {
            let inf: Infringement =
                sample_infringement(&format!("inf-{i}"), "prod-1", InfringementStatus::PendingVerification);
            infringements::insert_infringement(pool, &inf).await.unwrap();
            infringements::update_infringement_status(
                pool,
                &inf.id,
                InfringementStatus::PendingVerification,
                InfringementStatus::Active,
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_refresh_merges_without_dropping_fields() {
        let pool = create_test_pool().await;
        seed_reviewed(&pool, 5).await;
        let llm = ScriptedLlm::new(vec![Some(json!({
            "keywords": ["Ultimate Brain", "second brain notion"],
            "unique_identifiers": ["PARA dashboard"]
        }))]);
        let outcome = refresh_keywords(&pool, Some(&llm), "prod-1", Utc::now()).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { added_keywords: 1 });

        let stored = products::get_product(&pool, "prod-1").await.unwrap().unwrap();
        let data = stored.ai_extracted_data.unwrap();
        assert_eq!(data.keywords, vec!["ultimate brain".to_string(), "second brain notion".to_string()]);
        assert_eq!(data.unique_identifiers, vec!["PARA dashboard".to_string()]);
        assert_eq!(data.extra.get("source"), Some(&json!("onboarding")));
        assert!(data.last_refreshed_at.is_some());

        let again = refresh_keywords(&pool, Some(&llm), "prod-1", Utc::now()).await.unwrap();
        assert!(matches!(again, RefreshOutcome::Cooldown { .. }));
    }

    #[tokio::test]
    async fn test_refresh_requires_feedback() {
        let pool = create_test_pool().await;
        seed_reviewed(&pool, 4).await;
        let llm = ScriptedLlm::new(vec![]);
        let outcome = refresh_keywords(&pool, Some(&llm), "prod-1", Utc::now()).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::InsufficientFeedback {
                feedback_count: 4,
                required: 5
            }
        );
        assert_eq!(
            refresh_keywords(&pool, None, "prod-1", Utc::now()).await.unwrap(),
            RefreshOutcome::NotConfigured
        );
    }
}
