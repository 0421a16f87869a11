//! AI classification of raw search results.
//!
//! Each candidate gets one of three decisions. Anything the model cannot
//! classify cleanly is passed through as uncertain so a human reviews it;
//! only a confident negative drops a result.

use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::{Config, FILTER_CHUNK_DELAY_MS, FILTER_CHUNK_SIZE, MAX_FEW_SHOT_EXAMPLES};
use crate::error_handling::DatabaseError;
use crate::models::{IntelligenceData, InfringementStatus, Product};
use crate::storage::infringements;

use super::llm::LlmClient;

const TAXONOMY_RULES: &str = "You review web search results for a creator who sells a digital product. \
Decide whether each result distributes, resells or leaks the product without authorization.\n\
Infringement: free downloads, file-host or cloud-drive links, torrents, group or channel posts \
sharing the files, resale by someone other than the creator, copies of the product content.\n\
Not infringement: the creator's own store or pages, reviews, tutorials, discussion without files, \
news, unrelated products with similar names, affiliate links to the official store.\n\
Answer with a JSON object: {\"is_infringement\": bool, \"confidence\": number between 0 and 1, \
\"reasoning\": short string}.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDecision {
    Pass,
    UncertainPass,
    Filtered,
}

impl FilterDecision {
    /// Whether the result is kept for the user to review.
    pub fn is_kept(self) -> bool {
        self != FilterDecision::Filtered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOutcome {
    pub url: String,
    pub decision: FilterDecision,
    pub confidence: Option<f64>,
    pub reasoning: String,
}

/// A previously reviewed result shown to the model as an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub url: String,
    pub is_infringement: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterThresholds {
    pub min_confidence: f64,
    pub uncertain_floor: f64,
}

impl FilterThresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_confidence: config.filter_min_confidence,
            uncertain_floor: config.filter_uncertain_floor,
        }
    }
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Deserialize)]
struct Classification {
    is_infringement: bool,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Maps a classification onto a decision band.
pub fn classify(is_infringement: bool, confidence: f64, thresholds: &FilterThresholds) -> FilterDecision {
    if is_infringement && confidence >= thresholds.min_confidence {
        FilterDecision::Pass
    } else if confidence >= thresholds.uncertain_floor && confidence < thresholds.min_confidence {
        FilterDecision::UncertainPass
    } else {
        FilterDecision::Filtered
    }
}

/// Up to five verified and five rejected results of the product, newest first.
pub async fn load_few_shot_examples(
    pool: &SqlitePool,
    product_id: &str,
) -> Result<Vec<FewShotExample>, DatabaseError> {
    let limit = MAX_FEW_SHOT_EXAMPLES as i64;
    let mut examples = Vec::new();
    for (status, is_infringement) in [
        (InfringementStatus::Active, true),
        (InfringementStatus::FalsePositive, false),
    ] {
        for inf in infringements::list_feedback_examples(pool, product_id, status, limit).await? {
            examples.push(FewShotExample {
                url: inf.source_url,
                is_infringement,
            });
        }
    }
    Ok(examples)
}

fn build_system_prompt(intelligence: &IntelligenceData, examples: &[FewShotExample]) -> String {
    let mut prompt = TAXONOMY_RULES.to_string();

    let learned = [
        ("Keywords confirmed in past infringements", &intelligence.verified_keywords),
        ("Platforms with confirmed infringements", &intelligence.verified_platforms),
        ("Hosting providers with confirmed infringements", &intelligence.verified_hosting),
        ("Match types the owner confirmed", &intelligence.verified_match_types),
        ("Domains the owner marked as false positives", &intelligence.false_positive_domains),
        ("Hosting providers usually false positives", &intelligence.false_positive_hosting),
    ];
    let mut learned_lines: Vec<String> = learned
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(label, values)| format!("- {label}: {}", values.join(", ")))
        .collect();
    if !intelligence.verified_countries.is_empty() {
        learned_lines.push(format!(
            "- Countries with confirmed infringements: {}",
            intelligence.verified_countries.join(", ")
        ));
    }
    if !learned_lines.is_empty() {
        prompt.push_str(&format!(
            "\n\nLearned from {} owner decisions:\n{}",
            intelligence.feedback_count,
            learned_lines.join("\n")
        ));
    }

    // At most MAX_FEW_SHOT_EXAMPLES in total, split evenly when both kinds exist
    let positives: Vec<&FewShotExample> = examples.iter().filter(|e| e.is_infringement).collect();
    let negatives: Vec<&FewShotExample> = examples.iter().filter(|e| !e.is_infringement).collect();
    let negative_count = negatives.len().min(MAX_FEW_SHOT_EXAMPLES / 2);
    let positive_count = positives.len().min(MAX_FEW_SHOT_EXAMPLES - negative_count);
    let negative_count = negatives.len().min(MAX_FEW_SHOT_EXAMPLES - positive_count);
    let example_lines: Vec<String> = positives
        .into_iter()
        .take(positive_count)
        .chain(negatives.into_iter().take(negative_count))
        .map(|e| {
            let label = if e.is_infringement { "infringement" } else { "not infringement" };
            format!("- {} => {label}", e.url)
        })
        .collect();
    if !example_lines.is_empty() {
        prompt.push_str("\n\nPast decisions:\n");
        prompt.push_str(&example_lines.join("\n"));
    }
    prompt
}

fn build_user_prompt(result: &SearchResult, product: &Product) -> String {
    let mut prompt = format!("Product: {}", product.name);
    if let Some(kind) = &product.product_type {
        prompt.push_str(&format!(" ({kind})"));
    }
    if let Some(url) = &product.url {
        prompt.push_str(&format!("\nOfficial URL: {url}"));
    }
    let keywords = product.all_keywords();
    if !keywords.is_empty() {
        prompt.push_str(&format!("\nKeywords: {}", keywords.join(", ")));
    }
    prompt.push_str(&format!(
        "\n\nResult URL: {}\nTitle: {}\nSnippet: {}",
        result.url, result.title, result.snippet
    ));
    prompt
}

fn for_review(result: &SearchResult, reasoning: String) -> FilterOutcome {
    FilterOutcome {
        url: result.url.clone(),
        decision: FilterDecision::UncertainPass,
        confidence: None,
        reasoning,
    }
}

/// Classifies one result. Never fails: without a model, or on malformed
/// output, the result is passed through for review. Learned false-positive
/// domains only inform the model through the prompt; they never drop a
/// result on their own.
pub async fn filter_search_result(
    llm: Option<&dyn LlmClient>,
    result: &SearchResult,
    product: &Product,
    intelligence: &IntelligenceData,
    examples: &[FewShotExample],
    thresholds: &FilterThresholds,
) -> FilterOutcome {
    let Some(llm) = llm else {
        return for_review(result, "AI filter is not configured".to_string());
    };
    let system = build_system_prompt(intelligence, examples);
    let user = build_user_prompt(result, product);
    let value = match llm.complete_json(&system, &user).await {
        Ok(v) => v,
        Err(e) => {
            log::warn!("AI filter failed for {}: {e}", result.url);
            return for_review(result, format!("Classification unavailable: {e}"));
        }
    };
    let parsed: Classification = match serde_json::from_value(value) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("AI filter returned an unexpected shape for {}: {e}", result.url);
            return for_review(result, "Classification was malformed".to_string());
        }
    };
    if !parsed.confidence.is_finite() {
        return for_review(result, "Classification was malformed".to_string());
    }
    let confidence = parsed.confidence.clamp(0.0, 1.0);
    FilterOutcome {
        url: result.url.clone(),
        decision: classify(parsed.is_infringement, confidence, thresholds),
        confidence: Some(confidence),
        reasoning: parsed.reasoning,
    }
}

/// Classifies results in chunks, pausing between chunks. Output order
/// matches input order.
pub async fn filter_search_results(
    llm: Option<&dyn LlmClient>,
    results: &[SearchResult],
    product: &Product,
    intelligence: &IntelligenceData,
    examples: &[FewShotExample],
    thresholds: &FilterThresholds,
) -> Vec<FilterOutcome> {
    filter_in_chunks(
        llm,
        results,
        product,
        intelligence,
        examples,
        thresholds,
        FILTER_CHUNK_SIZE,
        Duration::from_millis(FILTER_CHUNK_DELAY_MS),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn filter_in_chunks(
    llm: Option<&dyn LlmClient>,
    results: &[SearchResult],
    product: &Product,
    intelligence: &IntelligenceData,
    examples: &[FewShotExample],
    thresholds: &FilterThresholds,
    chunk_size: usize,
    delay: Duration,
) -> Vec<FilterOutcome> {
    let mut outcomes = Vec::with_capacity(results.len());
    for (i, chunk) in results.chunks(chunk_size.max(1)).enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let calls = chunk.iter().map(|result| {
            filter_search_result(llm, result, product, intelligence, examples, thresholds)
        });
        outcomes.extend(join_all(calls).await);
    }
    let kept = outcomes.iter().filter(|o| o.decision.is_kept()).count();
    log::info!("AI filter kept {kept} of {} results for {}", outcomes.len(), product.id);
    outcomes
}
