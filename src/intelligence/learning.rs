//! Pattern learning from verify/reject feedback.

use sqlx::SqlitePool;

use crate::domain::{extract_domain, normalized_host};
use crate::error_handling::DatabaseError;
use crate::models::{Infringement, PatternType, Product};
use crate::storage::patterns;
use crate::targets::UNKNOWN_PLATFORM;

/// Pattern observations carried by one feedback event.
///
/// Every event touches every type it has a value for; `verified` then decides
/// whether the observation supports the pattern (verified types) or counts
/// against it (false positive types).
pub fn feedback_patterns(infringement: &Infringement, product: &Product) -> Vec<(PatternType, String)> {
    let mut out: Vec<(PatternType, String)> = Vec::new();
    let mut push = |kind: PatternType, value: &str| {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|(k, v)| *k == kind && v.eq_ignore_ascii_case(value)) {
            out.push((kind, value.to_string()));
        }
    };

    for keyword in matched_keywords(infringement, product) {
        push(PatternType::VerifiedKeyword, &keyword);
    }
    if infringement.platform != UNKNOWN_PLATFORM {
        push(PatternType::VerifiedPlatform, &infringement.platform);
    }
    let infra = &infringement.infrastructure;
    if let Some(hosting) = infra.hosting_provider.as_deref() {
        push(PatternType::VerifiedHosting, hosting);
        push(PatternType::FalsePositiveHosting, hosting);
    }
    if let Some(country) = infra.country.as_deref() {
        push(PatternType::VerifiedCountry, &country.to_uppercase());
    }
    if let Some(match_type) = infringement.match_type.as_deref() {
        push(PatternType::VerifiedMatchType, match_type);
    }
    let domain = extract_domain(&infringement.source_url)
        .or_else(|_| normalized_host(&infringement.source_url));
    if let Ok(domain) = domain {
        push(PatternType::FalsePositiveDomain, &domain);
    }
    out
}

/// Product keywords that the detection actually matched on: excerpt terms
/// first, then keywords found in the URL itself.
fn matched_keywords(infringement: &Infringement, product: &Product) -> Vec<String> {
    let mut keywords: Vec<String> = infringement
        .evidence
        .iter()
        .flat_map(|e| e.matched_excerpts.iter().map(|m| m.term.to_lowercase()))
        .collect();
    let url = infringement.source_url.to_lowercase();
    for keyword in product.all_keywords() {
        let lowered = keyword.to_lowercase();
        let slug = lowered.replace(' ', "-");
        if url.contains(&lowered) || url.contains(&slug) {
            keywords.push(lowered);
        }
    }
    keywords
}

/// Records a verify (`verified = true`) or reject decision against every
/// pattern it carries. Returns the number of patterns updated.
pub async fn learn_from_feedback(
    pool: &SqlitePool,
    infringement: &Infringement,
    product: &Product,
    verified: bool,
) -> Result<usize, DatabaseError> {
    let observations = feedback_patterns(infringement, product);
    for (kind, value) in &observations {
        patterns::upsert_pattern(pool, &product.id, *kind, value, verified).await?;
    }
    log::debug!(
        "Learned {} patterns from {} feedback on {}",
        observations.len(),
        if verified { "verify" } else { "reject" },
        infringement.id
    );
    Ok(observations.len())
}
