//! Match confidence scoring.
//!
//! A priority/cap scheme rather than a weighted average: a byte-identical file
//! hash is authoritative, text excerpts corroborate, and a screenshot or a
//! traced redirect chain only add context.

use crate::models::EvidencePacket;

const EXCERPT_WEIGHT: f64 = 0.15;
const EXCERPT_CAP: f64 = 0.5;
const SCREENSHOT_BONUS: f64 = 0.2;
const REDIRECT_CHAIN_BONUS: f64 = 0.1;
const HASH_MATCH_FLOOR: f64 = 0.95;

/// Confidence in `[0, 1]` that `evidence` shows the protected product.
pub fn calculate_match_confidence(evidence: &EvidencePacket) -> f64 {
    let mut score = (EXCERPT_WEIGHT * evidence.matched_excerpts.len() as f64).min(EXCERPT_CAP);
    if !evidence.hash_matches.is_empty() {
        score = score.max(HASH_MATCH_FLOOR);
    }
    if !evidence.screenshots.is_empty() {
        score += SCREENSHOT_BONUS;
    }
    if evidence.url_chain.len() > 1 {
        score += REDIRECT_CHAIN_BONUS;
    }
    score.clamp(0.0, 1.0)
}
