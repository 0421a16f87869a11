//! Learned feedback patterns and the intelligence snapshot built from them.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatternType {
    VerifiedKeyword,
    FalsePositiveDomain,
    VerifiedPlatform,
    VerifiedHosting,
    VerifiedCountry,
    VerifiedMatchType,
    FalsePositiveHosting,
}

impl PatternType {
    /// Patterns that accumulate evidence of false positives rather than confirmations.
    pub fn is_false_positive(self) -> bool {
        matches!(
            self,
            PatternType::FalsePositiveDomain | PatternType::FalsePositiveHosting
        )
    }

    /// Minimum confidence for a pattern to be used at scan time.
    ///
    /// Exclusions are stricter: wrongly excluding a domain hides real infringements.
    pub fn min_confidence(self) -> f64 {
        match self {
            PatternType::FalsePositiveDomain | PatternType::FalsePositiveHosting => 0.7,
            PatternType::VerifiedKeyword => 0.65,
            PatternType::VerifiedPlatform
            | PatternType::VerifiedHosting
            | PatternType::VerifiedCountry
            | PatternType::VerifiedMatchType => 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPattern {
    pub product_id: String,
    pub pattern_type: PatternType,
    pub pattern_value: String,
    /// 0.0-1.0
    pub confidence_score: f64,
    pub occurrences: i64,
    pub verified_count: i64,
}

/// Aggregate of learned patterns used to bias search and filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceData {
    pub verified_keywords: Vec<String>,
    pub false_positive_domains: Vec<String>,
    pub verified_platforms: Vec<String>,
    pub verified_hosting: Vec<String>,
    pub verified_countries: Vec<String>,
    pub verified_match_types: Vec<String>,
    pub false_positive_hosting: Vec<String>,
    /// Verify/reject actions recorded for the product
    pub feedback_count: i64,
}

impl IntelligenceData {
    pub fn is_empty(&self) -> bool {
        self.verified_keywords.is_empty()
            && self.false_positive_domains.is_empty()
            && self.verified_platforms.is_empty()
            && self.verified_hosting.is_empty()
            && self.verified_countries.is_empty()
            && self.verified_match_types.is_empty()
            && self.false_positive_hosting.is_empty()
    }

    pub(crate) fn slot_mut(&mut self, pattern_type: PatternType) -> &mut Vec<String> {
        match pattern_type {
            PatternType::VerifiedKeyword => &mut self.verified_keywords,
            PatternType::FalsePositiveDomain => &mut self.false_positive_domains,
            PatternType::VerifiedPlatform => &mut self.verified_platforms,
            PatternType::VerifiedHosting => &mut self.verified_hosting,
            PatternType::VerifiedCountry => &mut self.verified_countries,
            PatternType::VerifiedMatchType => &mut self.verified_match_types,
            PatternType::FalsePositiveHosting => &mut self.false_positive_hosting,
        }
    }
}
