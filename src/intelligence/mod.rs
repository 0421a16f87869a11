//! Intelligence engine and AI filter.
//!
//! Verify/reject decisions are folded into per-product learning patterns.
//! Those patterns then bias search queries, filter prompts and keyword
//! extraction for later scans.

mod fetch;
mod filter;
mod keywords;
mod learning;
mod llm;
mod query;

pub use fetch::fetch_intelligence_for_scan;
pub use filter::{
    classify, filter_search_result, filter_search_results, load_few_shot_examples,
    FewShotExample, FilterDecision, FilterOutcome, FilterThresholds, SearchResult,
};
pub use keywords::{refresh_keywords, RefreshOutcome};
pub use learning::{feedback_patterns, learn_from_feedback};
pub use llm::{parse_json_content, LlmClient, OpenAiClient};
pub use query::optimize_query;

#[cfg(test)]
pub(crate) use llm::test_support;
