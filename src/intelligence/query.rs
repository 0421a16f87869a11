//! Search query tuning from learned intelligence.

use crate::models::IntelligenceData;

const MAX_EXTRA_KEYWORDS: usize = 2;
const MAX_SITE_EXCLUSIONS: usize = 3;

/// Appends up to two verified keywords not already in `base` and up to three
/// `-site:` exclusions for known false positive domains.
pub fn optimize_query(base: &str, intelligence: &IntelligenceData) -> String {
    let mut query = base.trim().to_string();
    let lowered = query.to_lowercase();

    let keywords = intelligence
        .verified_keywords
        .iter()
        .filter(|k| !k.trim().is_empty() && !lowered.contains(&k.to_lowercase()))
        .take(MAX_EXTRA_KEYWORDS);
    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.contains(' ') {
            query.push_str(&format!(" \"{keyword}\""));
        } else {
            query.push(' ');
            query.push_str(keyword);
        }
    }

    for domain in intelligence.false_positive_domains.iter().take(MAX_SITE_EXCLUSIONS) {
        query.push_str(" -site:");
        query.push_str(domain.trim());
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_keywords_and_exclusions() {
        let intelligence = IntelligenceData {
            verified_keywords: vec![
                "ultimate brain".into(),
                "second brain".into(),
                "notion".into(),
                "para".into(),
            ],
            false_positive_domains: vec![
                "reddit.com".into(),
                "notion.so".into(),
                "medium.com".into(),
                "youtube.com".into(),
            ],
            ..Default::default()
        };
        let query = optimize_query("Ultimate Brain free download", &intelligence);
        assert_eq!(
            query,
            "Ultimate Brain free download \"second brain\" notion -site:reddit.com -site:notion.so -site:medium.com"
        );
    }

    #[test]
    fn test_empty_intelligence_keeps_base() {
        assert_eq!(
            optimize_query("  ultimate brain ", &IntelligenceData::default()),
            "ultimate brain"
        );
    }
}
