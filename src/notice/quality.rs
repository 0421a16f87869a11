//! Rule-based completeness scoring of a notice.
//!
//! The result only informs the user; generation is never blocked.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::models::TimestampStatus;

/// Facts about a notice that the quality rules look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityFields {
    pub has_full_name: bool,
    pub has_email: bool,
    pub has_phone: bool,
    pub has_address: bool,
    pub has_infringing_url: bool,
    /// Excerpts, hash matches, screenshots or curated items
    pub evidence_count: usize,
    pub has_hash_match: bool,
    pub unique_identifier_count: usize,
    pub timestamp_status: Option<TimestampStatus>,
    pub has_wayback: bool,
    pub recipient_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoticeStrength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeQuality {
    /// 0-100
    pub score: u8,
    pub strength: NoticeStrength,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

const ERROR_PENALTY: i32 = 25;

pub fn check_notice_quality(fields: &QualityFields) -> NoticeQuality {
    let mut score: i32 = 100;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut error = |msg: &str| {
        score -= ERROR_PENALTY;
        errors.push(msg.to_string());
    };
    if !fields.has_full_name {
        error("Your full legal name is required");
    }
    if !fields.has_email {
        error("A contact email address is required");
    }
    if !fields.has_address {
        error("A physical address is required for a valid notice");
    }
    if !fields.has_infringing_url {
        error("The infringing URL is missing");
    }

    let mut warn = |penalty: i32, msg: &str| {
        score -= penalty;
        warnings.push(msg.to_string());
    };
    if !fields.has_phone {
        warn(5, "Adding a phone number makes the notice easier to act on");
    }
    if fields.evidence_count == 0 && !fields.has_hash_match {
        warn(20, "No evidence is attached; collect evidence before sending");
    } else if fields.evidence_count < 2 && !fields.has_hash_match {
        warn(10, "Only one piece of evidence is attached");
    }
    if fields.unique_identifier_count == 0 {
        warn(10, "No unique identifiers of your product are listed");
    }
    let anchored = matches!(
        fields.timestamp_status,
        Some(TimestampStatus::Confirmed | TimestampStatus::Pending)
    );
    if !anchored && !fields.has_wayback {
        warn(10, "The evidence has no blockchain timestamp or archived copy");
    } else if !anchored {
        warn(5, "The evidence has no blockchain timestamp");
    } else if !fields.has_wayback {
        warn(3, "No Wayback Machine copy of the page is referenced");
    }
    if !fields.recipient_verified {
        warn(5, "The recipient contact is not verified; check it before sending");
    }

    let score = score.clamp(0, 100) as u8;
    let strength = if !errors.is_empty() || score < 60 {
        NoticeStrength::Weak
    } else if score >= 85 {
        NoticeStrength::Strong
    } else {
        NoticeStrength::Moderate
    };
    NoticeQuality {
        score,
        strength,
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> QualityFields {
        QualityFields {
            has_full_name: true,
            has_email: true,
            has_phone: true,
            has_address: true,
            has_infringing_url: true,
            evidence_count: 3,
            has_hash_match: false,
            unique_identifier_count: 2,
            timestamp_status: Some(TimestampStatus::Confirmed),
            has_wayback: true,
            recipient_verified: true,
        }
    }

    #[test]
    fn test_complete_notice_is_strong() {
        let q = check_notice_quality(&complete());
        assert_eq!(q.score, 100);
        assert_eq!(q.strength, NoticeStrength::Strong);
        assert!(q.errors.is_empty() && q.warnings.is_empty());
    }

    #[test]
    fn test_missing_address_is_an_error() {
        let q = check_notice_quality(&QualityFields {
            has_address: false,
            ..complete()
        });
        assert_eq!(q.errors.len(), 1);
        assert_eq!(q.strength, NoticeStrength::Weak);
    }

    #[test]
    fn test_corroboration_is_credited() {
        let bare = check_notice_quality(&QualityFields {
            timestamp_status: Some(TimestampStatus::Failed),
            has_wayback: false,
            ..complete()
        });
        let wayback = check_notice_quality(&QualityFields {
            timestamp_status: None,
            ..complete()
        });
        let both = check_notice_quality(&complete());
        assert!(bare.score < wayback.score);
        assert!(wayback.score < both.score);
    }

    #[test]
    fn test_empty_fields_score_zero_but_still_report() {
        let q = check_notice_quality(&QualityFields::default());
        assert_eq!(q.score, 0);
        assert_eq!(q.errors.len(), 4);
        assert!(!q.warnings.is_empty());
    }
}
