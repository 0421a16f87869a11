//! DMCA notice generation.
//!
//! This module provides:
//! - Deterministic notice assembly from product, infringement and evidence data
//! - Completeness scoring of the resulting notice

mod builder;
mod quality;

pub use builder::{
    build_notice, ComparisonItem, Notice, NoticeContact, NoticeEvidence, NoticeSection,
    SectionKind,
};
pub use quality::{check_notice_quality, NoticeQuality, NoticeStrength, QualityFields};

use crate::models::{CopyrightProfile, Infringement, Product};
use crate::targets::ProviderContact;

impl QualityFields {
    /// Collects the quality facts for a notice built from the same inputs.
    pub fn for_notice(
        contact: &NoticeContact,
        profile: &CopyrightProfile,
        product: &Product,
        infringement: &Infringement,
        provider: &ProviderContact,
        evidence: &NoticeEvidence,
    ) -> Self {
        let packet = evidence.packet.as_ref();
        let evidence_count = packet.map_or(0, |p| {
            p.matched_excerpts.len() + p.screenshots.len() + usize::from(p.url_chain.len() > 1)
        }) + evidence.curated_items.len();
        Self {
            has_full_name: !contact.full_name.trim().is_empty(),
            has_email: contact.email.contains('@'),
            has_phone: contact.phone.as_deref().is_some_and(|p| !p.trim().is_empty()),
            has_address: profile.has_address(),
            has_infringing_url: !infringement.source_url.trim().is_empty(),
            evidence_count,
            has_hash_match: packet.is_some_and(|p| !p.hash_matches.is_empty()),
            unique_identifier_count: product.unique_identifiers().len(),
            timestamp_status: evidence.timestamp.as_ref().map(|t| t.status),
            has_wayback: packet.is_some_and(|p| p.detection_metadata.wayback_url.is_some()),
            recipient_verified: provider.verified,
        }
    }
}
