//! Deterministic DMCA notice assembly.
//!
//! The same inputs always produce the same text. Statutory sections are always
//! present; the evidence, comparison and exact-recreation sections are added
//! only when there is something to put in them.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::models::{
    CopyrightProfile, DeliveryMethod, EvidencePacket, Infringement, Product, TimestampProof,
    TimestampStatus,
};
use crate::targets::{platform_display_name, ProviderContact};

/// Sender identity printed in the notice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeContact {
    pub full_name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

impl NoticeContact {
    pub fn from_profile(profile: &CopyrightProfile) -> Self {
        Self {
            full_name: profile.full_name.clone().unwrap_or_default(),
            company: profile.company.clone(),
            email: profile.email.clone().unwrap_or_default(),
            phone: profile.phone.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.full_name.trim().is_empty() && self.email.contains('@')
    }
}

/// Side-by-side comparison of original and infringing content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonItem {
    pub original: String,
    pub infringing: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Evidence available when the notice is written.
#[derive(Debug, Clone, Default)]
pub struct NoticeEvidence {
    pub packet: Option<EvidencePacket>,
    /// Content hash of the verified evidence snapshot
    pub snapshot_hash: Option<String>,
    pub timestamp: Option<TimestampProof>,
    /// Free-text evidence items picked by the user
    pub curated_items: Vec<String>,
}

impl NoticeEvidence {
    fn wayback_url(&self) -> Option<&str> {
        self.packet
            .as_ref()
            .and_then(|p| p.detection_metadata.wayback_url.as_deref())
    }

    fn has_technical_detail(&self) -> bool {
        let packet_has = self.packet.as_ref().is_some_and(|p| {
            !p.hash_matches.is_empty()
                || !p.matched_excerpts.is_empty()
                || !p.screenshots.is_empty()
                || p.url_chain.len() > 1
        });
        packet_has || self.snapshot_hash.is_some() || !self.curated_items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SectionKind {
    CopyrightOwner,
    CopyrightedWork,
    InfringingMaterial,
    TechnicalEvidence,
    Comparison,
    ExactRecreation,
    GoodFaith,
    Accuracy,
    TakedownDemand,
    Signature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeSection {
    pub kind: SectionKind,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub subject: String,
    pub body: String,
    pub recipient: Option<String>,
    pub recipient_name: String,
    pub delivery_method: DeliveryMethod,
    pub sections: Vec<NoticeSection>,
}

impl Notice {
    pub fn has_section(&self, kind: SectionKind) -> bool {
        self.sections.iter().any(|s| s.kind == kind)
    }
}

fn section(kind: SectionKind, title: &str, text: String) -> NoticeSection {
    NoticeSection {
        kind,
        title: title.to_string(),
        text,
    }
}

fn owner_section(contact: &NoticeContact, profile: &CopyrightProfile) -> NoticeSection {
    let mut text = format!("Name: {}\n", contact.full_name);
    if let Some(company) = contact.company.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(text, "Company: {company}");
    }
    let _ = writeln!(text, "Email: {}", contact.email);
    if let Some(phone) = contact.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        let _ = writeln!(text, "Phone: {phone}");
    }
    let address = profile.formatted_address();
    if !address.is_empty() {
        let _ = writeln!(text, "Address: {address}");
    }
    section(
        SectionKind::CopyrightOwner,
        "Identification of the Copyright Owner",
        text.trim_end().to_string(),
    )
}

fn work_section(product: &Product) -> NoticeSection {
    let mut text = format!(
        "The copyrighted work is \"{}\"",
        product.name
    );
    if let Some(kind) = product.product_type.as_deref() {
        let _ = write!(text, ", a {kind}");
    }
    text.push_str(", an original work of authorship owned by me.");
    if let Some(url) = product.url.as_deref() {
        let _ = write!(text, "\nThe authorized original is available at: {url}");
    }
    let ids = product.unique_identifiers();
    if !ids.is_empty() {
        text.push_str("\nDistinctive elements that identify the work:");
        for id in ids {
            let _ = write!(text, "\n- {id}");
        }
    }
    section(
        SectionKind::CopyrightedWork,
        "Identification of the Copyrighted Work",
        text,
    )
}

fn infringing_section(infringement: &Infringement, evidence: &NoticeEvidence) -> NoticeSection {
    let platform = platform_display_name(&infringement.platform, &infringement.source_url);
    let mut text = format!(
        "The infringing material is located at:\n{}\nPlatform: {platform}",
        infringement.source_url
    );
    let final_url = evidence
        .packet
        .as_ref()
        .and_then(|p| p.detection_metadata.final_url.as_deref())
        .filter(|u| *u != infringement.source_url);
    if let Some(final_url) = final_url {
        let _ = write!(text, "\nThe address redirects to: {final_url}");
    }
    let _ = write!(
        text,
        "\nFirst detected: {}",
        infringement.detected_at.format("%Y-%m-%d")
    );
    section(
        SectionKind::InfringingMaterial,
        "Identification of the Infringing Material",
        text,
    )
}

fn timestamp_line(proof: &TimestampProof) -> Option<String> {
    match proof.status {
        TimestampStatus::Confirmed => Some(format!(
            "The evidence hash was anchored in the Bitcoin blockchain{}{}.",
            proof
                .block_height
                .map(|h| format!(" at block {h}"))
                .unwrap_or_default(),
            proof
                .confirmed_at
                .map(|t| format!(" on {}", t.format("%Y-%m-%d %H:%M UTC")))
                .unwrap_or_default()
        )),
        TimestampStatus::Pending => Some(
            "The evidence hash has been submitted for Bitcoin blockchain timestamping."
                .to_string(),
        ),
        TimestampStatus::Failed => None,
    }
}

fn evidence_section(evidence: &NoticeEvidence) -> Option<NoticeSection> {
    if !evidence.has_technical_detail() {
        return None;
    }
    let mut lines: Vec<String> = Vec::new();
    if let Some(packet) = &evidence.packet {
        if !packet.hash_matches.is_empty() {
            lines.push(format!(
                "Files at the infringing location are byte-for-byte identical to the original (SHA-256: {}).",
                packet.hash_matches.join(", ")
            ));
        }
        for excerpt in &packet.matched_excerpts {
            lines.push(format!("Page text: \"{}\"", excerpt.excerpt));
        }
        if let Some(shot) = packet.screenshots.first() {
            lines.push(format!("Screenshot: {}", shot.url));
        }
        if packet.url_chain.len() > 1 {
            lines.push(format!("Redirect chain: {}", packet.url_chain.join(" -> ")));
        }
    }
    if let Some(url) = evidence.wayback_url() {
        lines.push(format!("Archived copy: {url}"));
    }
    if let Some(hash) = &evidence.snapshot_hash {
        lines.push(format!("Evidence snapshot SHA-256: {hash}"));
    }
    if let Some(line) = evidence.timestamp.as_ref().and_then(timestamp_line) {
        lines.push(line);
    }
    lines.extend(evidence.curated_items.iter().map(|i| i.trim().to_string()));
    Some(section(
        SectionKind::TechnicalEvidence,
        "Supporting Evidence",
        lines
            .iter()
            .map(|l| format!("- {l}"))
            .collect::<Vec<_>>()
            .join("\n"),
    ))
}

fn comparison_section(items: &[ComparisonItem]) -> Option<NoticeSection> {
    if items.is_empty() {
        return None;
    }
    let mut text = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = write!(
            text,
            "{}. Original: {}\n   Infringing copy: {}",
            i + 1,
            item.original,
            item.infringing
        );
        if let Some(note) = item.note.as_deref() {
            let _ = write!(text, "\n   {note}");
        }
        text.push('\n');
    }
    Some(section(
        SectionKind::Comparison,
        "Side-by-Side Comparison",
        text.trim_end().to_string(),
    ))
}

fn exact_recreation_section(
    product: &Product,
    infringement: &Infringement,
    evidence: &NoticeEvidence,
) -> Option<NoticeSection> {
    let exact = infringement.match_type.as_deref() == Some("exact_copy")
        || evidence
            .packet
            .as_ref()
            .is_some_and(|p| !p.hash_matches.is_empty());
    let brand_terms: Vec<&str> = product
        .ai_extracted_data
        .iter()
        .flat_map(|d| d.brand_terms.iter())
        .map(String::as_str)
        .filter(|t| !t.trim().is_empty())
        .collect();
    if !exact && brand_terms.is_empty() {
        return None;
    }
    let mut parts: Vec<String> = Vec::new();
    if exact {
        parts.push(format!(
            "The material is an exact reproduction of \"{}\", not a derivative or \
             transformative work. It is being distributed without license.",
            product.name
        ));
    }
    if !brand_terms.is_empty() {
        parts.push(format!(
            "The listing also uses my product and brand names ({}) to pass the copy off as \
             the original, which misleads purchasers as to its source.",
            brand_terms.join(", ")
        ));
    }
    Some(section(
        SectionKind::ExactRecreation,
        "Exact Recreation and Use of Brand Names",
        parts.join("\n"),
    ))
}

/// Assembles a takedown notice addressed to `provider`.
pub fn build_notice(
    contact: &NoticeContact,
    product: &Product,
    infringement: &Infringement,
    profile: &CopyrightProfile,
    provider: &ProviderContact,
    comparison_items: &[ComparisonItem],
    evidence: &NoticeEvidence,
) -> Notice {
    let mut sections = vec![
        owner_section(contact, profile),
        work_section(product),
        infringing_section(infringement, evidence),
    ];
    sections.extend(evidence_section(evidence));
    sections.extend(comparison_section(comparison_items));
    sections.extend(exact_recreation_section(product, infringement, evidence));
    sections.push(section(
        SectionKind::GoodFaith,
        "Good Faith Statement",
        "I have a good faith belief that use of the copyrighted material described above \
         is not authorized by the copyright owner, its agent, or the law."
            .to_string(),
    ));
    sections.push(section(
        SectionKind::Accuracy,
        "Accuracy Statement",
        "I swear, under penalty of perjury, that the information in this notification is \
         accurate and that I am the copyright owner or am authorized to act on behalf of the \
         owner of an exclusive right that is allegedly infringed."
            .to_string(),
    ));
    sections.push(section(
        SectionKind::TakedownDemand,
        "Request for Removal",
        format!(
            "Pursuant to 17 U.S.C. § 512(c), I request that {} expeditiously remove or disable \
             access to the infringing material identified above.",
            provider.name
        ),
    ));
    sections.push(section(
        SectionKind::Signature,
        "Signature",
        format!("/s/ {}", contact.full_name),
    ));

    let platform = platform_display_name(&infringement.platform, &infringement.source_url);
    let mut body = format!("To the {} copyright agent,\n\n", provider.name);
    for s in &sections {
        let _ = write!(body, "{}\n{}\n\n", s.title.to_uppercase(), s.text);
    }

    Notice {
        subject: format!("DMCA Takedown Notice: {} on {platform}", product.name),
        body: body.trim_end().to_string(),
        recipient: provider.recipient(),
        recipient_name: provider.name.clone(),
        delivery_method: provider.delivery_method(),
        sections,
    }
}
