//! Evidence collection and preservation.
//!
//! This module provides:
//! - Concurrent, time-boxed collection of screenshot, page excerpts and redirect chain
//! - Match confidence scoring
//! - Immutable, hashed and attested evidence snapshots

mod collector;
mod confidence;
mod excerpts;
mod redirects;
mod request;
mod screenshot;
mod snapshot;
mod wayback;

pub use collector::{collect_evidence, Detection, EvidenceContext};
pub use confidence::calculate_match_confidence;
pub use excerpts::{build_search_terms, find_excerpts, is_generic_term, visible_text};
pub use redirects::trace_redirects;
pub use screenshot::{capture_screenshot, ScreenshotApi};
pub use snapshot::{
    attestation_signature, build_snapshot, canonical_json, custody_entry, sha256_hex,
    verify_integrity, CUSTODY_CREATED,
};
pub use wayback::request_archive;
