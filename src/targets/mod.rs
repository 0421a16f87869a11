//! Enforcement target resolution.
//!
//! This module provides:
//! - Platform detection from a URL and per-platform DMCA contacts
//! - Hosting provider and registrar abuse contacts
//! - Escalation ranking of every party that could act on an infringement

mod hosting;
mod platforms;
mod resolve;

use serde::{Deserialize, Serialize};

use crate::models::DeliveryMethod;

pub use hosting::{hosting_contact, registrar_contact};
pub use platforms::{
    detect_platform, get_recommended_recipient, platform_contact, platform_display_name,
    FALLBACK_RECIPIENT, UNKNOWN_PLATFORM,
};
pub use resolve::{resolve_all_targets, resolve_provider, EnforcementTarget, TargetType};

/// Who receives a notice and how to reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderContact {
    pub name: String,
    pub dmca_email: Option<String>,
    pub form_url: Option<String>,
    pub verified: bool,
}

impl ProviderContact {
    /// Email wins over a web form; with neither the notice is sent by hand.
    pub fn delivery_method(&self) -> DeliveryMethod {
        if self.dmca_email.is_some() {
            DeliveryMethod::Email
        } else if self.form_url.is_some() {
            DeliveryMethod::WebForm
        } else {
            DeliveryMethod::Manual
        }
    }

    /// Address matching [`Self::delivery_method`].
    pub fn recipient(&self) -> Option<String> {
        self.dmca_email.clone().or_else(|| self.form_url.clone())
    }
}
