//! Escalation ranking of enforcement targets.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::models::DeliveryMethod;

use super::hosting::{hosting_contact, registrar_contact};
use super::platforms::{get_recommended_recipient, platform_contact, FALLBACK_RECIPIENT};
use super::ProviderContact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetType {
    Platform,
    Hosting,
    Registrar,
    Website,
}

/// Party to notify and the channel to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementTarget {
    pub target_type: TargetType,
    pub provider: ProviderContact,
    pub delivery_method: DeliveryMethod,
    pub recommended: bool,
}

impl EnforcementTarget {
    fn new(target_type: TargetType, provider: ProviderContact) -> Self {
        Self {
            target_type,
            delivery_method: provider.delivery_method(),
            provider,
            recommended: false,
        }
    }
}

/// Every party that could act on the infringement, most effective first:
/// the platform itself, then the host, then the registrar. A generic website
/// abuse entry is returned when nothing else is known, so the list is never
/// empty. Exactly the first entry is `recommended`.
pub fn resolve_all_targets(
    url: &str,
    platform: &str,
    hosting_provider: Option<&str>,
    registrar_name: Option<&str>,
    registrar_abuse_email: Option<&str>,
) -> Vec<EnforcementTarget> {
    let mut targets = Vec::new();

    if let Some(contact) = platform_contact(platform) {
        targets.push(EnforcementTarget::new(TargetType::Platform, contact));
    }

    if let Some(contact) = hosting_provider.and_then(hosting_contact) {
        targets.push(EnforcementTarget::new(TargetType::Hosting, contact));
    }

    let registrar = registrar_name.and_then(registrar_contact).or_else(|| {
        // WHOIS gave an abuse address for a registrar we have no entry for
        registrar_abuse_email
            .filter(|e| e.contains('@'))
            .map(|email| ProviderContact {
                name: registrar_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or("Domain Registrar")
                    .to_string(),
                dmca_email: Some(email.trim().to_string()),
                form_url: None,
                verified: false,
            })
    });
    if let Some(contact) = registrar {
        targets.push(EnforcementTarget::new(TargetType::Registrar, contact));
    }

    if targets.is_empty() {
        log::debug!("No known enforcement contact for {url}, falling back to {FALLBACK_RECIPIENT}");
        targets.push(EnforcementTarget::new(
            TargetType::Website,
            get_recommended_recipient(platform),
        ));
    }

    if let Some(first) = targets.first_mut() {
        first.recommended = true;
    }
    targets
}

/// The single best target for an infringement.
pub fn resolve_provider(
    url: &str,
    platform: &str,
    hosting_provider: Option<&str>,
    registrar_name: Option<&str>,
    registrar_abuse_email: Option<&str>,
) -> EnforcementTarget {
    let mut targets = resolve_all_targets(
        url,
        platform,
        hosting_provider,
        registrar_name,
        registrar_abuse_email,
    );
    // resolve_all_targets never returns an empty list
    targets.swap_remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recommended_count(targets: &[EnforcementTarget]) -> usize {
        targets.iter().filter(|t| t.recommended).count()
    }

    #[test]
    fn test_escalation_order() {
        let targets = resolve_all_targets(
            "https://t.me/leaks",
            "telegram",
            Some("Cloudflare, Inc."),
            Some("NameCheap, Inc."),
            None,
        );
        let kinds: Vec<TargetType> = targets.iter().map(|t| t.target_type).collect();
        assert_eq!(
            kinds,
            vec![TargetType::Platform, TargetType::Hosting, TargetType::Registrar]
        );
        assert!(targets[0].recommended);
        assert_eq!(recommended_count(&targets), 1);
        assert_eq!(targets[0].delivery_method, DeliveryMethod::Email);
        assert_eq!(targets[1].delivery_method, DeliveryMethod::WebForm);
    }

    #[test]
    fn test_unknown_everything_falls_back_to_manual() {
        let targets = resolve_all_targets("https://randomsite.xyz/x", "unknown", None, None, None);
        assert_eq!(targets.len(), 1);
        let only = &targets[0];
        assert_eq!(only.target_type, TargetType::Website);
        assert_eq!(only.provider.name, "Website Abuse Team");
        assert!(!only.provider.verified);
        assert_eq!(only.delivery_method, DeliveryMethod::Manual);
        assert!(only.recommended);
    }

    #[test]
    fn test_whois_abuse_email_for_unlisted_registrar() {
        let targets = resolve_all_targets(
            "https://randomsite.xyz/x",
            "unknown",
            Some("Tiny Local ISP"),
            Some("Registrar Of Nowhere"),
            Some("abuse@nowhere.example"),
        );
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].target_type, TargetType::Registrar);
        assert_eq!(targets[0].provider.name, "Registrar Of Nowhere");
        assert_eq!(
            targets[0].provider.recipient().as_deref(),
            Some("abuse@nowhere.example")
        );
        assert!(targets[0].recommended);
    }

    #[test]
    fn test_always_one_recommended() {
        let cases: [(&str, Option<&str>, Option<&str>); 4] = [
            ("youtube", None, None),
            ("unknown", Some("Hetzner"), None),
            ("unknown", None, Some("Porkbun LLC")),
            ("discord", Some("OVH SAS"), Some("Tucows")),
        ];
        for (platform, host, registrar) in cases {
            let targets = resolve_all_targets("https://example.com", platform, host, registrar, None);
            assert!(!targets.is_empty());
            assert_eq!(recommended_count(&targets), 1, "{platform}");
            assert!(targets[0].recommended);
        }
    }

    #[test]
    fn test_resolve_provider_returns_recommended() {
        let best = resolve_provider("https://x.com/a", "twitter", Some("Cloudflare"), None, None);
        assert_eq!(best.target_type, TargetType::Platform);
        assert!(best.recommended);
    }
}
