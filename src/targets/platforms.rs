//! Known platforms and their DMCA contacts.
//!
//! `verified` records whether a contact was confirmed against the platform's
//! published copyright policy. Unverified entries are still used, but the
//! notice UI shows them with a warning.

use crate::domain::{domain_label, normalize_domain, normalized_host};

use super::ProviderContact;

/// Platform key returned for hosts that match no known platform.
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// Name of the last-resort recipient when no contact is known.
pub const FALLBACK_RECIPIENT: &str = "Website Abuse Team";

pub(crate) struct PlatformEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub hosts: &'static [&'static str],
    pub dmca_email: Option<&'static str>,
    pub form_url: Option<&'static str>,
    pub verified: bool,
}

pub(crate) const PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry {
        key: "youtube",
        name: "YouTube",
        hosts: &["youtube.com", "youtu.be", "m.youtube.com"],
        dmca_email: None,
        form_url: Some("https://www.youtube.com/copyright_complaint_form"),
        verified: true,
    },
    PlatformEntry {
        key: "telegram",
        name: "Telegram",
        hosts: &["t.me", "telegram.me", "telegram.org", "telegra.ph"],
        dmca_email: Some("dmca@telegram.org"),
        form_url: None,
        verified: true,
    },
    PlatformEntry {
        key: "facebook",
        name: "Facebook",
        hosts: &["facebook.com", "fb.com", "fb.watch"],
        dmca_email: None,
        form_url: Some("https://www.facebook.com/help/contact/1758255661104383"),
        verified: true,
    },
    PlatformEntry {
        key: "instagram",
        name: "Instagram",
        hosts: &["instagram.com"],
        dmca_email: None,
        form_url: Some("https://help.instagram.com/contact/552695131608132"),
        verified: true,
    },
    PlatformEntry {
        key: "tiktok",
        name: "TikTok",
        hosts: &["tiktok.com"],
        dmca_email: None,
        form_url: Some("https://www.tiktok.com/legal/report/Copyright"),
        verified: true,
    },
    PlatformEntry {
        key: "twitter",
        name: "X (Twitter)",
        hosts: &["twitter.com", "x.com"],
        dmca_email: None,
        form_url: Some("https://help.x.com/forms/ipi"),
        verified: true,
    },
    PlatformEntry {
        key: "reddit",
        name: "Reddit",
        hosts: &["reddit.com", "redd.it"],
        dmca_email: None,
        form_url: Some("https://www.reddit.com/report"),
        verified: false,
    },
    PlatformEntry {
        key: "discord",
        name: "Discord",
        hosts: &["discord.com", "discord.gg", "discordapp.com"],
        dmca_email: Some("copyright@discord.com"),
        form_url: None,
        verified: true,
    },
    PlatformEntry {
        key: "google_drive",
        name: "Google Drive",
        hosts: &["drive.google.com", "docs.google.com"],
        dmca_email: None,
        form_url: Some("https://support.google.com/legal/troubleshooter/1114905"),
        verified: true,
    },
    PlatformEntry {
        key: "dropbox",
        name: "Dropbox",
        hosts: &["dropbox.com", "db.tt"],
        dmca_email: Some("copyright@dropbox.com"),
        form_url: None,
        verified: true,
    },
    PlatformEntry {
        key: "mega",
        name: "MEGA",
        hosts: &["mega.nz", "mega.io", "mega.co.nz"],
        dmca_email: Some("copyright@mega.nz"),
        form_url: None,
        verified: true,
    },
    PlatformEntry {
        key: "mediafire",
        name: "MediaFire",
        hosts: &["mediafire.com"],
        dmca_email: Some("dmca@mediafire.com"),
        form_url: None,
        verified: false,
    },
    PlatformEntry {
        key: "github",
        name: "GitHub",
        hosts: &["github.com", "gist.github.com", "raw.githubusercontent.com"],
        dmca_email: Some("copyright@github.com"),
        form_url: Some("https://support.github.com/contact/dmca-takedown"),
        verified: true,
    },
    PlatformEntry {
        key: "etsy",
        name: "Etsy",
        hosts: &["etsy.com"],
        dmca_email: None,
        form_url: Some("https://www.etsy.com/ipreporting"),
        verified: true,
    },
    PlatformEntry {
        key: "gumroad",
        name: "Gumroad",
        hosts: &["gumroad.com"],
        dmca_email: Some("copyright@gumroad.com"),
        form_url: None,
        verified: false,
    },
    PlatformEntry {
        key: "scribd",
        name: "Scribd",
        hosts: &["scribd.com"],
        dmca_email: Some("copyright@scribd.com"),
        form_url: None,
        verified: true,
    },
    PlatformEntry {
        key: "pinterest",
        name: "Pinterest",
        hosts: &["pinterest.com", "pin.it"],
        dmca_email: None,
        form_url: Some("https://help.pinterest.com/en/form/copyright-infringement-notice"),
        verified: true,
    },
    PlatformEntry {
        key: "vimeo",
        name: "Vimeo",
        hosts: &["vimeo.com"],
        dmca_email: None,
        form_url: Some("https://vimeo.com/dmca"),
        verified: true,
    },
    PlatformEntry {
        key: "notion",
        name: "Notion",
        hosts: &["notion.site", "notion.so"],
        dmca_email: Some("dmca@makenotion.com"),
        form_url: None,
        verified: false,
    },
];

fn entry(key: &str) -> Option<&'static PlatformEntry> {
    PLATFORMS.iter().find(|p| p.key == key)
}

impl From<&PlatformEntry> for ProviderContact {
    fn from(p: &PlatformEntry) -> Self {
        ProviderContact {
            name: p.name.to_string(),
            dmca_email: p.dmca_email.map(str::to_string),
            form_url: p.form_url.map(str::to_string),
            verified: p.verified,
        }
    }
}

/// Platform key for a URL: exact host match first, then subdomain suffix
/// match, else [`UNKNOWN_PLATFORM`].
pub fn detect_platform(url: &str) -> String {
    let Ok(host) = normalized_host(url) else {
        return UNKNOWN_PLATFORM.to_string();
    };
    let exact = PLATFORMS
        .iter()
        .find(|p| p.hosts.iter().any(|h| *h == host));
    let suffix = || {
        PLATFORMS.iter().find(|p| {
            p.hosts
                .iter()
                .any(|h| host.ends_with(&format!(".{h}")))
        })
    };
    exact
        .or_else(suffix)
        .map(|p| p.key.to_string())
        .unwrap_or_else(|| UNKNOWN_PLATFORM.to_string())
}

/// Human-readable platform name. Unknown platforms fall back to the site's
/// registrable domain without its suffix, capitalized.
pub fn platform_display_name(platform: &str, url: &str) -> String {
    if let Some(p) = entry(platform) {
        return p.name.to_string();
    }
    let label = normalized_host(url)
        .ok()
        .and_then(|host| domain_label(&host).or(Some(host)))
        .unwrap_or_default();
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Website".to_string(),
    }
}

/// DMCA contact for a platform key, if the platform is known.
pub fn platform_contact(platform: &str) -> Option<ProviderContact> {
    entry(&platform.trim().to_lowercase()).map(ProviderContact::from)
}

/// Contact to show for a platform, falling back to an unverified
/// "Website Abuse Team" with no address.
pub fn get_recommended_recipient(platform: &str) -> ProviderContact {
    platform_contact(platform).unwrap_or_else(|| ProviderContact {
        name: FALLBACK_RECIPIENT.to_string(),
        dmca_email: None,
        form_url: None,
        verified: false,
    })
}
