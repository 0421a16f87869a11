//! Abuse contacts of hosting providers and registrars.
//!
//! Provider names come from WHOIS and IP lookups and are free text
//! ("Cloudflare, Inc.", "AMAZON-02"), so entries match on lowercase
//! substrings.

use super::ProviderContact;

struct AbuseEntry {
    name: &'static str,
    needles: &'static [&'static str],
    dmca_email: Option<&'static str>,
    form_url: Option<&'static str>,
    verified: bool,
}

const HOSTING: &[AbuseEntry] = &[
    AbuseEntry {
        name: "Cloudflare",
        needles: &["cloudflare"],
        dmca_email: None,
        form_url: Some("https://abuse.cloudflare.com/dmca"),
        verified: true,
    },
    AbuseEntry {
        name: "Amazon Web Services",
        needles: &["amazon", "aws"],
        dmca_email: Some("abuse@amazonaws.com"),
        form_url: Some("https://support.aws.amazon.com/#/contacts/report-abuse"),
        verified: true,
    },
    AbuseEntry {
        name: "Google Cloud",
        needles: &["google cloud", "google llc", "google"],
        dmca_email: None,
        form_url: Some("https://support.google.com/legal/troubleshooter/1114905"),
        verified: true,
    },
    AbuseEntry {
        name: "DigitalOcean",
        needles: &["digitalocean", "digital ocean"],
        dmca_email: Some("abuse@digitalocean.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "Hetzner",
        needles: &["hetzner"],
        dmca_email: Some("abuse@hetzner.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "OVHcloud",
        needles: &["ovh"],
        dmca_email: Some("abuse@ovh.net"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "Akamai (Linode)",
        needles: &["linode", "akamai"],
        dmca_email: Some("abuse@linode.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "Namecheap Hosting",
        needles: &["namecheap"],
        dmca_email: Some("abuse@namecheap.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "GoDaddy",
        needles: &["godaddy", "go daddy"],
        dmca_email: Some("copyrightcomplaints@godaddy.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "Hostinger",
        needles: &["hostinger"],
        dmca_email: Some("abuse@hostinger.com"),
        form_url: None,
        verified: false,
    },
    AbuseEntry {
        name: "Vercel",
        needles: &["vercel"],
        dmca_email: Some("abuse@vercel.com"),
        form_url: None,
        verified: false,
    },
    AbuseEntry {
        name: "Netlify",
        needles: &["netlify"],
        dmca_email: Some("abuse@netlify.com"),
        form_url: None,
        verified: false,
    },
    AbuseEntry {
        name: "Shopify",
        needles: &["shopify"],
        dmca_email: None,
        form_url: Some("https://www.shopify.com/legal/dmca"),
        verified: true,
    },
    AbuseEntry {
        name: "Wix",
        needles: &["wix"],
        dmca_email: Some("copyright@wix.com"),
        form_url: None,
        verified: false,
    },
    AbuseEntry {
        name: "Squarespace",
        needles: &["squarespace"],
        dmca_email: Some("copyright@squarespace.com"),
        form_url: None,
        verified: false,
    },
];

const REGISTRARS: &[AbuseEntry] = &[
    AbuseEntry {
        name: "Namecheap",
        needles: &["namecheap"],
        dmca_email: Some("abuse@namecheap.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "GoDaddy",
        needles: &["godaddy", "go daddy"],
        dmca_email: Some("abuse@godaddy.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "NameSilo",
        needles: &["namesilo"],
        dmca_email: Some("abuse@namesilo.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "Porkbun",
        needles: &["porkbun"],
        dmca_email: Some("abuse@porkbun.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "Tucows",
        needles: &["tucows"],
        dmca_email: Some("domainabuse@tucows.com"),
        form_url: None,
        verified: true,
    },
    AbuseEntry {
        name: "Cloudflare Registrar",
        needles: &["cloudflare"],
        dmca_email: Some("registrar-abuse@cloudflare.com"),
        form_url: None,
        verified: true,
    },
];

fn lookup(table: &[AbuseEntry], provider: &str) -> Option<ProviderContact> {
    let lowered = provider.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|e| e.needles.iter().any(|n| lowered.contains(n)))
        .map(|e| ProviderContact {
            name: e.name.to_string(),
            dmca_email: e.dmca_email.map(str::to_string),
            form_url: e.form_url.map(str::to_string),
            verified: e.verified,
        })
}

/// Abuse contact for a hosting provider name, if known.
pub fn hosting_contact(provider: &str) -> Option<ProviderContact> {
    lookup(HOSTING, provider)
}

/// Abuse contact for a registrar name, if known.
pub fn registrar_contact(registrar: &str) -> Option<ProviderContact> {
    lookup(REGISTRARS, registrar)
}
