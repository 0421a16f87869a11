//! Domain extraction and normalization utilities.
//!
//! Uses the Public Suffix List (`psl`) to find registrable domains, so
//! `shop.example.co.uk` and `example.co.uk` are treated as the same site.

use anyhow::{anyhow, Context, Result};

/// Lowercased host of `url` without a leading `www.`.
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed or has no host.
pub fn normalized_host(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).with_context(|| format!("Failed to parse URL: {url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("URL '{url}' has no host component"))?;
    Ok(normalize_domain(host))
}

/// Lowercases a domain and strips a leading `www.` and trailing dot.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('.').to_lowercase();
    domain
        .strip_prefix("www.")
        .map(str::to_string)
        .unwrap_or(domain)
}

/// Extracts the registrable domain from a URL.
///
/// Returns e.g. "example.com" for "https://www.example.com/path".
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed, if the host is an IP address,
/// or if the host has no registrable domain.
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).with_context(|| format!("Failed to parse URL: {url}"))?;
    match parsed.host() {
        Some(url::Host::Domain(host)) => registrable_domain(host)
            .ok_or_else(|| anyhow!("No registrable domain found in URL: {url}")),
        Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)) => Err(anyhow!(
            "IP addresses do not have registrable domains: {url}"
        )),
        None => Err(anyhow!("URL '{url}' has no host component")),
    }
}

/// Registrable domain of a bare host name.
pub fn registrable_domain(host: &str) -> Option<String> {
    let host = normalize_domain(host);
    psl::domain_str(&host).map(str::to_string)
}

/// Registrable domain without its public suffix ("randomsite" for "randomsite.xyz").
pub fn domain_label(host: &str) -> Option<String> {
    let host = normalize_domain(host);
    let domain = psl::domain_str(&host)?;
    let suffix = psl::suffix_str(domain)?;
    domain
        .strip_suffix(suffix)
        .map(|label| label.trim_end_matches('.').to_string())
        .filter(|label| !label.is_empty())
}
