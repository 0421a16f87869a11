//! Best-effort Wayback Machine archiving.

use anyhow::{bail, Error, Result};

use crate::config::WAYBACK_TIMEOUT;

/// Asks the Wayback Machine to archive `target_url` and returns the archived
/// copy's URL.
pub async fn request_archive(
    client: &reqwest::Client,
    wayback_base: &str,
    target_url: &str,
) -> Result<String, Error> {
    let base = wayback_base.trim_end_matches('/');
    let resp = client
        .get(format!("{base}/save/{target_url}"))
        .timeout(WAYBACK_TIMEOUT)
        .send()
        .await?;
    if !resp.status().is_success() && !resp.status().is_redirection() {
        bail!("Wayback save returned status {}", resp.status());
    }
    let location = resp
        .headers()
        .get(reqwest::header::CONTENT_LOCATION)
        .or_else(|| resp.headers().get(reqwest::header::LOCATION))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    match location {
        Some(loc) if loc.starts_with("http") => Ok(loc),
        Some(loc) => Ok(format!("{base}{loc}")),
        None => Ok(format!("{base}/web/{target_url}")),
    }
}
