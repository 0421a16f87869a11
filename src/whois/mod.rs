//! Registrar lookups through an HTTP WHOIS API.
//!
//! Single lookups return parsed JSON and fall back to scanning the raw WHOIS
//! text for the registrar abuse address. Bulk lookups submit a list of
//! domains, poll until the provider has finished, and download the result
//! as CSV. Results are cached on disk when a cache directory is configured.

mod cache;
mod parse;
mod types;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio_retry::RetryIf;

use crate::config::{Config, WHOIS_BULK_MAX_POLLS, WHOIS_BULK_POLL_INTERVAL, WHOIS_TIMEOUT};
use crate::domain::extract_domain;
use crate::error_handling::{get_retry_strategy, is_retriable_error};
use crate::models::InfrastructureSnapshot;

pub use parse::{extract_abuse_email, parse_bulk_csv};
pub use types::WhoisRecord;

use types::{BulkStatusResponse, BulkSubmitResponse, LookupResponse};

#[derive(Debug, Clone)]
pub struct WhoisClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache_dir: Option<PathBuf>,
    poll_interval: Duration,
    max_polls: u32,
}

impl WhoisClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            cache_dir: None,
            poll_interval: WHOIS_BULK_POLL_INTERVAL,
            max_polls: WHOIS_BULK_MAX_POLLS,
        }
    }

    /// `None` when no WHOIS API is configured.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Option<Self> {
        let base = config.whois_api_url.as_deref()?;
        let mut whois = Self::new(client, base, config.whois_api_key.clone());
        whois.cache_dir = config.whois_cache_dir.clone();
        Some(whois)
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.timeout(WHOIS_TIMEOUT);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn fetch_record(&self, domain: &str) -> Result<Option<WhoisRecord>> {
        let resp = self
            .request(self.client.get(format!("{}/whois", self.base_url)))
            .query(&[("domain", domain), ("outputFormat", "JSON")])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: LookupResponse = resp.error_for_status()?.json().await?;
        Ok(body
            .record
            .map(|record| parse::convert_api_record(domain, record)))
    }

    /// Looks up one domain. Transient failures are retried; `Ok(None)` means
    /// the provider has no record.
    pub async fn lookup(&self, domain: &str) -> Result<Option<WhoisRecord>> {
        let domain = crate::domain::normalize_domain(domain);
        if let Some(dir) = &self.cache_dir {
            match cache::load_from_cache(dir, &domain) {
                Ok(Some(record)) => {
                    log::debug!("WHOIS cache hit for {domain}");
                    return Ok(Some(record));
                }
                Ok(None) => {}
                Err(e) => log::warn!("Ignoring unreadable WHOIS cache for {domain}: {e:#}"),
            }
        }

        log::info!("Starting WHOIS lookup for domain: {domain}");
        let record = RetryIf::spawn(
            get_retry_strategy(),
            || self.fetch_record(&domain),
            |e: &anyhow::Error| is_retriable_error(e),
        )
        .await
        .with_context(|| format!("WHOIS lookup failed for {domain}"))?;

        if let (Some(dir), Some(record)) = (&self.cache_dir, &record) {
            if let Err(e) = cache::save_to_cache(dir, record) {
                log::warn!("Failed to cache WHOIS record for {domain}: {e:#}");
            }
        }
        Ok(record)
    }

    /// Looks up many domains through the provider's asynchronous bulk API.
    pub async fn bulk_lookup(&self, domains: &[String]) -> Result<Vec<WhoisRecord>> {
        if domains.is_empty() {
            return Ok(Vec::new());
        }
        let submitted: BulkSubmitResponse = self
            .request(self.client.post(format!("{}/bulk", self.base_url)))
            .json(&serde_json::json!({ "domains": domains, "outputFormat": "csv" }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Bulk WHOIS submission returned no request id")?;
        let request_id = submitted.request_id;
        log::info!(
            "Submitted bulk WHOIS request {request_id} for {} domains",
            domains.len()
        );

        for poll in 1..=self.max_polls {
            let status: BulkStatusResponse = self
                .request(
                    self.client
                        .get(format!("{}/bulk/{request_id}", self.base_url)),
                )
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            match status.status.as_str() {
                "completed" => return self.download_bulk(&request_id).await,
                "failed" => bail!("Bulk WHOIS request {request_id} failed"),
                other => {
                    log::debug!("Bulk WHOIS request {request_id} is {other} (poll {poll})");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
        Err(anyhow!(
            "Bulk WHOIS request {request_id} did not complete after {} polls",
            self.max_polls
        ))
    }

    async fn download_bulk(&self, request_id: &str) -> Result<Vec<WhoisRecord>> {
        let bytes = self
            .request(
                self.client
                    .get(format!("{}/bulk/{request_id}/download", self.base_url)),
            )
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let records = parse_bulk_csv(&bytes);
        if let Some(dir) = &self.cache_dir {
            for record in &records {
                if let Err(e) = cache::save_to_cache(dir, record) {
                    log::warn!("Failed to cache WHOIS record for {}: {e:#}", record.domain);
                }
            }
        }
        Ok(records)
    }
}

/// Fills missing registrar details of `infra` from WHOIS. Never fails; lookup
/// problems leave the snapshot as it was.
pub async fn enrich_infrastructure(
    whois: Option<&WhoisClient>,
    url: &str,
    mut infra: InfrastructureSnapshot,
) -> InfrastructureSnapshot {
    let Some(whois) = whois else {
        return infra;
    };
    if infra.registrar.is_some() && infra.registrar_abuse_email.is_some() {
        return infra;
    }
    let domain = match extract_domain(url) {
        Ok(d) => d,
        Err(e) => {
            log::debug!("Skipping WHOIS for {url}: {e:#}");
            return infra;
        }
    };
    match whois.lookup(&domain).await {
        Ok(Some(record)) => record.merge_into(&mut infra),
        Ok(None) => log::debug!("No WHOIS record for {domain}"),
        Err(e) => log::warn!("{e:#}"),
    }
    infra
}
