//! Evidence collection for one detection.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Error, Result};
use chrono::Utc;

use crate::config::{
    Config, HTML_FETCH_TIMEOUT, MAX_REDIRECT_HOPS, REDIRECT_TRACE_TIMEOUT, SCREENSHOT_TIMEOUT,
    SCREENSHOT_UPLOAD_TIMEOUT, WAYBACK_TIMEOUT,
};
use crate::evidence::confidence::calculate_match_confidence;
use crate::evidence::excerpts::{build_search_terms, extract_excerpts};
use crate::evidence::redirects::trace_redirects;
use crate::evidence::screenshot::{capture_screenshot, ScreenshotApi};
use crate::evidence::wayback::request_archive;
use crate::models::{DetectionMetadata, EvidencePacket, Infringement, Product};

/// What was detected and what to look for on the page.
#[derive(Debug, Clone)]
pub struct Detection {
    pub url: String,
    pub product_name: String,
    pub keywords: Vec<String>,
    pub unique_identifiers: Vec<String>,
    /// Hash matches found by the scanner, carried over unchanged
    pub hash_matches: Vec<String>,
    pub match_type: Option<String>,
    pub detected_via: Option<String>,
}

impl Detection {
    pub fn new(infringement: &Infringement, product: &Product) -> Self {
        let previous = infringement.evidence.as_ref();
        Self {
            url: infringement.source_url.clone(),
            product_name: product.name.clone(),
            keywords: product.all_keywords(),
            unique_identifiers: product.unique_identifiers().to_vec(),
            hash_matches: previous.map(|e| e.hash_matches.clone()).unwrap_or_default(),
            match_type: infringement.match_type.clone(),
            detected_via: previous.and_then(|e| e.detection_metadata.detected_via.clone()),
        }
    }
}

/// Clients and collaborator endpoints used during collection.
#[derive(Debug, Clone)]
pub struct EvidenceContext {
    pub client: reqwest::Client,
    /// Client with redirects disabled
    pub redirect_client: reqwest::Client,
    pub screenshot: Option<ScreenshotApi>,
    pub wayback_url: Option<String>,
}

impl EvidenceContext {
    pub fn from_config(
        config: &Config,
        client: reqwest::Client,
        redirect_client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            redirect_client,
            screenshot: ScreenshotApi::from_config(config),
            wayback_url: (!config.disable_wayback).then(|| config.wayback_url.clone()),
        }
    }
}

async fn time_boxed<T>(
    limit: Duration,
    step: &str,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| anyhow!("{step}: {e:#}")),
        Err(_) => Err(anyhow!("{step}: timed out after {}s", limit.as_secs())),
    }
}

/// Collects screenshot, excerpts and redirect chain for `detection`.
///
/// Never fails. The sub-steps run concurrently under their own time limits;
/// a failed step leaves its part of the packet empty, sets
/// `partial_collection` and adds its message to `collection_error`. Wayback
/// archiving is best effort and does not count as a failed step.
pub async fn collect_evidence(detection: &Detection, ctx: &EvidenceContext) -> EvidencePacket {
    let terms = build_search_terms(
        &detection.product_name,
        &detection.keywords,
        &detection.unique_identifiers,
    );

    let screenshot_step = async {
        match &ctx.screenshot {
            Some(api) => time_boxed(
                SCREENSHOT_TIMEOUT + SCREENSHOT_UPLOAD_TIMEOUT,
                "screenshot",
                capture_screenshot(&ctx.client, api, &detection.url),
            )
            .await
            .map(Some),
            None => Ok(None),
        }
    };
    let excerpt_step = time_boxed(
        HTML_FETCH_TIMEOUT,
        "excerpts",
        extract_excerpts(&ctx.client, &detection.url, &terms),
    );
    let redirect_step = time_boxed(
        REDIRECT_TRACE_TIMEOUT,
        "redirects",
        trace_redirects(&detection.url, MAX_REDIRECT_HOPS, &ctx.redirect_client),
    );
    let wayback_step = async {
        let base = ctx.wayback_url.as_deref()?;
        match time_boxed(
            WAYBACK_TIMEOUT,
            "wayback",
            request_archive(&ctx.client, base, &detection.url),
        )
        .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Wayback archiving failed for {}: {e:#}", detection.url);
                None
            }
        }
    };

    let (screenshot, excerpts, chain, wayback_url) =
        tokio::join!(screenshot_step, excerpt_step, redirect_step, wayback_step);

    let mut errors: Vec<String> = Vec::new();
    let screenshots = match screenshot {
        Ok(shot) => shot.into_iter().collect(),
        Err(e) => {
            errors.push(e.to_string());
            Vec::new()
        }
    };
    let matched_excerpts = excerpts.unwrap_or_else(|e| {
        errors.push(e.to_string());
        Vec::new()
    });
    let url_chain = chain.unwrap_or_else(|e| {
        errors.push(e.to_string());
        Vec::new()
    });

    if !errors.is_empty() {
        log::warn!(
            "Partial evidence for {}: {}",
            detection.url,
            errors.join("; ")
        );
    }

    let mut packet = EvidencePacket {
        screenshots,
        matched_excerpts,
        hash_matches: detection.hash_matches.clone(),
        detection_metadata: DetectionMetadata {
            detected_via: detection.detected_via.clone(),
            match_type: detection.match_type.clone(),
            collected_at: Utc::now(),
            confidence: None,
            final_url: url_chain.last().cloned(),
            wayback_url,
            partial_collection: !errors.is_empty(),
            collection_error: (!errors.is_empty()).then(|| errors.join("; ")),
        },
        url_chain,
    };
    packet.detection_metadata.confidence = Some(calculate_match_confidence(&packet));
    packet
}
