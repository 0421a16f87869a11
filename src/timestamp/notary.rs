//! Blockchain notary backed by an OpenTimestamps calendar.
//!
//! The calendar aggregates submitted digests into Bitcoin transactions. A fresh
//! proof only carries a pending attestation on the calendar's commitment; once
//! the transaction is mined the calendar serves the path from that commitment
//! to a Bitcoin block attestation, which is merged into the original proof.
//! Block times are resolved through an Esplora block explorer API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::NOTARY_TIMEOUT;
use crate::error_handling::NotaryError;

use super::ots::Timestamp;

/// Bitcoin block that anchors a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAttestation {
    pub height: u64,
    pub time: DateTime<Utc>,
}

/// Hash anchoring capability.
#[async_trait]
pub trait Notary: Send + Sync {
    /// Submits a digest and returns the initial, pending proof.
    async fn stamp(&self, digest: &[u8]) -> Result<Vec<u8>, NotaryError>;

    /// Returns a completed proof once the digest is anchored in a block, or
    /// `None` while it is still waiting.
    async fn upgrade(&self, digest: &[u8], proof: &[u8]) -> Result<Option<Vec<u8>>, NotaryError>;

    /// Resolves the block that anchors `proof`, if it has one.
    async fn verify(&self, proof: &[u8]) -> Result<Option<BlockAttestation>, NotaryError>;
}

/// Block height of the earliest Bitcoin attestation in a serialized proof.
pub fn bitcoin_attestation_height(proof: &[u8]) -> Option<u64> {
    Timestamp::deserialize(&[], proof).ok()?.bitcoin_height()
}

#[derive(Deserialize)]
struct EsploraBlock {
    timestamp: i64,
}

/// [`Notary`] talking to an OpenTimestamps calendar server and Esplora.
pub struct OpenTimestampsNotary {
    client: reqwest::Client,
    calendar_url: String,
    esplora_url: String,
}

impl OpenTimestampsNotary {
    pub fn new(client: reqwest::Client, calendar_url: &str, esplora_url: &str) -> Self {
        Self {
            client,
            calendar_url: calendar_url.trim_end_matches('/').to_string(),
            esplora_url: esplora_url.trim_end_matches('/').to_string(),
        }
    }

    async fn block_time(&self, height: u64) -> Result<Option<DateTime<Utc>>, NotaryError> {
        let resp = self
            .client
            .get(format!("{}/block-height/{height}", self.esplora_url))
            .timeout(NOTARY_TIMEOUT)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(NotaryError::Status(resp.status().as_u16()));
        }
        let block_hash = resp.text().await?.trim().to_string();

        let resp = self
            .client
            .get(format!("{}/block/{block_hash}", self.esplora_url))
            .timeout(NOTARY_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(NotaryError::Status(resp.status().as_u16()));
        }
        let block: EsploraBlock = resp.json().await?;
        Ok(DateTime::from_timestamp(block.timestamp, 0).filter(|_| block.timestamp > 0))
    }

    /// Calendar answer for one pending commitment, `None` while not yet mined.
    async fn fetch_upgrade(&self, commitment: &[u8]) -> Result<Option<Vec<u8>>, NotaryError> {
        let resp = self
            .client
            .get(format!("{}/timestamp/{}", self.calendar_url, hex::encode(commitment)))
            .header(reqwest::header::ACCEPT, "application/vnd.opentimestamps.v1")
            .timeout(NOTARY_TIMEOUT)
            .send()
            .await?;
        // The calendar answers 404 until the commitment is mined
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(NotaryError::Status(resp.status().as_u16()));
        }
        Ok(Some(resp.bytes().await?.to_vec()))
    }
}

#[async_trait]
impl Notary for OpenTimestampsNotary {
    async fn stamp(&self, digest: &[u8]) -> Result<Vec<u8>, NotaryError> {
        let resp = self
            .client
            .post(format!("{}/digest", self.calendar_url))
            .header(reqwest::header::ACCEPT, "application/vnd.opentimestamps.v1")
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(digest.to_vec())
            .timeout(NOTARY_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(NotaryError::Status(resp.status().as_u16()));
        }
        let proof = resp.bytes().await?.to_vec();
        Timestamp::deserialize(digest, &proof)?;
        Ok(proof)
    }

    async fn upgrade(&self, digest: &[u8], proof: &[u8]) -> Result<Option<Vec<u8>>, NotaryError> {
        let mut timestamp = Timestamp::deserialize(digest, proof)?;
        if timestamp.bitcoin_height().is_some() {
            return Ok(Some(proof.to_vec()));
        }
        for commitment in timestamp.pending_commitments() {
            let Some(bytes) = self.fetch_upgrade(&commitment).await? else {
                continue;
            };
            let upgrade = Timestamp::deserialize(&commitment, &bytes)?;
            if let Some(node) = timestamp.node_mut(&commitment) {
                node.merge(upgrade);
            }
        }
        if timestamp.bitcoin_height().is_none() {
            return Ok(None);
        }
        Ok(Some(timestamp.serialize()))
    }

    async fn verify(&self, proof: &[u8]) -> Result<Option<BlockAttestation>, NotaryError> {
        let Some(height) = bitcoin_attestation_height(proof) else {
            return Ok(None);
        };
        Ok(self
            .block_time(height)
            .await?
            .map(|time| BlockAttestation { height, time }))
    }
}
