//! Notice delivery over a transactional email API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error_handling::DeliveryError;
use crate::models::DmcaQueueItem;

const EMAIL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Sends one queued notice. Returns the provider's message id.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        item: &DmcaQueueItem,
        reply_to: Option<&str>,
    ) -> Result<Option<String>, DeliveryError>;
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

/// [`Mailer`] posting JSON messages to an HTTP email API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(client: reqwest::Client, api_url: &str, api_key: Option<String>, from: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            api_key,
            from: from.to_string(),
        }
    }

    /// `None` when no email API is configured.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Option<Self> {
        let url = config.email_api_url.as_deref()?;
        Some(Self::new(
            client,
            url,
            config.email_api_key.clone(),
            &config.email_from,
        ))
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(
        &self,
        item: &DmcaQueueItem,
        reply_to: Option<&str>,
    ) -> Result<Option<String>, DeliveryError> {
        let to = item
            .recipient
            .as_deref()
            .filter(|r| r.contains('@'))
            .ok_or(DeliveryError::MissingRecipient)?;
        let mut message = serde_json::json!({
            "from": self.from,
            "to": [to],
            "subject": item.notice_subject,
            "text": item.notice_body,
        });
        if let Some(reply_to) = reply_to {
            message["reply_to"] = serde_json::Value::String(reply_to.to_string());
        }

        let mut request = self
            .client
            .post(&self.api_url)
            .json(&message)
            .timeout(EMAIL_TIMEOUT);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        let parsed: Option<SendResponse> = resp.json().await.ok();
        Ok(parsed.and_then(|r| r.id))
    }
}
