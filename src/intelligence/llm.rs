//! Chat completion client used for filtering and keyword extraction.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{Config, LLM_TEMPERATURE, LLM_TIMEOUT};
use crate::error_handling::LlmError;

/// A model that answers a system + user prompt with a JSON object.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value, LlmError>;
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client in JSON mode.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// `None` without an API key.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Option<Self> {
        let key = config.llm_api_key.as_deref().filter(|k| !k.is_empty())?;
        Some(Self::new(client, &config.llm_api_url, key, &config.llm_model))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": LLM_TEMPERATURE,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(LLM_TIMEOUT)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no completion content".to_string()))?;
        parse_json_content(&content)
    }
}

/// Parses model output as a JSON object, tolerating a fenced code block.
pub fn parse_json_content(content: &str) -> Result<serde_json::Value, LlmError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    let value: serde_json::Value = serde_json::from_str(unfenced)
        .map_err(|e| LlmError::MalformedResponse(format!("{e}: {}", truncate(unfenced, 200))))?;
    if !value.is_object() {
        return Err(LlmError::MalformedResponse("expected a JSON object".to_string()));
    }
    Ok(value)
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
