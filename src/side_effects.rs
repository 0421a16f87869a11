//! Best-effort notifications to the CRM webhook.
//!
//! Events go through a bounded channel to a background task that posts them.
//! Emitting never waits and never fails; a full or closed channel and webhook
//! errors are only logged.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const CHANNEL_CAPACITY: usize = 256;
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SideEffect {
    InfringementVerified {
        user_id: String,
        infringement_id: String,
        platform: String,
    },
    BatchSubmitted {
        user_id: String,
        batch_id: String,
        total: usize,
    },
    TakedownSent {
        user_id: String,
        infringement_id: String,
        recipient: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct SideEffects {
    tx: Option<mpsc::Sender<SideEffect>>,
}

impl SideEffects {
    /// Drops every event; used when no webhook is configured.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Starts the delivery task. It stops when `cancel` fires or every
    /// sender is dropped.
    pub fn spawn(
        client: reqwest::Client,
        webhook_url: String,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<SideEffect>(CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        post_event(&client, &webhook_url, &event).await;
                    }
                }
            }
            log::debug!("Side effect dispatcher stopped");
        });
        (Self { tx: Some(tx) }, handle)
    }

    pub fn emit(&self, event: SideEffect) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                log::warn!("Side effect channel full, dropping {event:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Side effect dispatcher is shut down");
            }
        }
    }
}

async fn post_event(client: &reqwest::Client, url: &str, event: &SideEffect) {
    let result = client
        .post(url)
        .json(event)
        .timeout(WEBHOOK_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status());
    if let Err(e) = result {
        log::warn!("CRM webhook call failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_events_are_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"event": "takedown_sent", "infringement_id": "inf-1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let cancel = CancellationToken::new();
        let (effects, handle) = SideEffects::spawn(reqwest::Client::new(), server.uri(), cancel);
        effects.emit(SideEffect::TakedownSent {
            user_id: "u1".into(),
            infringement_id: "inf-1".into(),
            recipient: Some("dmca@telegram.org".into()),
        });
        drop(effects);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (effects, handle) =
            SideEffects::spawn(reqwest::Client::new(), server.uri(), CancellationToken::new());
        effects.emit(SideEffect::BatchSubmitted {
            user_id: "u1".into(),
            batch_id: "b1".into(),
            total: 2,
        });
        drop(effects);
        handle.await.unwrap();
        SideEffects::disabled().emit(SideEffect::BatchSubmitted {
            user_id: "u1".into(),
            batch_id: "b1".into(),
            total: 0,
        });
    }
}
