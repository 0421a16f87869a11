//! DMCA queue items and batch summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    WebForm,
    Manual,
}

impl DeliveryMethod {
    /// Email is the only channel the processor sends automatically.
    pub fn is_automatic(self) -> bool {
        self == DeliveryMethod::Email
    }
}

/// Per-item dispatch state.
///
/// ```text
/// pending ─┬─> processing ─┬─> sent
///          │               └─> failed ─(retry, bounded)─> pending
///          ├─> web_form   (awaits manual submission)
///          └─> skipped    (cancelled)
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    WebForm,
    Skipped,
}

impl QueueStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueueStatus::Sent | QueueStatus::WebForm | QueueStatus::Skipped
        )
    }

    pub fn can_transition_to(self, next: QueueStatus) -> bool {
        use QueueStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | WebForm | Skipped)
                | (Processing, Sent | Failed)
                | (Failed, Pending)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmcaQueueItem {
    pub id: String,
    pub batch_id: String,
    pub user_id: String,
    pub infringement_id: String,
    /// Email address or web form URL, depending on the delivery method
    pub recipient: Option<String>,
    pub recipient_name: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub notice_subject: String,
    pub notice_body: String,
    pub status: QueueStatus,
    pub attempt_count: i64,
    pub scheduled_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Aggregated progress of one batch, polled by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub sent: usize,
    /// Pending and processing items
    pub pending: usize,
    pub web_form: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Earliest `scheduled_for` among pending items
    pub next_scheduled: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    /// No pending or processing items remain, polling can stop
    pub is_complete: bool,
}
