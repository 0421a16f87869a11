//! Batch creation and cancellation.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error_handling::{BatchError, DatabaseError};
use crate::models::{DeliveryMethod, DmcaQueueItem, QueueStatus};
use crate::storage::queue as queue_store;

use super::scheduler::QueueKicker;

/// One reviewed notice submitted as part of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemInput {
    pub infringement_id: String,
    pub recipient: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub notice_subject: String,
    pub notice_body: String,
}

/// The signed statement that accompanies every batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchAttestation {
    pub signature_name: String,
    pub perjury_confirmed: bool,
    pub liability_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub batch_id: String,
    pub total_queued: usize,
    pub email_count: usize,
    pub web_form_count: usize,
    pub estimated_completion_minutes: u64,
    pub created_at: DateTime<Utc>,
}

/// Limits applied to batch creation.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub stagger: Duration,
    pub cooldown: Duration,
    pub max_items: usize,
}

impl BatchLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stagger: config.stagger_interval(),
            cooldown: config.batch_cooldown(),
            max_items: config.max_batch_items,
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Electronic signature appended to every notice of a batch.
pub fn signature_block(signature_name: &str, signed_at: DateTime<Utc>) -> String {
    format!(
        "\n\n---\nElectronically signed by: {}\nDate: {}\n\
         I state under penalty of perjury that the information in this notice is accurate \
         and that I am the copyright owner or authorized to act on the owner's behalf.",
        signature_name.trim(),
        signed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Send time of each item: non-email items at `now`, email items `stagger`
/// apart in submission order. Only email items take a stagger slot.
pub fn stagger_schedule(
    methods: &[DeliveryMethod],
    now: DateTime<Utc>,
    stagger: Duration,
) -> Vec<DateTime<Utc>> {
    let step = chrono::Duration::from_std(stagger).unwrap_or_else(|_| chrono::Duration::zero());
    let mut email_index: i32 = 0;
    methods
        .iter()
        .map(|method| {
            if *method == DeliveryMethod::Email {
                let at = now + step * email_index;
                email_index += 1;
                at
            } else {
                now
            }
        })
        .collect()
}

fn validate(
    items: &[BatchItemInput],
    attestation: &BatchAttestation,
    limits: &BatchLimits,
) -> Result<(), BatchError> {
    if attestation.signature_name.trim().is_empty() {
        return Err(BatchError::MissingSignature);
    }
    if !attestation.perjury_confirmed || !attestation.liability_confirmed {
        return Err(BatchError::ConsentNotConfirmed);
    }
    if items.is_empty() || items.len() > limits.max_items {
        return Err(BatchError::InvalidItemCount {
            count: items.len(),
            max: limits.max_items,
        });
    }
    for (index, item) in items.iter().enumerate() {
        let has_address = item.recipient.as_deref().is_some_and(|r| r.contains('@'));
        if item.delivery_method == DeliveryMethod::Email && !has_address {
            return Err(BatchError::MissingRecipient { index });
        }
    }
    Ok(())
}

async fn check_cooldown(
    pool: &SqlitePool,
    user_id: &str,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Result<(), BatchError> {
    let Some(last) = queue_store::last_batch_created_at(pool, user_id).await? else {
        return Ok(());
    };
    let elapsed_ms = (now - last).num_milliseconds().max(0) as u64;
    let cooldown_ms = cooldown.as_millis() as u64;
    if elapsed_ms < cooldown_ms {
        return Err(BatchError::RateLimited {
            elapsed_secs: elapsed_ms / 1000,
            retry_after_secs: (cooldown_ms - elapsed_ms).div_ceil(1000),
        });
    }
    Ok(())
}

/// Queues a signed batch of notices.
///
/// Either every item is inserted or none is. The cooldown is enforced by the
/// store, so concurrent submissions from one user queue at most one batch.
/// After a successful insert the queue worker is kicked; the kick never fails
/// the submission.
pub async fn create_batch(
    pool: &SqlitePool,
    user_id: &str,
    items: Vec<BatchItemInput>,
    attestation: &BatchAttestation,
    limits: &BatchLimits,
    kicker: Option<&QueueKicker>,
    now: DateTime<Utc>,
) -> Result<BatchReceipt, BatchError> {
    validate(&items, attestation, limits)?;
    check_cooldown(pool, user_id, limits.cooldown, now).await?;

    let batch_id = uuid::Uuid::new_v4().to_string();
    let signature = signature_block(&attestation.signature_name, now);
    let methods: Vec<DeliveryMethod> = items.iter().map(|i| i.delivery_method).collect();
    let schedule = stagger_schedule(&methods, now, limits.stagger);

    let queued: Vec<DmcaQueueItem> = items
        .into_iter()
        .zip(schedule)
        .map(|(input, scheduled_for)| DmcaQueueItem {
            id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.clone(),
            user_id: user_id.to_string(),
            infringement_id: input.infringement_id,
            recipient: input.recipient,
            recipient_name: input.recipient_name,
            delivery_method: input.delivery_method,
            notice_subject: input.notice_subject,
            notice_body: format!("{}{signature}", input.notice_body.trim_end()),
            status: QueueStatus::Pending,
            attempt_count: 0,
            scheduled_for,
            created_at: now,
            completed_at: None,
            error_message: None,
        })
        .collect();

    // The early check gives the precise retry-after; the guarded insert settles races
    let since = now - chrono::Duration::from_std(limits.cooldown).unwrap_or_else(|_| chrono::Duration::zero());
    if !queue_store::insert_batch_unless_recent(pool, &queued, user_id, since).await? {
        check_cooldown(pool, user_id, limits.cooldown, now).await?;
        return Err(BatchError::RateLimited {
            elapsed_secs: 0,
            retry_after_secs: limits.cooldown.as_secs(),
        });
    }

    let email_count = methods.iter().filter(|m| **m == DeliveryMethod::Email).count();
    let stagger_total = limits.stagger.as_secs() * email_count.saturating_sub(1) as u64;
    let receipt = BatchReceipt {
        batch_id,
        total_queued: queued.len(),
        email_count,
        web_form_count: queued.len() - email_count,
        estimated_completion_minutes: stagger_total.div_ceil(60),
        created_at: now,
    };
    log::info!(
        "Queued batch {} for user {user_id}: {} email, {} manual/web form",
        receipt.batch_id,
        receipt.email_count,
        receipt.web_form_count
    );

    if let Some(kicker) = kicker {
        kicker.kick();
    }
    Ok(receipt)
}

/// Skips the still-pending items of a batch owned by `user_id`.
///
/// Returns `None` when the batch does not exist or belongs to someone else.
pub async fn cancel_batch(
    pool: &SqlitePool,
    batch_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<u64>, DatabaseError> {
    let items = queue_store::list_batch_items(pool, batch_id).await?;
    if items.is_empty() || items.iter().any(|i| i.user_id != user_id) {
        return Ok(None);
    }
    let skipped = queue_store::cancel_batch(pool, batch_id, now).await?;
    log::info!("Cancelled batch {batch_id}: {skipped} pending items skipped");
    Ok(Some(skipped))
}
