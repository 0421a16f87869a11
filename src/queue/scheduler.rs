//! Background queue worker.
//!
//! The worker wakes on a fixed interval and whenever a new batch is queued,
//! so the first item of a batch goes out without waiting for the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::processor::QueueProcessor;

/// Wakes the queue worker early.
#[derive(Debug, Clone, Default)]
pub struct QueueKicker {
    notify: Arc<Notify>,
}

impl QueueKicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kick(&self) {
        self.notify.notify_one();
    }

    async fn kicked(&self) {
        self.notify.notified().await;
    }
}

/// Spawns the worker loop. It runs until `cancel` fires.
pub fn spawn_queue_scheduler(
    processor: Arc<QueueProcessor>,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> (QueueKicker, JoinHandle<()>) {
    let kicker = QueueKicker::new();
    let wake = kicker.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Queue scheduler shutting down");
                    break;
                }
                _ = wake.kicked() => {}
                _ = ticker.tick() => {}
            }
            match processor.process_due_items(Utc::now()).await {
                Ok(stats) if stats.is_empty() => {}
                Ok(stats) => log::info!("Queue run: {stats:?}"),
                Err(e) => log::error!("Queue run failed: {e}"),
            }
        }
    });

    (kicker, handle)
}
