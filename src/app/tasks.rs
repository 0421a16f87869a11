//! Background jobs of the server.

use std::time::Duration;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::queue::spawn_queue_scheduler;
use crate::timestamp::{upgrade_pending_timestamps, TimestampService};

use super::AppContext;

/// Pending proofs checked per upgrade run
pub const TIMESTAMP_UPGRADE_BATCH: i64 = 100;

/// Periodically upgrades pending timestamp proofs until `cancel` fires.
pub fn spawn_timestamp_upgrader(
    pool: SqlitePool,
    service: TimestampService,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match upgrade_pending_timestamps(&pool, &service, TIMESTAMP_UPGRADE_BATCH).await {
                        Ok(stats) if stats.checked > 0 => log::info!("Timestamp upgrade: {stats:?}"),
                        Ok(_) => {}
                        Err(e) => log::error!("Timestamp upgrade failed: {e}"),
                    }
                }
            }
        }
        log::debug!("Timestamp upgrader stopped");
    })
}

/// Starts the queue scheduler and the timestamp upgrader, and stores the
/// queue kicker on the context.
pub fn spawn_background_tasks(ctx: &mut AppContext, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    let (kicker, queue_handle) = spawn_queue_scheduler(
        ctx.processor.clone(),
        Duration::from_secs(ctx.config.queue_poll_interval_secs.max(1)),
        cancel.clone(),
    );
    ctx.kicker = Some(kicker);
    handles.push(queue_handle);

    if ctx.timestamps.is_available() {
        handles.push(spawn_timestamp_upgrader(
            ctx.pool.clone(),
            ctx.timestamps.clone(),
            Duration::from_secs(ctx.config.timestamp_upgrade_interval_secs.max(1)),
            cancel.clone(),
        ));
    }
    handles
}
