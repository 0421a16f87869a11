//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `takedown_pipeline` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process;
use tokio_util::sync::CancellationToken;

use takedown_pipeline::api::start_api_server;
use takedown_pipeline::app::{
    shutdown_gracefully, shutdown_signal, spawn_background_tasks, AppContext,
    TIMESTAMP_UPGRADE_BATCH,
};
use takedown_pipeline::initialization::init_logger_with;
use takedown_pipeline::storage::{init_db_pool_with_path, run_migrations};
use takedown_pipeline::timestamp::upgrade_pending_timestamps;
use takedown_pipeline::Config;

#[derive(Debug, Parser)]
#[command(name = "takedown_pipeline", version, about)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API with the queue scheduler and timestamp upgrader
    Serve,
    /// Process due queue items once and exit
    ProcessQueue,
    /// Upgrade pending timestamp proofs once and exit
    UpgradeTimestamps {
        /// Maximum number of snapshots to check
        #[arg(long, default_value_t = TIMESTAMP_UPGRADE_BATCH)]
        limit: i64,
    },
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the working directory, then from next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    let log_level = cli.config.log_level.clone();
    let log_format = cli.config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    if let Err(e) = run(cli).await {
        eprintln!("takedown_pipeline error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config;
    let pool = init_db_pool_with_path(&config.db_path)
        .await
        .context("Failed to initialize database pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    if let Command::Migrate = cli.command {
        println!("Database at {} is up to date", config.db_path.display());
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let bind_addr = config.bind_addr.clone();
    let (mut ctx, dispatcher) = AppContext::build(config, pool, &cancel)?;
    let mut tasks: Vec<_> = dispatcher.into_iter().collect();

    match cli.command {
        Command::Serve => {
            tasks.extend(spawn_background_tasks(&mut ctx, &cancel));
            let result = start_api_server(&bind_addr, ctx, shutdown_signal()).await;
            shutdown_gracefully(cancel, tasks).await;
            result?;
        }
        Command::ProcessQueue => {
            let stats = ctx
                .processor
                .process_due_items(Utc::now())
                .await
                .context("Queue processing failed")?;
            shutdown_gracefully(cancel, tasks).await;
            println!(
                "Sent {} notice{}, {} failed, {} requeued, {} parked for manual submission",
                stats.sent,
                if stats.sent == 1 { "" } else { "s" },
                stats.failed,
                stats.requeued + stats.errors,
                stats.parked_web_forms
            );
            if stats.released > 0 {
                println!("Released {} expired claim{}", stats.released, if stats.released == 1 { "" } else { "s" });
            }
        }
        Command::UpgradeTimestamps { limit } => {
            if !ctx.timestamps.is_available() {
                println!("Timestamping is disabled; nothing to upgrade");
            } else {
                let stats = upgrade_pending_timestamps(&ctx.pool, &ctx.timestamps, limit)
                    .await
                    .context("Timestamp upgrade failed")?;
                println!(
                    "Checked {} pending proof{}: {} confirmed, {} failed",
                    stats.checked,
                    if stats.checked == 1 { "" } else { "s" },
                    stats.confirmed,
                    stats.failed
                );
            }
            shutdown_gracefully(cancel, tasks).await;
        }
        Command::Migrate => {}
    }
    Ok(())
}
