//! takedown_pipeline library: enforcement of copyright claims against
//! infringing copies of digital products.
//!
//! The pipeline takes a detected infringement through verification and
//! evidence preservation, resolves who can take the content down, writes a
//! DMCA notice and delivers it through a staggered, rate-limited queue.
//! Every verify/reject decision feeds an intelligence engine that tunes
//! later scans.
//!
//! # Example
//!
//! ```no_run
//! use takedown_pipeline::app::{spawn_background_tasks, AppContext};
//! use takedown_pipeline::storage::{init_db_pool_with_path, run_migrations};
//! use takedown_pipeline::Config;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let pool = init_db_pool_with_path(&config.db_path).await?;
//! run_migrations(&pool).await?;
//!
//! let cancel = CancellationToken::new();
//! let (mut ctx, _dispatcher) = AppContext::build(config, pool, &cancel)?;
//! let _tasks = spawn_background_tasks(&mut ctx, &cancel);
//! takedown_pipeline::api::start_api_server("127.0.0.1:8080", ctx, async move {
//!     cancel.cancelled().await
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod api;
pub mod app;
pub mod audit;
pub mod config;
pub mod domain;
pub mod error_handling;
pub mod evidence;
pub mod initialization;
pub mod intelligence;
pub mod models;
pub mod notice;
pub mod pipeline;
pub mod queue;
pub mod side_effects;
pub mod storage;
pub mod targets;
pub mod timestamp;
pub mod whois;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use pipeline::EnforcementPipeline;
