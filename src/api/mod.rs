//! HTTP API of the enforcement pipeline.
//!
//! Every `/api` route except the queue trigger requires the caller identity
//! header set by the upstream auth layer. The queue trigger is authenticated
//! by a shared secret instead.

mod auth;
mod error;
mod handlers;
mod types;

use std::future::Future;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;

use crate::app::AppContext;

pub use auth::{check_queue_secret, CallerId};
pub use error::ApiError;
use handlers::{
    batch_status_handler, cancel_batch_handler, filter_results_handler, generate_notice_handler,
    health_handler, process_queue_handler, product_intelligence_handler,
    refresh_keywords_handler, reject_infringement_handler, submit_batch_handler,
    verify_infringement_handler,
};
pub use types::*;

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/notices/generate", post(generate_notice_handler))
        .route("/api/bulk/submit", post(submit_batch_handler))
        .route("/api/bulk/{batch_id}", get(batch_status_handler))
        .route("/api/bulk/{batch_id}/cancel", post(cancel_batch_handler))
        .route("/api/queue/process", post(process_queue_handler))
        .route("/api/infringements/{id}/verify", post(verify_infringement_handler))
        .route("/api/infringements/{id}/reject", post(reject_infringement_handler))
        .route("/api/filter", post(filter_results_handler))
        .route(
            "/api/products/{id}/intelligence",
            get(product_intelligence_handler),
        )
        .route(
            "/api/products/{id}/keywords/refresh",
            post(refresh_keywords_handler),
        )
        .with_state(ctx)
}

/// Serves the API on `bind_addr` until `shutdown` resolves.
pub async fn start_api_server(
    bind_addr: &str,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind API server to {bind_addr}"))?;

    log::info!("API server listening on http://{bind_addr}/");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}
