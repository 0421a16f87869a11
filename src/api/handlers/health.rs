//! Liveness handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app::AppContext;

use super::super::types::HealthResponse;

/// Reports whether the database answers.
pub async fn health_handler(State(ctx): State<AppContext>) -> Response {
    let (status, label) = match sqlx::query("SELECT 1").execute(&ctx.pool).await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(e) => {
            log::error!("Health check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "database_unavailable")
        }
    };
    let body = HealthResponse {
        status: label,
        timestamps_available: ctx.timestamps.is_available(),
    };
    (status, Json(body)).into_response()
}
