//! Verify and reject handlers.

use axum::extract::{Path, State};
use axum::Json;

use crate::app::AppContext;
use crate::pipeline::{RejectOutcome, VerifyOutcome};

use super::super::auth::CallerId;
use super::super::error::ApiError;

pub async fn verify_infringement_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Path(infringement_id): Path<String>,
) -> Result<Json<VerifyOutcome>, ApiError> {
    let audit = ctx.audit_log();
    let result = ctx
        .pipeline
        .verify_infringement(&user_id, &infringement_id, &audit)
        .await;
    audit.flush().await;
    Ok(Json(result?))
}

pub async fn reject_infringement_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Path(infringement_id): Path<String>,
) -> Result<Json<RejectOutcome>, ApiError> {
    let audit = ctx.audit_log();
    let result = ctx
        .pipeline
        .reject_infringement(&user_id, &infringement_id, &audit)
        .await;
    audit.flush().await;
    Ok(Json(result?))
}
