//! Bulk submission, batch status and queue trigger handlers.

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;

use crate::app::AppContext;
use crate::audit::AuditEntry;
use crate::error_handling::BatchError;
use crate::queue::{cancel_batch, create_batch, load_batch, BatchLimits, BatchReceipt, ProcessStats};
use crate::side_effects::SideEffect;

use super::super::auth::{check_queue_secret, CallerId};
use super::super::error::ApiError;
use super::super::types::{BatchStatusResponse, BulkSubmitRequest, CancelBatchResponse};

/// Queues a signed batch of reviewed notices for staggered delivery.
pub async fn submit_batch_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Json(request): Json<BulkSubmitRequest>,
) -> Result<Json<BatchReceipt>, ApiError> {
    let limits = BatchLimits::from_config(&ctx.config);
    let count = request.items.len();
    if count == 0 || count > limits.max_items {
        return Err(BatchError::InvalidItemCount {
            count,
            max: limits.max_items,
        }
        .into());
    }

    let mut checked = HashSet::new();
    for item in &request.items {
        if checked.insert(item.infringement_id.as_str()) {
            ctx.pipeline
                .load_owned(&user_id, &item.infringement_id)
                .await?;
        }
    }

    let receipt = create_batch(
        &ctx.pool,
        &user_id,
        request.items,
        &request.attestation,
        &limits,
        ctx.kicker.as_ref(),
        Utc::now(),
    )
    .await?;

    ctx.side_effects.emit(SideEffect::BatchSubmitted {
        user_id: user_id.clone(),
        batch_id: receipt.batch_id.clone(),
        total: receipt.total_queued,
    });
    let audit = ctx.audit_log();
    audit
        .record(
            AuditEntry::new("batch_submitted")
                .user(&user_id)
                .target(&receipt.batch_id)
                .details(serde_json::json!({
                    "total": receipt.total_queued,
                    "email": receipt.email_count,
                    "web_form": receipt.web_form_count,
                    "signature_name": request.attestation.signature_name,
                })),
        )
        .await;
    audit.flush().await;

    Ok(Json(receipt))
}

pub async fn batch_status_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchStatusResponse>, ApiError> {
    let (summary, items) = load_batch(&ctx.pool, &batch_id, &user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Batch {batch_id} not found")))?;
    Ok(Json(BatchStatusResponse { summary, items }))
}

/// Skips every still-pending item of a batch. Items already sent or being
/// sent are left alone.
pub async fn cancel_batch_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Path(batch_id): Path<String>,
) -> Result<Json<CancelBatchResponse>, ApiError> {
    let skipped = cancel_batch(&ctx.pool, &batch_id, &user_id, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Batch {batch_id} not found")))?;
    if skipped > 0 {
        let audit = ctx.audit_log();
        audit
            .record(
                AuditEntry::new("batch_cancelled")
                    .user(&user_id)
                    .target(&batch_id)
                    .details(serde_json::json!({ "skipped": skipped })),
            )
            .await;
        audit.flush().await;
    }
    Ok(Json(CancelBatchResponse { batch_id, skipped }))
}

/// Trusted trigger for one queue pass, authenticated by the shared secret.
pub async fn process_queue_handler(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<ProcessStats>, ApiError> {
    check_queue_secret(&headers, ctx.config.queue_secret.as_deref())?;
    let stats = ctx.processor.process_due_items(Utc::now()).await?;
    Ok(Json(stats))
}
