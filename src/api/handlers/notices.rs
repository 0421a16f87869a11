//! Notice generation handler.

use axum::extract::State;
use axum::Json;

use crate::app::AppContext;
use crate::audit::AuditEntry;
use crate::notice::{
    build_notice, check_notice_quality, NoticeContact, NoticeEvidence, QualityFields,
};
use crate::storage::{products, snapshots};
use crate::targets::resolve_all_targets;

use super::super::auth::CallerId;
use super::super::error::ApiError;
use super::super::types::{GenerateNoticeRequest, GenerateNoticeResponse};

/// Builds the notice for a verified infringement along with its quality
/// score and every party it could be sent to.
pub async fn generate_notice_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Json(request): Json<GenerateNoticeRequest>,
) -> Result<Json<GenerateNoticeResponse>, ApiError> {
    let (infringement, product) = ctx
        .pipeline
        .load_owned(&user_id, &request.infringement_id)
        .await?;

    if !infringement.status.allows_notice() {
        return Err(ApiError::bad_request(
            "invalid_status",
            format!(
                "Notices cannot be generated for infringements in status {}",
                infringement.status
            ),
        )
        .with_hint("Verify the infringement before generating a notice"));
    }

    let profile = products::get_profile(&ctx.pool, &user_id)
        .await?
        .ok_or_else(|| {
            ApiError::bad_request("profile_missing", "No copyright profile on file")
                .with_hint("Complete your copyright profile with your name, email and address")
        })?;
    let contact = request
        .contact
        .unwrap_or_else(|| NoticeContact::from_profile(&profile));
    if !contact.is_complete() {
        return Err(
            ApiError::bad_request("contact_incomplete", "Contact name and email are required")
                .with_hint("Provide your full legal name and a valid email address"),
        );
    }
    if !profile.has_address() {
        return Err(
            ApiError::bad_request("address_missing", "A postal address is required")
                .with_hint("Add your street address, city and country to your copyright profile"),
        );
    }

    let infra = &infringement.infrastructure;
    let targets = resolve_all_targets(
        &infringement.source_url,
        &infringement.platform,
        infra.hosting_provider.as_deref(),
        infra.registrar.as_deref(),
        infra.registrar_abuse_email.as_deref(),
    );
    let chosen = match request.target {
        Some(kind) => targets.iter().find(|t| t.target_type == kind).ok_or_else(|| {
            ApiError::bad_request(
                "target_unavailable",
                format!("No {kind} contact is known for this infringement"),
            )
            .with_hint("Leave the target empty to use the recommended recipient")
        })?,
        None => targets
            .iter()
            .find(|t| t.recommended)
            .ok_or_else(|| ApiError::internal("target resolution returned no recommendation"))?,
    };

    let snapshot = snapshots::get_snapshot_for_infringement(&ctx.pool, &infringement.id).await?;
    let evidence = NoticeEvidence {
        packet: infringement.evidence.clone(),
        snapshot_hash: snapshot.as_ref().map(|s| s.content_hash.clone()),
        timestamp: snapshot.and_then(|s| s.timestamp_proof),
        curated_items: request.evidence_items,
    };

    let notice = build_notice(
        &contact,
        &product,
        &infringement,
        &profile,
        &chosen.provider,
        &request.comparison_items,
        &evidence,
    );
    let quality = check_notice_quality(&QualityFields::for_notice(
        &contact,
        &profile,
        &product,
        &infringement,
        &chosen.provider,
        &evidence,
    ));

    let audit = ctx.audit_log();
    audit
        .record(
            AuditEntry::new("notice_generated")
                .user(&user_id)
                .target(&infringement.id)
                .details(serde_json::json!({
                    "target_type": chosen.target_type,
                    "recipient": chosen.provider.name,
                    "score": quality.score,
                    "strength": quality.strength,
                })),
        )
        .await;
    audit.flush().await;

    Ok(Json(GenerateNoticeResponse {
        notice,
        quality,
        enforcement_targets: targets,
    }))
}
