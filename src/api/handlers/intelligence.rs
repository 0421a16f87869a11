//! AI filter and intelligence handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;

use crate::app::AppContext;
use crate::intelligence::{
    fetch_intelligence_for_scan, filter_search_results, load_few_shot_examples, optimize_query,
    refresh_keywords, FilterDecision, FilterThresholds, RefreshOutcome,
};
use crate::models::Product;
use crate::storage::products;

use super::super::auth::CallerId;
use super::super::error::ApiError;
use super::super::types::{FilterRequest, FilterResponse, IntelligenceQuery, IntelligenceResponse};

async fn load_owned_product(
    ctx: &AppContext,
    user_id: &str,
    product_id: &str,
) -> Result<Product, ApiError> {
    let product = products::get_product(&ctx.pool, product_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Product {product_id} not found")))?;
    if product.user_id != user_id {
        return Err(ApiError::forbidden());
    }
    Ok(product)
}

/// Classifies a scan's candidate results for one product.
pub async fn filter_results_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Json(request): Json<FilterRequest>,
) -> Result<Json<FilterResponse>, ApiError> {
    let product = load_owned_product(&ctx, &user_id, &request.product_id).await?;

    let mut thresholds = FilterThresholds::from_config(&ctx.config);
    if let Some(min) = request.min_confidence {
        if !(0.0..=1.0).contains(&min) {
            return Err(
                ApiError::bad_request("invalid_threshold", "min_confidence must be between 0 and 1")
                    .with_hint("Omit min_confidence to use the default threshold"),
            );
        }
        thresholds.min_confidence = min;
        thresholds.uncertain_floor = thresholds.uncertain_floor.min(min);
    }

    let intelligence = fetch_intelligence_for_scan(&ctx.pool, &product.id).await;
    let examples = load_few_shot_examples(&ctx.pool, &product.id).await?;
    let results = filter_search_results(
        ctx.llm.as_deref(),
        &request.results,
        &product,
        &intelligence,
        &examples,
        &thresholds,
    )
    .await;

    let filtered = results
        .iter()
        .filter(|r| r.decision == FilterDecision::Filtered)
        .count();
    let uncertain = results
        .iter()
        .filter(|r| r.decision == FilterDecision::UncertainPass)
        .count();
    log::info!(
        "Filtered {} results for product {}: {} kept, {filtered} dropped",
        results.len(),
        product.id,
        results.len() - filtered
    );
    Ok(Json(FilterResponse {
        kept: results.len() - filtered,
        filtered,
        uncertain,
        results,
    }))
}

/// Learned intelligence of a product, optionally applied to a search query.
pub async fn product_intelligence_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Path(product_id): Path<String>,
    Query(query): Query<IntelligenceQuery>,
) -> Result<Json<IntelligenceResponse>, ApiError> {
    let product = load_owned_product(&ctx, &user_id, &product_id).await?;
    let intelligence = fetch_intelligence_for_scan(&ctx.pool, &product.id).await;
    let optimized_query = query
        .query
        .filter(|q| !q.trim().is_empty())
        .map(|q| optimize_query(&q, &intelligence));
    Ok(Json(IntelligenceResponse {
        product_id: product.id,
        intelligence,
        optimized_query,
    }))
}

pub async fn refresh_keywords_handler(
    State(ctx): State<AppContext>,
    CallerId(user_id): CallerId,
    Path(product_id): Path<String>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let product = load_owned_product(&ctx, &user_id, &product_id).await?;
    let outcome =
        refresh_keywords(&ctx.pool, ctx.llm.as_deref(), &product.id, Utc::now()).await?;
    Ok(Json(outcome))
}
