// Shared test helpers for database setup, seeding and API requests.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use takedown_pipeline::app::AppContext;
use takedown_pipeline::config::USER_ID_HEADER;
use takedown_pipeline::models::{
    CopyrightProfile, EvidencePacket, InfrastructureSnapshot, Infringement, InfringementStatus,
    Product,
};
use takedown_pipeline::storage::{infringements, products, run_migrations};
use takedown_pipeline::Config;

pub const QUEUE_SECRET: &str = "test-queue-secret";

/// Creates an in-memory database with migrations applied, pinned to one
/// connection so every query sees the same database.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Configuration without any outbound collaborators.
pub fn offline_config() -> Config {
    Config {
        disable_timestamps: true,
        disable_wayback: true,
        queue_secret: Some(QUEUE_SECRET.to_string()),
        ..Default::default()
    }
}

pub fn test_context(pool: SqlitePool) -> AppContext {
    let cancel = CancellationToken::new();
    let (ctx, dispatcher) =
        AppContext::build(offline_config(), pool, &cancel).expect("Failed to build context");
    assert!(dispatcher.is_none());
    ctx
}

pub async fn seed_product(pool: &SqlitePool, id: &str, user_id: &str) -> Product {
    let product = Product {
        id: id.to_string(),
        user_id: user_id.to_string(),
        name: "Ultimate Brain".to_string(),
        product_type: Some("notion_template".to_string()),
        url: Some("https://shop.example.com/ultimate-brain".to_string()),
        price: Some(99.0),
        keywords: vec!["ultimate brain".to_string()],
        ai_extracted_data: None,
    };
    products::insert_product(pool, &product)
        .await
        .expect("Failed to insert product");
    products::upsert_profile(
        pool,
        &CopyrightProfile {
            user_id: user_id.to_string(),
            full_name: Some("Jane Creator".to_string()),
            company: None,
            email: Some("jane@creator.example".to_string()),
            phone: None,
            address: Some("1 Main St".to_string()),
            city: Some("Austin".to_string()),
            state: Some("TX".to_string()),
            zip: Some("78701".to_string()),
            country: Some("USA".to_string()),
        },
    )
    .await
    .expect("Failed to insert profile");
    product
}

pub async fn seed_infringement(
    pool: &SqlitePool,
    id: &str,
    product_id: &str,
    source_url: &str,
    status: InfringementStatus,
) -> Infringement {
    let infringement = Infringement {
        id: id.to_string(),
        product_id: product_id.to_string(),
        source_url: source_url.to_string(),
        platform: "unknown".to_string(),
        status,
        severity_score: 70,
        match_type: Some("exact_copy".to_string()),
        match_confidence: None,
        evidence: Some(EvidencePacket::default()),
        infrastructure: InfrastructureSnapshot {
            hosting_provider: Some("Cloudflare".to_string()),
            ..Default::default()
        },
        evidence_snapshot_id: None,
        detected_at: chrono::Utc::now(),
        verified_at: None,
    };
    infringements::insert_infringement(pool, &infringement)
        .await
        .expect("Failed to insert infringement");
    infringement
}

pub fn json_request(method: &str, uri: &str, user_id: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header(USER_ID_HEADER, user_id);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

pub fn empty_request(method: &str, uri: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(USER_ID_HEADER, user_id);
    }
    builder.body(Body::empty()).expect("Failed to build request")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Response body was not JSON")
}
