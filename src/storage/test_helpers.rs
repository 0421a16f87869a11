//! Shared test helpers for storage module tests.
//!
//! Provides an in-memory database with migrations applied and seed helpers for
//! the records most tests need.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::models::{
    CopyrightProfile, EvidencePacket, InfrastructureSnapshot, Infringement, InfringementStatus,
    Product,
};
use crate::storage::run_migrations;

/// Creates a test database pool with migrations applied.
///
/// Each connection to `sqlite::memory:` is its own database, so the pool is
/// pinned to a single connection.
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

pub fn sample_product(id: &str, user_id: &str) -> Product {
    Product {
        id: id.to_string(),
        user_id: user_id.to_string(),
        name: "Ultimate Brain".to_string(),
        product_type: Some("notion_template".to_string()),
        url: Some("https://shop.example.com/ultimate-brain".to_string()),
        price: Some(99.0),
        keywords: vec!["ultimate brain".to_string(), "notion template".to_string()],
        ai_extracted_data: None,
    }
}

pub fn sample_profile(user_id: &str) -> CopyrightProfile {
    CopyrightProfile {
        user_id: user_id.to_string(),
        full_name: Some("Jane Creator".to_string()),
        company: Some("Creator Co".to_string()),
        email: Some("jane@creator.example".to_string()),
        phone: Some("+1 555 0100".to_string()),
        address: Some("1 Main St".to_string()),
        city: Some("Austin".to_string()),
        state: Some("TX".to_string()),
        zip: Some("78701".to_string()),
        country: Some("USA".to_string()),
    }
}

pub fn sample_infringement(id: &str, product_id: &str, status: InfringementStatus) -> Infringement {
    Infringement {
        id: id.to_string(),
        product_id: product_id.to_string(),
        source_url: "https://leaks.example.net/ultimate-brain".to_string(),
        platform: "unknown".to_string(),
        status,
        severity_score: 70,
        match_type: Some("exact_copy".to_string()),
        match_confidence: None,
        evidence: Some(EvidencePacket::default()),
        infrastructure: InfrastructureSnapshot {
            hosting_provider: Some("Cloudflare".to_string()),
            country: Some("US".to_string()),
            ..Default::default()
        },
        evidence_snapshot_id: None,
        detected_at: Utc::now(),
        verified_at: None,
    }
}

/// Seeds a product, its owner's profile and one infringement.
pub async fn seed_infringement(
    pool: &SqlitePool,
    user_id: &str,
    status: InfringementStatus,
) -> Infringement {
    let product = sample_product("prod-1", user_id);
    crate::storage::products::insert_product(pool, &product)
        .await
        .expect("Failed to insert test product");
    crate::storage::products::upsert_profile(pool, &sample_profile(user_id))
        .await
        .expect("Failed to insert test profile");
    let infringement = sample_infringement("inf-1", &product.id, status);
    crate::storage::infringements::insert_infringement(pool, &infringement)
        .await
        .expect("Failed to insert test infringement");
    infringement
}
