//! Product and profile records.
//!
//! The dashboard owns editing of these rows; the pipeline reads them and
//! merges refreshed keyword extraction results back.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::{AiExtractedData, CopyrightProfile, Product};

use super::utils::{from_json_opt, from_ms, to_json, to_ms};

pub async fn insert_product(pool: &SqlitePool, product: &Product) -> Result<(), DatabaseError> {
    let ai = product.ai_extracted_data.as_ref().map(to_json).transpose()?;
    sqlx::query(
        "INSERT INTO products (id, user_id, name, product_type, url, price, keywords, ai_extracted_data, created_at_ms)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&product.id)
    .bind(&product.user_id)
    .bind(&product.name)
    .bind(&product.product_type)
    .bind(&product.url)
    .bind(product.price)
    .bind(to_json(&product.keywords)?)
    .bind(ai)
    .bind(to_ms(Utc::now()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_product(pool: &SqlitePool, id: &str) -> Result<Option<Product>, DatabaseError> {
    let row = sqlx::query(
        "SELECT id, user_id, name, product_type, url, price, keywords, ai_extracted_data
         FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let keywords: Option<Vec<String>> = from_json_opt(row.try_get("keywords")?)?;
    let ai: Option<AiExtractedData> = from_json_opt(row.try_get("ai_extracted_data")?)?;

    Ok(Some(Product {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        product_type: row.try_get("product_type")?,
        url: row.try_get("url")?,
        price: row.try_get("price")?,
        keywords: keywords.unwrap_or_default(),
        ai_extracted_data: ai.map(AiExtractedData::migrate),
    }))
}

pub async fn update_ai_extracted_data(
    pool: &SqlitePool,
    product_id: &str,
    data: &AiExtractedData,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE products SET ai_extracted_data = ? WHERE id = ?")
        .bind(to_json(data)?)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn upsert_profile(
    pool: &SqlitePool,
    profile: &CopyrightProfile,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO profiles (user_id, full_name, company, email, phone, address, city, state, zip, country)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
            full_name = excluded.full_name, company = excluded.company, email = excluded.email,
            phone = excluded.phone, address = excluded.address, city = excluded.city,
            state = excluded.state, zip = excluded.zip, country = excluded.country",
    )
    .bind(&profile.user_id)
    .bind(&profile.full_name)
    .bind(&profile.company)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(&profile.address)
    .bind(&profile.city)
    .bind(&profile.state)
    .bind(&profile.zip)
    .bind(&profile.country)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_profile(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<CopyrightProfile>, DatabaseError> {
    let row = sqlx::query(
        "SELECT user_id, full_name, company, email, phone, address, city, state, zip, country
         FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(CopyrightProfile {
            user_id: row.try_get("user_id")?,
            full_name: row.try_get("full_name")?,
            company: row.try_get("company")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            zip: row.try_get("zip")?,
            country: row.try_get("country")?,
        })
    })
    .transpose()
}

pub async fn last_keyword_refresh(
    pool: &SqlitePool,
    product_id: &str,
) -> Result<Option<chrono::DateTime<Utc>>, DatabaseError> {
    let ms: Option<i64> =
        sqlx::query_scalar("SELECT refreshed_at_ms FROM keyword_refreshes WHERE product_id = ?")
            .bind(product_id)
            .fetch_optional(pool)
            .await?;
    Ok(ms.map(from_ms))
}

pub async fn record_keyword_refresh(
    pool: &SqlitePool,
    product_id: &str,
    feedback_count: i64,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO keyword_refreshes (product_id, refreshed_at_ms, feedback_count) VALUES (?, ?, ?)
         ON CONFLICT(product_id) DO UPDATE SET
            refreshed_at_ms = excluded.refreshed_at_ms, feedback_count = excluded.feedback_count",
    )
    .bind(product_id)
    .bind(to_ms(Utc::now()))
    .bind(feedback_count)
    .execute(pool)
    .await?;
    Ok(())
}
