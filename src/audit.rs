//! Buffered audit trail.
//!
//! An [`AuditLog`] is created per request or job run with an injected sink and
//! buffer size. Entries are written when the buffer fills up and on
//! [`AuditLog::flush`], which callers invoke when the request ends. Sink
//! failures are logged and never fail the operation being audited.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::error_handling::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub recorded_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub action: String,
    pub target_id: Option<String>,
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(action: &str) -> Self {
        Self {
            recorded_at: Utc::now(),
            user_id: None,
            action: action.to_string(),
            target_id: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn target(mut self, target_id: &str) -> Self {
        self.target_id = Some(target_id.to_string());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Destination of flushed audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, entries: &[AuditEntry]) -> Result<(), DatabaseError>;
}

/// Persists entries to the `audit_log` table in one transaction per flush.
pub struct SqliteAuditSink {
    pool: SqlitePool,
}

impl SqliteAuditSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn write(&self, entries: &[AuditEntry]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO audit_log (recorded_at_ms, user_id, action, target_id, details)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(entry.recorded_at.timestamp_millis())
            .bind(&entry.user_id)
            .bind(&entry.action)
            .bind(&entry.target_id)
            .bind(serde_json::to_string(&entry.details)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
    buffer: Mutex<Vec<AuditEntry>>,
    buffer_size: usize,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            sink,
            buffer: Mutex::new(Vec::with_capacity(buffer_size)),
            buffer_size,
        }
    }

    /// Buffers an entry, flushing when the buffer is full.
    pub async fn record(&self, entry: AuditEntry) {
        let full = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(entry);
            buffer.len() >= self.buffer_size
        };
        if full {
            self.flush().await;
        }
    }

    /// Writes out everything buffered so far.
    pub async fn flush(&self) {
        let entries = std::mem::take(&mut *self.buffer.lock().await);
        if entries.is_empty() {
            return;
        }
        if let Err(e) = self.sink.write(&entries).await {
            log::error!("Failed to write {} audit entries: {e}", entries.len());
        }
    }

    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.len()
    }
}
