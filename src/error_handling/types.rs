//! Error type definitions.
//!
//! One `thiserror` enum per concern. Public pipeline entry points that talk to
//! external services never surface these directly; they degrade to partial
//! results and record the error text instead.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("JSON column error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A stored enum column held a value the application does not know.
    #[error("Invalid stored value for {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

/// Failures talking to the LLM completion API.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM is not configured")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Request(#[from] ReqwestError),

    #[error("LLM returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM response was not valid JSON: {0}")]
    MalformedResponse(String),
}

/// Failures talking to the timestamp notary.
#[derive(Error, Debug)]
pub enum NotaryError {
    #[error("Notary request failed: {0}")]
    Request(#[from] ReqwestError),

    #[error("Notary returned status {0}")]
    Status(u16),

    #[error("Proof is not a valid encoding: {0}")]
    InvalidProof(String),
}

/// Failures delivering a notice.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Email delivery is not configured")]
    NotConfigured,

    #[error("Item has no recipient address")]
    MissingRecipient,

    #[error("Email request failed: {0}")]
    Request(#[from] ReqwestError),

    #[error("Email API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl DeliveryError {
    /// Whether another attempt could succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            DeliveryError::NotConfigured | DeliveryError::MissingRecipient => false,
            DeliveryError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DeliveryError::Rejected { status, .. } => {
                *status == crate::config::HTTP_STATUS_TOO_MANY_REQUESTS || *status >= 500
            }
        }
    }
}

/// Validation and persistence failures while creating a bulk batch.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("A typed full legal name is required to sign the batch")]
    MissingSignature,

    #[error("Both the perjury and liability statements must be confirmed")]
    ConsentNotConfirmed,

    #[error("A batch must contain between 1 and {max} notices, got {count}")]
    InvalidItemCount { count: usize, max: usize },

    #[error("A batch was created {elapsed_secs}s ago; wait {retry_after_secs}s before the next one")]
    RateLimited {
        elapsed_secs: u64,
        retry_after_secs: u64,
    },

    #[error("Item {index} has no recipient for email delivery")]
    MissingRecipient { index: usize },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for BatchError {
    fn from(e: sqlx::Error) -> Self {
        BatchError::Database(DatabaseError::SqlError(e))
    }
}

/// Failures of the verify/reject flow.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Infringement {0} not found")]
    NotFound(String),

    #[error("Infringement belongs to another user")]
    Forbidden,

    #[error("Cannot move infringement from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Evidence snapshot could not be encoded: {0}")]
    SnapshotEncoding(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
