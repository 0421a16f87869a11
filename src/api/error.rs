//! HTTP error responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error_handling::{BatchError, DatabaseError, PipelineError};

/// An error returned to API callers as a JSON body.
///
/// Validation failures carry a machine-readable `code` and a `hint` telling
/// the caller how to fix the request. Internal failures are logged and
/// reported without detail.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    retry_after_seconds: Option<u64>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint: None,
            retry_after_seconds: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            "You do not have access to this resource",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: u64) -> Self {
        Self {
            retry_after_seconds: Some(retry_after_seconds),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message)
        }
    }

    /// Logs `error` and hides it from the caller.
    pub fn internal(error: impl std::fmt::Display) -> Self {
        log::error!("Request failed: {error}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            code: self.code,
            hint: self.hint.as_deref(),
            retry_after_seconds: self.retry_after_seconds,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_seconds {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        Self::internal(error)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(format!("{error:#}"))
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::NotFound(_) => Self::not_found(error.to_string()),
            PipelineError::Forbidden => Self::forbidden(),
            PipelineError::InvalidTransition { .. } => {
                Self::new(StatusCode::CONFLICT, "invalid_transition", error.to_string())
                    .with_hint("Only infringements pending verification can be verified or rejected")
            }
            PipelineError::SnapshotEncoding(_) | PipelineError::Database(_) => Self::internal(error),
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(error: BatchError) -> Self {
        let message = error.to_string();
        match error {
            BatchError::RateLimited {
                retry_after_secs, ..
            } => Self::rate_limited(message, retry_after_secs),
            BatchError::MissingSignature => Self::bad_request("missing_signature", message)
                .with_hint("Type your full legal name as the signature"),
            BatchError::ConsentNotConfirmed => Self::bad_request("consent_required", message)
                .with_hint("Confirm both the perjury and the liability statements"),
            BatchError::InvalidItemCount { max, .. } => {
                Self::bad_request("invalid_item_count", message)
                    .with_hint(format!("Submit between 1 and {max} notices per batch"))
            }
            BatchError::MissingRecipient { .. } => Self::bad_request("missing_recipient", message)
                .with_hint("Email items need a recipient address; use web_form or manual otherwise"),
            BatchError::Database(e) => Self::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let err: ApiError = BatchError::RateLimited {
            elapsed_secs: 60,
            retry_after_secs: 240,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "240");
        let body = body_json(response).await;
        assert_eq!(body["code"], "rate_limited");
        assert_eq!(body["retry_after_seconds"], 240);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let err: ApiError = DatabaseError::FileCreationError("/secret/path".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body.to_string().contains("/secret/path"));
        assert!(body.get("hint").is_none());
    }

    #[test]
    fn test_pipeline_error_statuses() {
        assert_eq!(
            ApiError::from(PipelineError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PipelineError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
        let conflict = ApiError::from(PipelineError::InvalidTransition {
            from: "false_positive".into(),
            to: "active".into(),
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert!(conflict.hint.is_some());
    }

    #[test]
    fn test_batch_validation_errors_carry_hints() {
        let err = ApiError::from(BatchError::InvalidItemCount { count: 51, max: 50 });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_item_count");
        assert!(err.hint.as_deref().is_some_and(|h| h.contains("50")));
    }
}
