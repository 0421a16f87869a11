//! Caller identity and the internal trigger secret.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::config::{QUEUE_SECRET_HEADER, USER_ID_HEADER};

use super::error::ApiError;

/// The authenticated user, as set by the upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CallerId(v.to_string()))
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Checks the queue trigger secret in constant time.
///
/// A server without a configured secret refuses every trigger.
pub fn check_queue_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected.filter(|s| !s.is_empty()) else {
        return Err(ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "trigger_disabled",
            "Queue trigger is not configured",
        ));
    };
    let provided = headers
        .get(QUEUE_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if bool::from(provided.ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Invalid queue secret"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request, StatusCode};

    #[tokio::test]
    async fn test_caller_id_from_header() {
        let request = Request::builder()
            .header(USER_ID_HEADER, " u1 ")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let caller = CallerId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller, CallerId("u1".into()));
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthorized() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = CallerId::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_queue_secret() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            check_queue_secret(&headers, None).unwrap_err().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            check_queue_secret(&headers, Some("s3cret")).unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
        headers.insert(QUEUE_SECRET_HEADER, HeaderValue::from_static("s3cre"));
        assert!(check_queue_secret(&headers, Some("s3cret")).is_err());
        headers.insert(QUEUE_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(check_queue_secret(&headers, Some("s3cret")).is_ok());
    }
}
