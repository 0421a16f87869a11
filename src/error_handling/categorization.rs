//! Retry strategy and error retriability.

use std::time::Duration;

use anyhow::Error;
use tokio_retry::strategy::ExponentialBackoff;

use crate::config::{
    HTTP_STATUS_TOO_MANY_REQUESTS, RETRY_FACTOR, RETRY_INITIAL_DELAY_MS, RETRY_MAX_ATTEMPTS,
    RETRY_MAX_DELAY_SECS,
};

/// Creates an exponential backoff retry strategy for outbound API calls.
///
/// The iterator is limited to `RETRY_MAX_ATTEMPTS` retries so a flaky
/// collaborator cannot hold a request handler open indefinitely.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(RETRY_INITIAL_DELAY_MS)
        .factor(RETRY_FACTOR)
        .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
        .take(RETRY_MAX_ATTEMPTS)
}

/// Determines if an error is transient and worth retrying.
///
/// Timeouts, connection failures, 429 and 5xx responses are retriable. Other
/// 4xx responses, URL parse errors and database errors are permanent.
pub fn is_retriable_error(error: &Error) -> bool {
    for cause in error.chain() {
        if let Some(reqwest_err) = cause.downcast_ref::<reqwest::Error>() {
            if let Some(status) = reqwest_err.status() {
                let status_code = status.as_u16();
                if status_code == HTTP_STATUS_TOO_MANY_REQUESTS {
                    return true;
                }
                if (400..500).contains(&status_code) {
                    return false;
                }
                if (500..600).contains(&status_code) {
                    return true;
                }
            }

            if reqwest_err.is_timeout() || reqwest_err.is_connect() || reqwest_err.is_request() {
                return true;
            }

            if reqwest_err.is_redirect() || reqwest_err.is_decode() {
                return false;
            }
        }

        if cause.downcast_ref::<url::ParseError>().is_some() {
            return false;
        }

        if cause.downcast_ref::<sqlx::Error>().is_some() {
            return false;
        }
    }

    true
}
