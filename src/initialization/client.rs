//! HTTP client initialization.
//!
//! Two clients are shared by the pipeline: a general one for API calls and page
//! fetches, and one with redirects disabled so redirect chains can be traced
//! hop by hop.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::Config;

/// Initializes the general HTTP client.
///
/// Uses the configured browser User-Agent and request timeout and follows up
/// to 10 redirects.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

/// Initializes an HTTP client for redirect resolution.
///
/// Redirects are disabled so that every `Location` hop is observed and recorded
/// in the evidence chain.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_redirect_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build_from_default_config() {
        let config = Config::default();
        assert!(init_client(&config).is_ok());
        assert!(init_redirect_client(&config).is_ok());
    }
}
