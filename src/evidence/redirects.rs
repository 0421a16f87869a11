//! HTTP redirect chain tracing.
//!
//! Redirects are followed manually so every hop from the detected URL to the
//! page that actually serves the content ends up in the evidence.

use std::collections::HashSet;

use anyhow::{Context, Error, Result};
use reqwest::Url;

use crate::config::REDIRECT_HOP_TIMEOUT;
use crate::evidence::request::apply_browser_headers;

/// Follows `Location` headers from `start_url`, up to `max_hops` requests.
///
/// `client` must have redirects disabled. The returned chain starts with
/// `start_url` and ends with the last URL requested. Tracing stops at the first
/// non-redirect status, a redirect without `Location`, or a URL already visited.
/// A failure on the first request is an error; a failure later returns the
/// chain traced so far.
pub async fn trace_redirects(
    start_url: &str,
    max_hops: usize,
    client: &reqwest::Client,
) -> Result<Vec<String>, Error> {
    let mut chain: Vec<String> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = Url::parse(start_url).context("invalid start URL")?;

    for _ in 0..max_hops {
        chain.push(current.to_string());
        visited.insert(current.to_string());

        let resp = match apply_browser_headers(client.get(current.clone()))
            .timeout(REDIRECT_HOP_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if chain.len() == 1 => return Err(e.into()),
            Err(e) => {
                log::warn!("Redirect trace stopped at {current}: {e}");
                break;
            }
        };

        let status = resp.status();
        if !status.is_redirection() {
            break;
        }
        let Some(location) = resp.headers().get(reqwest::header::LOCATION) else {
            log::warn!("Redirect status {} for {} but no Location header", status, current);
            break;
        };
        let location = location.to_str().unwrap_or("");
        let next = match current.join(location) {
            Ok(next) => next,
            Err(e) => {
                log::warn!("Unparseable Location '{location}' at {current}: {e}");
                break;
            }
        };
        if visited.contains(next.as_str()) {
            log::debug!("Redirect cycle detected at {next}");
            break;
        }
        current = next;
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn no_redirect_client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_follows_relative_and_absolute_locations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/b"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("{}/c", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let chain = trace_redirects(&format!("{}/a", server.uri()), 10, &no_redirect_client())
            .await
            .unwrap();
        assert_eq!(chain.len(), 3);
        assert!(chain[0].ends_with("/a"));
        assert!(chain[2].ends_with("/c"));
    }

    #[tokio::test]
    async fn test_stops_on_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop1"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop2"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/loop2"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop1"))
            .mount(&server)
            .await;

        let chain = trace_redirects(&format!("{}/loop1", server.uri()), 10, &no_redirect_client())
            .await
            .unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[tokio::test]
    async fn test_respects_hop_limit() {
        let server = MockServer::start().await;
        for i in 0..5 {
            Mock::given(method("GET"))
                .and(path(format!("/{i}")))
                .respond_with(
                    ResponseTemplate::new(307).insert_header("location", format!("/{}", i + 1)),
                )
                .mount(&server)
                .await;
        }
        let chain = trace_redirects(&format!("{}/0", server.uri()), 3, &no_redirect_client())
            .await
            .unwrap();
        assert_eq!(chain.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_start_url_is_error() {
        assert!(trace_redirects("not a url", 10, &no_redirect_client())
            .await
            .is_err());
    }
}
