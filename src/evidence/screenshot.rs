//! Screenshot capture through an external rendering API.

use anyhow::{bail, Context, Error, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::config::{Config, SCREENSHOT_TIMEOUT, SCREENSHOT_UPLOAD_TIMEOUT};
use crate::models::{Screenshot, ScreenshotStorage};

/// Rendering API plus optional durable storage for the captured image.
#[derive(Debug, Clone)]
pub struct ScreenshotApi {
    pub api_url: String,
    pub api_key: Option<String>,
    pub upload_url: Option<String>,
    pub upload_key: Option<String>,
}

impl ScreenshotApi {
    /// `None` when no rendering API is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.screenshot_api_url.as_ref().map(|api_url| Self {
            api_url: api_url.clone(),
            api_key: config.screenshot_api_key.clone(),
            upload_url: config.storage_upload_url.clone(),
            upload_key: config.storage_api_key.clone(),
        })
    }
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

fn with_key(builder: reqwest::RequestBuilder, key: Option<&str>) -> reqwest::RequestBuilder {
    match key {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}

/// Captures `target_url` and returns where the image lives.
///
/// The image is re-uploaded to durable storage when configured. A failed upload
/// keeps the rendering service's own link, marked as external.
pub async fn capture_screenshot(
    client: &reqwest::Client,
    api: &ScreenshotApi,
    target_url: &str,
) -> Result<Screenshot, Error> {
    let resp = with_key(client.get(&api.api_url), api.api_key.as_deref())
        .query(&[
            ("url", target_url),
            ("format", "png"),
            ("full_page", "true"),
            ("response_type", "json"),
        ])
        .timeout(SCREENSHOT_TIMEOUT)
        .send()
        .await
        .context("screenshot request failed")?;
    if !resp.status().is_success() {
        bail!("screenshot API returned status {}", resp.status());
    }
    let rendered: UrlResponse = resp.json().await.context("screenshot API response")?;
    let captured_at = Utc::now();

    if let Some(upload_url) = &api.upload_url {
        match upload(client, upload_url, api.upload_key.as_deref(), &rendered.url).await {
            Ok(url) => {
                return Ok(Screenshot {
                    url,
                    storage: ScreenshotStorage::Durable,
                    captured_at,
                })
            }
            Err(e) => log::warn!("Screenshot upload failed, keeping external link: {e:#}"),
        }
    }

    Ok(Screenshot {
        url: rendered.url,
        storage: ScreenshotStorage::External,
        captured_at,
    })
}

async fn upload(
    client: &reqwest::Client,
    upload_url: &str,
    key: Option<&str>,
    image_url: &str,
) -> Result<String, Error> {
    let image = client
        .get(image_url)
        .timeout(SCREENSHOT_UPLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    let resp = with_key(client.post(upload_url), key)
        .header(reqwest::header::CONTENT_TYPE, "image/png")
        .body(image)
        .timeout(SCREENSHOT_UPLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    let stored: UrlResponse = resp.json().await?;
    Ok(stored.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer, upload: bool) -> ScreenshotApi {
        ScreenshotApi {
            api_url: format!("{}/render", server.uri()),
            api_key: Some("key".into()),
            upload_url: upload.then(|| format!("{}/upload", server.uri())),
            upload_key: None,
        }
    }

    #[tokio::test]
    async fn test_uploaded_screenshot_is_durable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/render"))
            .and(query_param("url", "https://leak.example/x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"url": format!("{}/img.png", server.uri())}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"url": "https://store.example/s.png"})),
            )
            .mount(&server)
            .await;

        let shot = capture_screenshot(&reqwest::Client::new(), &api(&server, true), "https://leak.example/x")
            .await
            .unwrap();
        assert_eq!(shot.storage, ScreenshotStorage::Durable);
        assert_eq!(shot.url, "https://store.example/s.png");
    }

    #[tokio::test]
    async fn test_upload_failure_falls_back_to_external_link() {
        let server = MockServer::start().await;
        let external = format!("{}/img.png", server.uri());
        Mock::given(method("GET"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"url": external})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let shot = capture_screenshot(&reqwest::Client::new(), &api(&server, true), "https://leak.example/x")
            .await
            .unwrap();
        assert_eq!(shot.storage, ScreenshotStorage::External);
        assert_eq!(shot.url, external);
    }

    #[tokio::test]
    async fn test_render_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        assert!(
            capture_screenshot(&reqwest::Client::new(), &api(&server, false), "https://leak.example/x")
                .await
                .is_err()
        );
    }
}
