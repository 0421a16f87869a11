//! Browser-like request headers for evidence fetches.
//!
//! Storefronts that redistribute paid products often serve a different page,
//! or nothing, to clients that do not look like a browser. The User-Agent is
//! set on the client itself (see `initialization::init_client`).

/// Applies Chrome-like navigation headers to a request.
pub(crate) fn apply_browser_headers(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    builder
        .header(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        )
        .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .header(reqwest::header::REFERER, "https://www.google.com/")
        .header(
            reqwest::header::HeaderName::from_static("sec-fetch-dest"),
            "document",
        )
        .header(
            reqwest::header::HeaderName::from_static("sec-fetch-mode"),
            "navigate",
        )
        .header(
            reqwest::header::HeaderName::from_static("upgrade-insecure-requests"),
            "1",
        )
}
