//! Plain HTTP fetch mode
//!
//! No JavaScript, no rendering: one GET per URL through a client that keeps
//! its own cookie jar for the lifetime of a seed.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Instant;

use super::html::{anchor_links, challenge_marker, html_to_text, page_title};
use super::{FetchBackend, FetchErrorKind, FetchResult, FetchSettings, Fetcher};
use crate::utils::{CHROME_USER_AGENT, MAX_TEXT_PER_PAGE};

/// HTTP-only fetcher for a single seed
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with a fresh cookie jar
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(settings: &FetchSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(CHROME_USER_AGENT)
            .cookie_store(true)
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client })
    }

    fn classify(error: &reqwest::Error) -> FetchErrorKind {
        if error.is_timeout() {
            FetchErrorKind::Timeout
        } else if error.is_connect() || error.is_request() || error.is_body() {
            FetchErrorKind::Connection
        } else if error.is_status() {
            FetchErrorKind::HttpStatus
        } else {
            FetchErrorKind::Other
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let started = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::failure(
                    url,
                    Self::classify(&e),
                    format!("request failed: {e}"),
                    started.elapsed(),
                );
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase())
            .unwrap_or_default();

        let raw_bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                return FetchResult::failure(
                    url,
                    Self::classify(&e),
                    format!("reading body failed: {e}"),
                    started.elapsed(),
                );
            }
        };

        let mut result = FetchResult {
            ok: status.is_success(),
            url: url.to_string(),
            final_url,
            status_code: status.as_u16(),
            content_type,
            raw_bytes,
            ..FetchResult::default()
        };

        if result.is_html() {
            let html = result.body_text().into_owned();
            result.title = page_title(&html);
            result.extracted_text = html_to_text(&html, MAX_TEXT_PER_PAGE);
            result.outbound_links = anchor_links(result.base_url(), &html);
        }

        if !result.ok {
            result.error_kind = Some(FetchErrorKind::HttpStatus);
            result.error = format!("HTTP {status}");
        }

        if let Some(marker) = challenge_marker(&result.title, &result.extracted_text) {
            result.ok = false;
            result.error_kind = Some(FetchErrorKind::Blocked);
            result.error = format!("blocked: challenge page ({marker})");
        }

        result.elapsed = started.elapsed();
        debug!(
            target: "campusscrape::fetch",
            "GET {url} -> {} ({} bytes, {:?})",
            result.status_code,
            result.raw_bytes.len(),
            result.elapsed
        );
        result
    }
}

/// Opens one [`HttpFetcher`] per seed
#[derive(Debug, Clone, Default)]
pub struct HttpBackend {
    settings: FetchSettings,
}

impl HttpBackend {
    #[must_use]
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl FetchBackend for HttpBackend {
    async fn open(&self, _site_identity: &str) -> anyhow::Result<Box<dyn Fetcher>> {
        Ok(Box::new(HttpFetcher::new(&self.settings)?))
    }
}
