//! Fetch layer: one interface, two implementations
//!
//! [`HttpFetcher`] issues plain GET requests; [`BrowserFetcher`] drives a
//! Chromium tab (navigate, settle, scroll, read the rendered DOM). Both hand
//! back a [`FetchResult`] and never raise: failures are data, classified by
//! [`FetchErrorKind`] so the retry loop can tell transient from final.
//!
//! Every seed gets its own session from a [`FetchBackend`], and the session is
//! closed when the seed is finished, so cookies and storage never leak from one
//! site to the next.

pub mod browser;
pub mod cleanup;
pub mod html;
pub mod http;
pub mod js_scripts;
pub mod memo;
pub mod page_timeout;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;

pub use browser::{BrowserBackend, BrowserFetcher};
pub use http::{HttpBackend, HttpFetcher};
pub use memo::MemoFetcher;
pub use retry::{RetryPolicy, fetch_with_retry, looks_blocked};

/// Why a fetch did not produce a usable page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchErrorKind {
    /// Per-fetch timeout elapsed
    Timeout,
    /// DNS, refused or reset connection
    Connection,
    /// Anti-bot challenge page or an empty failure
    Blocked,
    /// Server answered with a non-success status
    HttpStatus,
    /// Browser/CDP failure
    Browser,
    Other,
}

impl FetchErrorKind {
    /// Classify an error into a fetch error kind based on message patterns
    #[must_use]
    pub fn classify(error: &anyhow::Error) -> Self {
        let msg = format!("{error:#}").to_lowercase();

        if retry::CHALLENGE_MARKERS.iter().any(|m| msg.contains(m)) {
            return Self::Blocked;
        }

        if msg.contains("timeout") || msg.contains("timed out") {
            return Self::Timeout;
        }

        if msg.contains("net::err")
            || msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("dns")
            || msg.contains("unreachable")
            || msg.contains("eof")
        {
            return Self::Connection;
        }

        if msg.contains("browser")
            || msg.contains("chrome")
            || msg.contains("cdp")
            || msg.contains("target")
            || msg.contains("session")
        {
            return Self::Browser;
        }

        Self::Other
    }

    /// Whether the retry loop should try again
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection | Self::Blocked)
    }
}

/// A link as it appeared on the page, already resolved to an absolute URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundLink {
    pub href: String,
    #[serde(default)]
    pub text: String,
}

/// Outcome of a single fetch
///
/// Produced once by a fetcher and consumed by discovery or validation. It is
/// never modified after it is returned, except by the retry loop marking a
/// final failure as blocked.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub ok: bool,
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    pub status_code: u16,
    /// Media type without parameters, lowercased
    pub content_type: String,
    pub raw_bytes: Vec<u8>,
    pub title: String,
    pub extracted_text: String,
    pub outbound_links: Vec<OutboundLink>,
    pub error_kind: Option<FetchErrorKind>,
    pub error: String,
    pub elapsed: Duration,
}

impl FetchResult {
    /// A failed fetch carrying only its error
    #[must_use]
    pub fn failure(
        url: &str,
        kind: FetchErrorKind,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            ok: false,
            url: url.to_string(),
            final_url: url.to_string(),
            error_kind: Some(kind),
            error: error.into(),
            elapsed,
            ..Self::default()
        }
    }

    /// Raw body decoded as text (lossy)
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_bytes)
    }

    #[must_use]
    pub fn is_html(&self) -> bool {
        if self.content_type.is_empty() {
            return self
                .raw_bytes
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                .is_some_and(|b| *b == b'<');
        }
        self.content_type.contains("html")
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.error_kind == Some(FetchErrorKind::Blocked)
    }

    /// Page to resolve relative links against
    #[must_use]
    pub fn base_url(&self) -> &str {
        if self.final_url.is_empty() {
            &self.url
        } else {
            &self.final_url
        }
    }
}

/// Tunables shared by both fetch modes
#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    pub timeout: Duration,
    /// Fixed wait after navigation before the DOM is read (rendering mode)
    pub settle: Duration,
    pub scroll_passes: u32,
    pub headless: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::utils::DEFAULT_FETCH_TIMEOUT_MS),
            settle: Duration::from_millis(crate::utils::DEFAULT_SETTLE_MS),
            scroll_passes: crate::utils::DEFAULT_SCROLL_PASSES,
            headless: true,
        }
    }
}

/// A per-seed fetch session
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one URL. Never fails; failures are described in the result.
    async fn fetch(&self, url: &str) -> FetchResult;

    /// Tear the session down and release its resources
    async fn close(&self) {}
}

/// Opens isolated fetch sessions, one per seed
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Open a session for the seed with the given identity
    async fn open(&self, site_identity: &str) -> anyhow::Result<Box<dyn Fetcher>>;
}
