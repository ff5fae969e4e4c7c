//! Rendering fetch mode
//!
//! Navigates a fresh tab, waits a fixed settle delay, scrolls a few times to
//! trigger lazy content, then reads the rendered text and anchors. Documents
//! and images are fetched over plain HTTP from the same session, since the
//! bytes are what matter for them.

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::cleanup::{CleanupResult, cleanup_browser_session};
use super::html::{challenge_marker, contact_link};
use super::js_scripts::{SNAPSHOT_SCRIPT, scroll_step_script};
use super::page_timeout::with_page_timeout;
use super::{
    FetchBackend, FetchErrorKind, FetchResult, FetchSettings, Fetcher, HttpFetcher, OutboundLink,
};
use crate::browser_setup::launch_browser;
use crate::crawl_engine::LinkKind;
use crate::utils::{
    MAX_TEXT_PER_PAGE, SCROLL_PAUSE_MS, SCROLL_STEP_PX, resolve_url, safe_truncate_chars,
};

/// What the snapshot script returns
#[derive(Debug, Deserialize)]
struct PageSnapshot {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content_type: String,
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    text: String,
    #[serde(default)]
    links: Vec<OutboundLink>,
}

fn default_status() -> u16 {
    200
}

/// Chromium-backed fetcher owning one browser process for one seed
pub struct BrowserFetcher {
    session: Mutex<Option<(Browser, JoinHandle<()>)>>,
    user_data_dir: PathBuf,
    settings: FetchSettings,
    http: HttpFetcher,
}

impl BrowserFetcher {
    /// Launch a browser bound to its own profile directory
    pub async fn launch(settings: FetchSettings, user_data_dir: PathBuf) -> Result<Self> {
        let (browser, handler) =
            launch_browser(settings.headless, &user_data_dir, settings.timeout).await?;
        Ok(Self {
            session: Mutex::new(Some((browser, handler))),
            user_data_dir,
            settings,
            http: HttpFetcher::new(&settings)?,
        })
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<(PageSnapshot, String)> {
        let page = with_page_timeout(
            async { Ok::<_, anyhow::Error>(browser.new_page("about:blank").await?) },
            self.settings.timeout,
            "open tab",
        )
        .await?;

        let outcome = self.navigate_and_read(&page, url).await;

        if let Err(e) = page.close().await {
            debug!(target: "campusscrape::fetch", "Failed to close tab for {url}: {e}");
        }
        outcome
    }

    async fn navigate_and_read(&self, page: &Page, url: &str) -> Result<(PageSnapshot, String)> {
        let timeout = self.settings.timeout;

        with_page_timeout(
            async {
                page.goto(url).await?;
                Ok::<_, anyhow::Error>(())
            },
            timeout,
            "navigation",
        )
        .await?;

        tokio::time::sleep(self.settings.settle).await;

        let scroll = scroll_step_script(SCROLL_STEP_PX);
        for _ in 0..self.settings.scroll_passes {
            let at_bottom = match page.evaluate(scroll.as_str()).await {
                Ok(value) => value.into_value::<bool>().unwrap_or(true),
                Err(_) => true,
            };
            tokio::time::sleep(Duration::from_millis(SCROLL_PAUSE_MS)).await;
            if at_bottom {
                break;
            }
        }

        let snapshot = with_page_timeout(
            async {
                let value = page.evaluate(SNAPSHOT_SCRIPT).await?;
                Ok::<_, anyhow::Error>(value.into_value::<PageSnapshot>()?)
            },
            timeout,
            "snapshot",
        )
        .await?;

        let html = with_page_timeout(
            async { Ok::<_, anyhow::Error>(page.content().await?) },
            timeout,
            "read content",
        )
        .await?;

        Ok((snapshot, html))
    }

    fn into_result(url: &str, snapshot: PageSnapshot, html: String, started: Instant) -> FetchResult {
        let final_url = if snapshot.url.is_empty() || snapshot.url == "about:blank" {
            url.to_string()
        } else {
            snapshot.url
        };

        let mut seen = HashSet::new();
        let outbound_links = snapshot
            .links
            .into_iter()
            .filter_map(|link| {
                let href =
                    resolve_url(&final_url, &link.href).or_else(|| contact_link(&link.href))?;
                seen.insert(href.clone()).then_some(OutboundLink {
                    href,
                    text: link.text,
                })
            })
            .collect();

        let text = safe_truncate_chars(snapshot.text.trim(), MAX_TEXT_PER_PAGE).to_string();
        let ok = snapshot.status < 400;

        let mut result = FetchResult {
            ok,
            url: url.to_string(),
            final_url,
            status_code: snapshot.status,
            content_type: snapshot.content_type.to_lowercase(),
            raw_bytes: html.into_bytes(),
            title: snapshot.title,
            extracted_text: text,
            outbound_links,
            error_kind: (!ok).then_some(FetchErrorKind::HttpStatus),
            error: if ok {
                String::new()
            } else {
                format!("HTTP {}", snapshot.status)
            },
            elapsed: started.elapsed(),
        };

        if let Some(marker) = challenge_marker(&result.title, &result.extracted_text) {
            result.ok = false;
            result.error_kind = Some(FetchErrorKind::Blocked);
            result.error = format!("blocked: challenge page ({marker})");
        }

        result
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        if LinkKind::from_url(url) != LinkKind::Page {
            return self.http.fetch(url).await;
        }

        let started = Instant::now();
        let guard = self.session.lock().await;
        let Some((browser, _)) = guard.as_ref() else {
            return FetchResult::failure(
                url,
                FetchErrorKind::Browser,
                "browser session already closed",
                started.elapsed(),
            );
        };

        match self.render(browser, url).await {
            Ok((snapshot, html)) => {
                let result = Self::into_result(url, snapshot, html, started);
                debug!(
                    target: "campusscrape::fetch",
                    "rendered {url} -> {} ({} chars, {:?})",
                    result.status_code,
                    result.extracted_text.len(),
                    result.elapsed
                );
                result
            }
            Err(e) => FetchResult::failure(
                url,
                FetchErrorKind::classify(&e),
                format!("{e:#}"),
                started.elapsed(),
            ),
        }
    }

    async fn close(&self) {
        let Some((browser, handler)) = self.session.lock().await.take() else {
            return;
        };
        match cleanup_browser_session(browser, handler, &self.user_data_dir).await {
            CleanupResult::Success => {
                debug!(target: "campusscrape::fetch", "Browser session closed");
            }
            CleanupResult::PartialFailure(errors) => {
                info!(
                    target: "campusscrape::fetch",
                    "Browser session closed with {} cleanup issue(s)",
                    errors.len()
                );
            }
        }
    }
}

/// Launches one browser per seed under `profile_root`
#[derive(Debug, Clone)]
pub struct BrowserBackend {
    settings: FetchSettings,
    profile_root: PathBuf,
}

impl BrowserBackend {
    #[must_use]
    pub fn new(settings: FetchSettings, profile_root: PathBuf) -> Self {
        Self {
            settings,
            profile_root,
        }
    }
}

#[async_trait]
impl FetchBackend for BrowserBackend {
    async fn open(&self, site_identity: &str) -> Result<Box<dyn Fetcher>> {
        let dir = self
            .profile_root
            .join(format!("seed-{}", uuid::Uuid::new_v4().simple()));
        debug!(
            target: "campusscrape::fetch",
            "Opening browser session for {site_identity} in {}",
            dir.display()
        );
        let fetcher = BrowserFetcher::launch(self.settings, dir).await?;
        Ok(Box::new(fetcher))
    }
}
