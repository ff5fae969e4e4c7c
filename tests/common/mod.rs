//! Test utilities shared by the campusscrape integration tests
//!
//! A site is a map of normalized URL to HTML; [`SiteBackend`] serves it
//! through the same `Fetcher` interface the real fetchers implement, and
//! [`ScriptedOracle`] answers prompts from a fixed list of rules.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use kodegen_tools_campusscrape::fetcher::html::{anchor_links, html_to_text, page_title};
use kodegen_tools_campusscrape::fetcher::{FetchBackend, FetchErrorKind, FetchResult, Fetcher};
use kodegen_tools_campusscrape::oracle::{Oracle, OracleError, OracleReply, TokenUsage};
use kodegen_tools_campusscrape::utils::{MAX_TEXT_PER_PAGE, normalize_url};

/// Creates a temporary directory for test output
#[allow(dead_code)]
pub fn create_test_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test HTML document with specified content
#[allow(dead_code)]
pub fn create_test_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="id">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body>
    {body}
</body>
</html>"#
    )
}

/// Successful HTML fetch of `url`, parsed the way the HTTP fetcher does it
#[allow(dead_code)]
pub fn html_page(url: &str, html: &str) -> FetchResult {
    FetchResult {
        ok: true,
        url: url.to_string(),
        final_url: url.to_string(),
        status_code: 200,
        content_type: "text/html".to_string(),
        raw_bytes: html.as_bytes().to_vec(),
        title: page_title(html),
        extracted_text: html_to_text(html, MAX_TEXT_PER_PAGE),
        outbound_links: anchor_links(url, html),
        ..FetchResult::default()
    }
}

/// Anti-bot wall in front of `url`
#[allow(dead_code)]
pub fn challenge_page(url: &str) -> FetchResult {
    FetchResult::failure(
        url,
        FetchErrorKind::Blocked,
        "blocked: challenge page (just a moment)",
        Duration::ZERO,
    )
}

/// Pages served by the fake backend, keyed by normalized URL
#[derive(Debug, Clone, Default)]
pub struct Site {
    pages: HashMap<String, FetchResult>,
}

#[allow(dead_code)]
impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        let html = create_test_html("Kampus", body);
        self.pages.insert(normalize_url(url), html_page(&normalize_url(url), &html));
        self
    }

    pub fn result(mut self, url: &str, result: FetchResult) -> Self {
        self.pages.insert(normalize_url(url), result);
        self
    }
}

/// Session over a [`Site`]; unknown URLs answer 404
pub struct SiteFetcher {
    site: Arc<Site>,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Fetcher for SiteFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let key = normalize_url(url);
        if let Ok(mut log) = self.log.lock() {
            log.push(key.clone());
        }
        match self.site.pages.get(&key) {
            Some(result) => result.clone(),
            None => FetchResult {
                status_code: 404,
                ..FetchResult::failure(url, FetchErrorKind::HttpStatus, "HTTP 404", Duration::ZERO)
            },
        }
    }
}

/// Opens [`SiteFetcher`] sessions and records every fetched URL
#[derive(Clone)]
pub struct SiteBackend {
    site: Arc<Site>,
    log: Arc<Mutex<Vec<String>>>,
    opened: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl SiteBackend {
    pub fn new(site: Site) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Session without going through `open`
    pub fn session(&self) -> SiteFetcher {
        SiteFetcher {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchBackend for SiteBackend {
    async fn open(&self, _site_identity: &str) -> anyhow::Result<Box<dyn Fetcher>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.session()))
    }
}

/// What a rule answers with
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Answer {
    Text(String),
    RateLimited,
    Server,
}

/// Oracle answering by the first rule whose needle occurs in the prompt
#[derive(Default)]
pub struct ScriptedOracle {
    rules: Vec<(String, Answer)>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, needle: &str, text: impl Into<String>) -> Self {
        self.rules.push((needle.to_string(), Answer::Text(text.into())));
        self
    }

    pub fn fail(mut self, needle: &str, answer: Answer) -> Self {
        self.rules.push((needle.to_string(), answer));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn reply(&self, prompt: &str) -> Result<OracleReply, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let answer = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| Answer::Text("{}".to_string()));

        match answer {
            Answer::Text(text) => Ok(OracleReply {
                text,
                usage: TokenUsage {
                    prompt_tokens: 10,
                    candidates_tokens: 5,
                    total_tokens: 15,
                },
                model: "scripted".to_string(),
            }),
            Answer::RateLimited => Err(OracleError::RateLimited("HTTP 429: quota".to_string())),
            Answer::Server => Err(OracleError::Server("HTTP 500: boom".to_string())),
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, prompt: &str, _schema: Option<&Value>) -> Result<OracleReply, OracleError> {
        self.reply(prompt)
    }

    async fn generate_with_bytes(
        &self,
        prompt: &str,
        _mime: &str,
        _bytes: &[u8],
    ) -> Result<OracleReply, OracleError> {
        self.reply(prompt)
    }
}

/// Write `contents` to `name` inside `dir`
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}
