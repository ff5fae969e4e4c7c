//! Per-seed page memo
//!
//! Discovery fetches a page to read its links; validation and bundling then
//! need the same page's text. [`MemoFetcher`] keeps every successful result
//! of a seed session keyed by normalized URL, so each page is fetched once
//! per seed. Failures are not kept and are fetched again on request.

use async_trait::async_trait;
use log::trace;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{FetchResult, Fetcher};
use crate::utils::normalize_url;

pub struct MemoFetcher<'a> {
    inner: &'a dyn Fetcher,
    pages: Mutex<HashMap<String, FetchResult>>,
}

impl<'a> MemoFetcher<'a> {
    #[must_use]
    pub fn new(inner: &'a dyn Fetcher) -> Self {
        Self {
            inner,
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Number of pages held
    pub async fn len(&self) -> usize {
        self.pages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pages.lock().await.is_empty()
    }
}

#[async_trait]
impl Fetcher for MemoFetcher<'_> {
    async fn fetch(&self, url: &str) -> FetchResult {
        let key = normalize_url(url);
        if let Some(hit) = self.pages.lock().await.get(&key) {
            trace!(target: "campusscrape::fetch", "memo hit {key}");
            return hit.clone();
        }

        let result = self.inner.fetch(url).await;
        if result.ok {
            self.pages.lock().await.insert(key, result.clone());
        }
        result
    }

    async fn close(&self) {
        self.pages.lock().await.clear();
    }
}
