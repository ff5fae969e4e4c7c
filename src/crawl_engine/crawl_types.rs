//! Core types for discovery crawling.
//!
//! This module contains the link and candidate records produced while a seed
//! is explored, the queue item and the crawler state machine.

use serde::{Deserialize, Serialize};

/// What a discovered URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Page,
    Document,
    Image,
}

const DOCUMENT_EXTENSIONS: [&str; 7] = [".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx"];
const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".webp", ".gif"];

impl LinkKind {
    /// Classify by the extension of the URL path
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| {
                url.split(['?', '#'])
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase()
            });

        if DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            Self::Document
        } else if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            Self::Image
        } else {
            Self::Page
        }
    }

    /// Media type to declare when the bytes go to the oracle
    #[must_use]
    pub fn default_mime(&self, url: &str) -> &'static str {
        match self {
            Self::Page => "text/html",
            Self::Document => {
                let lower = url.to_ascii_lowercase();
                if lower.contains(".doc") {
                    "application/msword"
                } else {
                    "application/pdf"
                }
            }
            Self::Image => {
                let lower = url.to_ascii_lowercase();
                if lower.contains(".png") {
                    "image/png"
                } else if lower.contains(".webp") {
                    "image/webp"
                } else if lower.contains(".gif") {
                    "image/gif"
                } else {
                    "image/jpeg"
                }
            }
        }
    }
}

/// One link or asset found on a page, before candidacy is decided
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLink {
    /// Normalized absolute URL
    pub url: String,
    pub kind: LinkKind,
    /// Visible text plus the raw attribute it came from
    pub hint: String,
    pub score: f64,
}

/// A page or asset worth validating for a seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub site_identity: String,
    pub url: String,
    pub kind: LinkKind,
    pub source_page: String,
    pub context_hint: String,
    pub relevance_score: f64,
}

/// Represents an item in the crawl queue with URL and depth tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlQueue {
    pub url: String,
    pub depth: u8,
}

/// Lifecycle of one seed's discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlState {
    /// Origin known, entry points not yet read
    Seeded,
    /// Queue being drained
    Expanding,
    /// Queue empty or page budget spent
    Exhausted,
}

/// What discovery found for one seed
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryReport {
    pub site_identity: String,
    pub origin: String,
    pub state: CrawlState,
    /// Entry points the crawl started from
    pub entry_points: Vec<String>,
    /// Deduplicated candidates in discovery order
    pub candidates: Vec<CandidateLink>,
    /// Distinct normalized URLs fetched, origin included
    pub pages_visited: usize,
    /// Some fetch stayed blocked after retries
    pub blocked: bool,
    /// The origin itself could not be fetched
    pub origin_failed: bool,
}
