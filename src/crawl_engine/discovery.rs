//! Budget-bounded breadth-first discovery for one seed
//!
//! The crawler walks a single institution's site from its entry points and
//! reports links worth validating. Two decisions are made for every extracted
//! link, independently of each other:
//!
//! - is it a *candidate*: does it look like what the profile is after?
//! - is it a *continuation*: same site, a page, not rejected, not yet seen?
//!
//! A link can be both. Traversal is FIFO; the priority function only orders
//! the continuations found on one page before they join the queue.

use log::{debug, info, trace};
use std::cmp::Reverse;
use std::collections::{HashSet, VecDeque};

use super::crawl_types::{CandidateLink, CrawlQueue, CrawlState, DiscoveryReport, LinkKind};
use super::link_extractor::{extract_links_and_assets, extract_menu_links};
use super::scorer::{hard_reject, is_entry_point, is_reportable, score_link, traversal_priority};
use crate::config::{DiscoveryProfile, EntryStrategy};
use crate::fetcher::{FetchResult, Fetcher, RetryPolicy, fetch_with_retry};
use crate::utils::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_ENTRY_POINTS, DEFAULT_MAX_PAGES, HINT_DEDUP_PREFIX,
    MAX_CONTEXT_HINT, normalize_url, safe_truncate_chars, same_site,
};

/// Work bounds for one seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryLimits {
    /// Distinct URLs fetched, origin included
    pub max_pages: usize,
    /// Deepest BFS level visited; entry points sit at depth 0
    pub max_depth: u8,
    /// Entry points taken from the navigation menu
    pub max_entry_points: usize,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            max_entry_points: DEFAULT_MAX_ENTRY_POINTS,
        }
    }
}

/// Drop candidates repeating an earlier (url, kind, hint prefix)
///
/// Two links to the same URL survive when their hints differ within the first
/// [`HINT_DEDUP_PREFIX`] characters; first occurrence wins otherwise.
#[must_use]
pub fn dedup_candidates(candidates: Vec<CandidateLink>) -> Vec<CandidateLink> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            let prefix = safe_truncate_chars(&c.context_hint, HINT_DEDUP_PREFIX).to_string();
            seen.insert((c.url.clone(), c.kind, prefix))
        })
        .collect()
}

/// Discovery crawler parameterized by a keyword profile
#[derive(Debug, Clone)]
pub struct DiscoveryCrawler {
    profile: DiscoveryProfile,
    limits: DiscoveryLimits,
    retry: RetryPolicy,
}

/// Mutable bookkeeping of one `discover` call
struct Frontier {
    queue: VecDeque<CrawlQueue>,
    enqueued: HashSet<String>,
    visited: HashSet<String>,
    candidates: Vec<CandidateLink>,
    blocked: bool,
}

impl Frontier {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            enqueued: HashSet::new(),
            visited: HashSet::new(),
            candidates: Vec::new(),
            blocked: false,
        }
    }

    fn enqueue(&mut self, url: String, depth: u8) {
        if !self.visited.contains(&url) && self.enqueued.insert(url.clone()) {
            self.queue.push_back(CrawlQueue { url, depth });
        }
    }
}

impl DiscoveryCrawler {
    #[must_use]
    pub fn new(profile: DiscoveryProfile, limits: DiscoveryLimits, retry: RetryPolicy) -> Self {
        Self {
            profile,
            limits,
            retry,
        }
    }

    #[must_use]
    pub fn profile(&self) -> &DiscoveryProfile {
        &self.profile
    }

    #[must_use]
    pub fn limits(&self) -> DiscoveryLimits {
        self.limits
    }

    /// Explore one seed and report its deduplicated candidates
    ///
    /// Never fails: an unreachable origin or a site without entry points
    /// yields an exhausted report with no candidates.
    pub async fn discover(
        &self,
        site_identity: &str,
        origin: &str,
        fetcher: &dyn Fetcher,
    ) -> DiscoveryReport {
        let origin = normalize_url(origin);
        let mut state = CrawlState::Seeded;
        let mut frontier = Frontier::new();

        let mut report = DiscoveryReport {
            site_identity: site_identity.to_string(),
            origin: origin.clone(),
            state,
            entry_points: Vec::new(),
            candidates: Vec::new(),
            pages_visited: 0,
            blocked: false,
            origin_failed: false,
        };

        if self.limits.max_pages == 0 || origin.is_empty() {
            report.state = CrawlState::Exhausted;
            return report;
        }

        frontier.visited.insert(origin.clone());
        let origin_page = fetch_with_retry(fetcher, &origin, &self.retry).await;
        frontier.blocked |= origin_page.is_blocked();

        if !origin_page.ok {
            info!(
                target: "campusscrape::crawl",
                "{site_identity}: origin {origin} unreachable ({})",
                origin_page.error
            );
            report.origin_failed = true;
            report.blocked = frontier.blocked;
            report.pages_visited = frontier.visited.len();
            report.state = CrawlState::Exhausted;
            return report;
        }

        let entry_points = self.entry_points(&origin, &origin_page);
        if entry_points.is_empty() {
            info!(
                target: "campusscrape::crawl",
                "{site_identity}: no entry point found on {origin}"
            );
            report.pages_visited = frontier.visited.len();
            report.state = CrawlState::Exhausted;
            return report;
        }

        if self.profile.entry == EntryStrategy::Seed {
            frontier.candidates.push(self.origin_candidate(site_identity, &origin, &origin_page));
        }

        for url in &entry_points {
            if frontier.enqueued.insert(url.clone()) {
                frontier.queue.push_back(CrawlQueue {
                    url: url.clone(),
                    depth: 0,
                });
            }
        }
        report.entry_points = entry_points;

        state = CrawlState::Expanding;
        debug!(
            target: "campusscrape::crawl",
            "{site_identity}: {state:?} from {} entry point(s)",
            report.entry_points.len()
        );

        // The origin may reappear as an entry point; its page is already in hand.
        let mut cached_origin = Some(origin_page);

        while let Some(item) = frontier.queue.pop_front() {
            if item.depth > self.limits.max_depth
                || !same_site(&origin, &item.url)
                || hard_reject(&item.url, &self.profile)
            {
                continue;
            }

            let page = if item.url == origin {
                match cached_origin.take() {
                    Some(page) => page,
                    None => continue,
                }
            } else {
                if frontier.visited.contains(&item.url) {
                    continue;
                }
                if frontier.visited.len() >= self.limits.max_pages {
                    debug!(
                        target: "campusscrape::crawl",
                        "{site_identity}: page budget of {} reached",
                        self.limits.max_pages
                    );
                    break;
                }
                frontier.visited.insert(item.url.clone());
                fetch_with_retry(fetcher, &item.url, &self.retry).await
            };

            frontier.blocked |= page.is_blocked();
            self.expand(site_identity, &origin, &item, &page, &mut frontier);
        }

        state = CrawlState::Exhausted;
        report.candidates = dedup_candidates(frontier.candidates);
        report.pages_visited = frontier.visited.len();
        report.blocked = frontier.blocked;
        report.state = state;

        info!(
            target: "campusscrape::crawl",
            "{site_identity}: {} candidate(s) from {} page(s){}",
            report.candidates.len(),
            report.pages_visited,
            if report.blocked { " (blocked pages seen)" } else { "" }
        );
        report
    }

    /// Roots of the BFS for this profile
    fn entry_points(&self, origin: &str, origin_page: &FetchResult) -> Vec<String> {
        match self.profile.entry {
            EntryStrategy::Seed => vec![origin.to_string()],
            EntryStrategy::NavigationMenu => {
                if !origin_page.is_html() {
                    return Vec::new();
                }
                let html = origin_page.body_text();
                extract_menu_links(origin_page.base_url(), &html, &self.profile)
                    .into_iter()
                    .filter(|url| {
                        same_site(origin, url)
                            && is_entry_point(url, &self.profile)
                            && !hard_reject(url, &self.profile)
                    })
                    .take(self.limits.max_entry_points)
                    .collect()
            }
        }
    }

    fn origin_candidate(
        &self,
        site_identity: &str,
        origin: &str,
        origin_page: &FetchResult,
    ) -> CandidateLink {
        let hint = format!("{} {origin}", origin_page.title.trim()).trim().to_string();
        CandidateLink {
            site_identity: site_identity.to_string(),
            url: origin.to_string(),
            kind: LinkKind::Page,
            source_page: origin.to_string(),
            relevance_score: score_link(&self.profile, &hint, LinkKind::Page),
            context_hint: safe_truncate_chars(&hint, MAX_CONTEXT_HINT).to_string(),
        }
    }

    /// Record candidates found on `page` and queue its continuations
    fn expand(
        &self,
        site_identity: &str,
        origin: &str,
        item: &CrawlQueue,
        page: &FetchResult,
        frontier: &mut Frontier,
    ) {
        if !page.ok || !page.is_html() {
            trace!(
                target: "campusscrape::crawl",
                "{site_identity}: nothing to expand at {} ({})",
                item.url,
                page.error
            );
            return;
        }

        let source = page.base_url().to_string();
        let html = page.body_text();
        let links = extract_links_and_assets(&source, &html, &self.profile);

        let next_depth = item.depth.saturating_add(1);
        let mut continuations = Vec::new();

        for link in links {
            // Off-site links are neither candidates nor continuations
            if !same_site(origin, &link.url) || hard_reject(&link.url, &self.profile) {
                continue;
            }

            if is_reportable(&link.url, &link.hint, link.score, &self.profile) {
                frontier.candidates.push(CandidateLink {
                    site_identity: site_identity.to_string(),
                    url: link.url.clone(),
                    kind: link.kind,
                    source_page: source.clone(),
                    context_hint: safe_truncate_chars(&link.hint, MAX_CONTEXT_HINT).to_string(),
                    relevance_score: link.score,
                });
            }

            if link.kind == LinkKind::Page
                && next_depth <= self.limits.max_depth
                && !frontier.visited.contains(&link.url)
            {
                continuations.push(link.url);
            }
        }

        continuations.sort_by_key(|url| Reverse(traversal_priority(url, &self.profile)));
        for url in continuations {
            frontier.enqueue(url, next_depth);
        }
    }
}
