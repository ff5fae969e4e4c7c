//! Crawl Engine Module
//!
//! Discovery for one seed: link and asset extraction, candidate scoring and
//! the budget-bounded breadth-first crawler that ties them together.

pub mod crawl_types;
pub mod discovery;
pub mod link_extractor;
pub mod scorer;

pub use crawl_types::{
    CandidateLink, CrawlQueue, CrawlState, DiscoveryReport, ExtractedLink, LinkKind,
};
pub use discovery::{DiscoveryCrawler, DiscoveryLimits, dedup_candidates};
pub use link_extractor::{extract_links_and_assets, extract_menu_links};
pub use scorer::{
    hard_reject, is_entry_point, is_reportable, keyword_hit, score_hint, score_link,
    traversal_priority,
};
