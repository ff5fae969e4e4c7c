pub mod browser_setup;
pub mod config;
pub mod crawl_engine;
pub mod evidence;
pub mod fetcher;
pub mod oracle;
pub mod pipeline;
pub mod utils;

pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use config::{DiscoveryProfile, EntryStrategy, Goal, OracleConfig, RunConfig, UnparseableDatePolicy};
pub use crawl_engine::{
    CandidateLink, CrawlQueue, CrawlState, DiscoveryCrawler, DiscoveryLimits, DiscoveryReport,
    LinkKind,
};
pub use evidence::{AcceptedFields, EvidenceGate, EvidenceRecord, FieldSchema, Provenance};
pub use fetcher::{
    BrowserBackend, FetchBackend, FetchErrorKind, FetchResult, Fetcher, HttpBackend, RetryPolicy,
};
pub use oracle::{GeminiOracle, Oracle, OracleError, OracleReply, TokenUsage};
pub use pipeline::{Pipeline, PipelineError, RunSummary, SeedError, run_pipeline};
