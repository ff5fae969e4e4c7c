//! Shared configuration constants for campusscrape
//!
//! Default values used by the config builder, the crawler and the run
//! orchestrator. Everything here can be overridden through `RunConfig`.

/// Default number of seeds processed concurrently
///
/// Each in-flight seed owns its own browser process, so this is also the
/// upper bound on concurrently running Chromium instances.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Default page budget per seed (origin fetch included)
pub const DEFAULT_MAX_PAGES: usize = 80;

/// Default maximum crawl depth below an entry point
pub const DEFAULT_MAX_DEPTH: u8 = 3;

/// Maximum number of entry points taken from the navigation menu
pub const DEFAULT_MAX_ENTRY_POINTS: usize = 3;

/// Per-fetch timeout in milliseconds
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 25_000;

/// Fixed settle wait after navigation, before reading the rendered DOM
pub const DEFAULT_SETTLE_MS: u64 = 1_200;

/// Scroll passes performed to trigger lazy-loaded content
pub const DEFAULT_SCROLL_PASSES: u32 = 4;

/// Pixels scrolled per pass
pub const SCROLL_STEP_PX: u32 = 1_600;

/// Pause between scroll passes
pub const SCROLL_PAUSE_MS: u64 = 350;

/// Fetch attempts before a transient failure is returned as final
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 2;

/// Base retry sleep; attempt `n` sleeps `n * base`
pub const DEFAULT_RETRY_BASE_MS: u64 = 3_000;

/// Extra multiplier applied to the retry sleep when a fetch looks blocked
pub const BLOCKED_BACKOFF_MULTIPLIER: f64 = 2.0;

/// A failed fetch with less extracted text than this is treated as blocked
pub const BLOCKED_MIN_TEXT_LEN: usize = 80;

/// Cap on extracted text kept per page
pub const MAX_TEXT_PER_PAGE: usize = 20_000;

/// Cap on the combined text bundle sent for contact/narrative extraction
pub const MAX_COMBINED_TEXT: usize = 80_000;

/// Text sent to the oracle for candidate validation
pub const MAX_VALIDATION_TEXT: usize = 12_000;

/// Text sent to the oracle for schedule extraction
pub const MAX_EXTRACTION_TEXT: usize = 16_000;

/// Pages bundled for contact/narrative extraction (seed page included)
pub const DEFAULT_MAX_BUNDLE_PAGES: usize = 10;

/// Bundles shorter than this fall back to the oracle's browse mode
pub const CONTACT_BROWSE_THRESHOLD: usize = 900;

/// Narrative bundles shorter than this fall back to browse mode
pub const NARRATIVE_BROWSE_THRESHOLD: usize = 1_200;

/// Anchor text kept per extracted link
pub const MAX_ANCHOR_TEXT: usize = 200;

/// Context hint kept per reported candidate
pub const MAX_CONTEXT_HINT: usize = 300;

/// Prefix of the context hint used as part of the candidate dedup key
pub const HINT_DEDUP_PREFIX: usize = 80;

/// Verdict fields returned by the oracle are truncated to this length
pub const MAX_VERDICT_FIELD: usize = 200;

/// Sentinel emitted for fields with no supporting evidence
pub const NO_EVIDENCE: &str = "-";

/// Default primary oracle model
pub const DEFAULT_ORACLE_MODEL: &str = "gemini-2.5-flash";

/// Models tried in order after the primary model is exhausted
pub const DEFAULT_FALLBACK_MODELS: [&str; 3] =
    ["gemini-2.0-flash-lite", "gemini-1.5-flash", "gemini-1.5-pro"];

/// Generative Language API endpoint
pub const DEFAULT_ORACLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Attempts per oracle model before falling back to the next one
pub const DEFAULT_ORACLE_MAX_RETRIES: u32 = 7;

/// Backoff cap for rate-limited / unavailable responses (429, 503)
pub const ORACLE_MAX_SLEEP_OVERLOADED_SECS: f64 = 60.0;

/// Backoff cap for every other retryable oracle failure
pub const ORACLE_MAX_SLEEP_SECS: f64 = 30.0;

/// Upper bound of the uniform jitter added to every oracle backoff
pub const ORACLE_JITTER_SECS: f64 = 1.5;

/// Chrome user agent string for stealth mode
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
