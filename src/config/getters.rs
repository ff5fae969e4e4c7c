//! Getter methods for `RunConfig`
//!
//! Plain accessors plus the small value types the crawler, the fetch layer
//! and the retry loop are configured with.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::profile::DiscoveryProfile;
use super::types::{Goal, RunConfig, UnparseableDatePolicy};
use crate::crawl_engine::DiscoveryLimits;
use crate::fetcher::{FetchSettings, RetryPolicy};
use crate::utils::{BLOCKED_BACKOFF_MULTIPLIER, BLOCKED_MIN_TEXT_LEN};

impl RunConfig {
    #[must_use]
    pub fn seed_input(&self) -> &Path {
        &self.seed_input
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    #[must_use]
    pub fn goal(&self) -> Goal {
        self.goal
    }

    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    #[must_use]
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    #[must_use]
    pub fn max_entry_points(&self) -> usize {
        self.max_entry_points
    }

    #[must_use]
    pub fn max_bundle_pages(&self) -> usize {
        self.max_bundle_pages
    }

    #[must_use]
    pub fn min_score(&self) -> Option<f64> {
        self.min_score
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn render(&self) -> bool {
        self.render
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn validate_only(&self) -> bool {
        self.validate_only
    }

    #[must_use]
    pub fn unparseable_dates(&self) -> UnparseableDatePolicy {
        self.unparseable_dates
    }

    /// Directory holding the checkpoint file
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.output_dir.join("state")
    }

    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir().join("checkpoint.json")
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.fetch_attempts,
            base_sleep: Duration::from_millis(self.retry_base_ms),
            blocked_backoff_multiplier: BLOCKED_BACKOFF_MULTIPLIER,
            min_text_len: BLOCKED_MIN_TEXT_LEN,
        }
    }

    #[must_use]
    pub fn discovery_limits(&self) -> DiscoveryLimits {
        DiscoveryLimits {
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            max_entry_points: self.max_entry_points,
        }
    }

    #[must_use]
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: self.fetch_timeout(),
            settle: self.settle(),
            scroll_passes: self.scroll_passes,
            headless: self.headless,
        }
    }

    /// Apply the configured minimum score, if any, to a profile
    #[must_use]
    pub fn tune_profile(&self, profile: DiscoveryProfile) -> DiscoveryProfile {
        match self.min_score {
            Some(score) => profile.with_min_score(score),
            None => profile,
        }
    }
}
