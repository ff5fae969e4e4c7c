//! Builder methods available for all states
//!
//! This module contains the optional setters that can be called on the
//! builder regardless of its current type state.

use std::path::PathBuf;

use super::builder::RunConfigBuilder;
use super::types::{Goal, UnparseableDatePolicy};

impl<State> RunConfigBuilder<State> {
    /// Template whose header row defines the output columns and their order
    #[must_use]
    pub fn template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    #[must_use]
    pub fn goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    /// Page budget per seed. The origin fetch counts against it.
    #[must_use]
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: u8) -> Self {
        self.max_depth = depth;
        self
    }

    /// Entry points taken from the navigation menu (default: 3)
    #[must_use]
    pub fn max_entry_points(mut self, entries: usize) -> Self {
        self.max_entry_points = entries;
        self
    }

    #[must_use]
    pub fn max_bundle_pages(mut self, pages: usize) -> Self {
        self.max_bundle_pages = pages;
        self
    }

    /// Minimum relevance score for a link to be reported as a candidate
    ///
    /// Without it each profile uses its own default.
    #[must_use]
    pub fn min_score(mut self, score: f64) -> Self {
        self.min_score = Some(score);
        self
    }

    #[must_use]
    pub fn fetch_timeout_ms(mut self, ms: u64) -> Self {
        self.fetch_timeout_ms = ms;
        self
    }

    /// Fixed wait after navigation before the rendered DOM is read
    #[must_use]
    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    #[must_use]
    pub fn scroll_passes(mut self, passes: u32) -> Self {
        self.scroll_passes = passes;
        self
    }

    /// Fetch attempts for transient failures (timeout, reset, blocked)
    #[must_use]
    pub fn fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts;
        self
    }

    /// Base retry sleep; attempt `n` sleeps `n` times this
    #[must_use]
    pub fn retry_base_ms(mut self, ms: u64) -> Self {
        self.retry_base_ms = ms;
        self
    }

    /// Seeds processed concurrently (default: 2)
    #[must_use]
    pub fn concurrency(mut self, seeds: usize) -> Self {
        self.concurrency = seeds;
        self
    }

    /// Use Chromium rendering (default) or plain HTTP fetching
    #[must_use]
    pub fn render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Set browser headless mode
    ///
    /// **Headless mode is enforced in release builds.** Headed mode is only
    /// honoured in debug builds, for watching a crawl while developing.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    #[must_use]
    pub fn unparseable_dates(mut self, policy: UnparseableDatePolicy) -> Self {
        self.unparseable_dates = policy;
        self
    }
}
