//! Type-safe builder for `RunConfig` using the typestate pattern
//!
//! The seed input and the output directory are required; the builder only
//! exposes `build()` once both are set.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{Goal, RunConfig, UnparseableDatePolicy};
use crate::utils::{
    DEFAULT_CONCURRENCY, DEFAULT_FETCH_ATTEMPTS, DEFAULT_FETCH_TIMEOUT_MS,
    DEFAULT_MAX_BUNDLE_PAGES, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ENTRY_POINTS, DEFAULT_MAX_PAGES,
    DEFAULT_RETRY_BASE_MS, DEFAULT_SCROLL_PASSES, DEFAULT_SETTLE_MS,
};

// Type states for the builder
pub struct WithSeedInput;
pub struct Complete;

pub struct RunConfigBuilder<State = ()> {
    pub(crate) seed_input: Option<PathBuf>,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) template: Option<PathBuf>,
    pub(crate) goal: Goal,
    pub(crate) max_pages: usize,
    pub(crate) max_depth: u8,
    pub(crate) max_entry_points: usize,
    pub(crate) max_bundle_pages: usize,
    pub(crate) min_score: Option<f64>,
    pub(crate) fetch_timeout_ms: u64,
    pub(crate) settle_ms: u64,
    pub(crate) scroll_passes: u32,
    pub(crate) fetch_attempts: u32,
    pub(crate) retry_base_ms: u64,
    pub(crate) concurrency: usize,
    pub(crate) render: bool,
    pub(crate) headless: bool,
    pub(crate) validate_only: bool,
    pub(crate) unparseable_dates: UnparseableDatePolicy,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for RunConfigBuilder<()> {
    fn default() -> Self {
        Self {
            seed_input: None,
            output_dir: None,
            template: None,
            goal: Goal::Admission,
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            max_entry_points: DEFAULT_MAX_ENTRY_POINTS,
            max_bundle_pages: DEFAULT_MAX_BUNDLE_PAGES,
            min_score: None,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            scroll_passes: DEFAULT_SCROLL_PASSES,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
            concurrency: DEFAULT_CONCURRENCY,
            render: true,
            headless: true,
            validate_only: false,
            unparseable_dates: UnparseableDatePolicy::Keep,
            _phantom: PhantomData,
        }
    }
}

impl RunConfig {
    /// Create a builder for configuring a `RunConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> RunConfigBuilder<()> {
        RunConfigBuilder::default()
    }
}

impl<State> RunConfigBuilder<State> {
    fn transition<Next>(self) -> RunConfigBuilder<Next> {
        RunConfigBuilder {
            seed_input: self.seed_input,
            output_dir: self.output_dir,
            template: self.template,
            goal: self.goal,
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            max_entry_points: self.max_entry_points,
            max_bundle_pages: self.max_bundle_pages,
            min_score: self.min_score,
            fetch_timeout_ms: self.fetch_timeout_ms,
            settle_ms: self.settle_ms,
            scroll_passes: self.scroll_passes,
            fetch_attempts: self.fetch_attempts,
            retry_base_ms: self.retry_base_ms,
            concurrency: self.concurrency,
            render: self.render,
            headless: self.headless,
            validate_only: self.validate_only,
            unparseable_dates: self.unparseable_dates,
            _phantom: PhantomData,
        }
    }
}

impl RunConfigBuilder<()> {
    pub fn seed_input(mut self, path: impl Into<PathBuf>) -> RunConfigBuilder<WithSeedInput> {
        self.seed_input = Some(path.into());
        self.transition()
    }
}

impl RunConfigBuilder<WithSeedInput> {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> RunConfigBuilder<Complete> {
        self.output_dir = Some(dir.into());
        self.transition()
    }
}

// Build method only available when all required fields are set
impl RunConfigBuilder<Complete> {
    pub fn build(self) -> Result<RunConfig> {
        if self.max_pages == 0 {
            return Err(anyhow!("max_pages must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(anyhow!("concurrency must be at least 1"));
        }
        if self.fetch_attempts == 0 {
            return Err(anyhow!("fetch_attempts must be at least 1"));
        }
        if let Some(score) = self.min_score
            && score.is_nan()
        {
            return Err(anyhow!("min_score must be a number"));
        }

        // Enforce headless mode in release builds for production safety
        #[cfg(not(debug_assertions))]
        let headless = if !self.headless {
            tracing::warn!(
                "Forcing headless mode in release build. \
                Headed mode is only available in debug builds for development."
            );
            true
        } else {
            self.headless
        };

        #[cfg(debug_assertions)]
        let headless = self.headless;

        Ok(RunConfig {
            seed_input: self
                .seed_input
                .ok_or_else(|| anyhow!("seed_input is required"))?,
            output_dir: self
                .output_dir
                .ok_or_else(|| anyhow!("output_dir is required"))?,
            template: self.template,
            goal: self.goal,
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            max_entry_points: self.max_entry_points,
            max_bundle_pages: self.max_bundle_pages,
            min_score: self.min_score,
            fetch_timeout_ms: self.fetch_timeout_ms,
            settle_ms: self.settle_ms,
            scroll_passes: self.scroll_passes,
            fetch_attempts: self.fetch_attempts,
            retry_base_ms: self.retry_base_ms,
            concurrency: self.concurrency,
            render: self.render,
            headless,
            validate_only: self.validate_only,
            unparseable_dates: self.unparseable_dates,
        })
    }
}
