//! Core configuration types for a scrape run
//!
//! `RunConfig` is threaded explicitly into the orchestrator, the crawler and
//! the fetch layer. Nothing reads ambient settings after startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::utils::{
    DEFAULT_FALLBACK_MODELS, DEFAULT_ORACLE_BASE_URL, DEFAULT_ORACLE_MAX_RETRIES,
    DEFAULT_ORACLE_MODEL, ORACLE_JITTER_SECS, ORACLE_MAX_SLEEP_OVERLOADED_SECS,
    ORACLE_MAX_SLEEP_SECS,
};

/// What a run extracts from every seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    /// Admission schedules and registration tracks
    Admission,
    /// Contact details plus vision, mission and history
    Profile,
}

impl Goal {
    /// Second half of the checkpoint key
    #[must_use]
    pub const fn field_set_key(&self) -> &'static str {
        match self {
            Self::Admission => "admission",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_set_key())
    }
}

impl FromStr for Goal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admission" | "jalur" => Ok(Self::Admission),
            "profile" | "info" => Ok(Self::Profile),
            other => Err(format!("unknown goal '{other}' (expected admission or profile)")),
        }
    }
}

/// What happens to a schedule row whose end date cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnparseableDatePolicy {
    /// Keep the row and log it for review
    #[default]
    Keep,
    /// Drop the row
    Drop,
}

/// Main configuration struct for a scrape run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub(crate) seed_input: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) template: Option<PathBuf>,
    pub(crate) goal: Goal,
    /// Page budget per seed, origin fetch included
    pub(crate) max_pages: usize,
    pub(crate) max_depth: u8,
    pub(crate) max_entry_points: usize,
    /// Pages bundled for contact/narrative extraction
    pub(crate) max_bundle_pages: usize,
    /// Overrides the profile's minimum reportable score when set
    pub(crate) min_score: Option<f64>,
    pub(crate) fetch_timeout_ms: u64,
    pub(crate) settle_ms: u64,
    pub(crate) scroll_passes: u32,
    pub(crate) fetch_attempts: u32,
    pub(crate) retry_base_ms: u64,
    pub(crate) concurrency: usize,
    /// Use the rendering fetcher (Chromium) instead of plain HTTP
    pub(crate) render: bool,
    pub(crate) headless: bool,
    /// Stop after validation; no schedule extraction
    pub(crate) validate_only: bool,
    pub(crate) unparseable_dates: UnparseableDatePolicy,
}

/// Connection and retry settings for the Gemini oracle
#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub api_key: String,
    /// Primary model first, then fallbacks in order
    pub models: Vec<String>,
    pub base_url: String,
    /// Attempts per model
    pub max_retries: u32,
    /// Backoff cap for 429 and 503 responses
    pub max_sleep_overloaded_secs: f64,
    /// Backoff cap for every other retryable failure
    pub max_sleep_secs: f64,
    pub jitter_secs: f64,
    pub request_timeout_secs: u64,
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &"<redacted>")
            .field("models", &self.models)
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("max_sleep_overloaded_secs", &self.max_sleep_overloaded_secs)
            .field("max_sleep_secs", &self.max_sleep_secs)
            .field("jitter_secs", &self.jitter_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl OracleConfig {
    /// Config with the default model chain for the given key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let mut models = vec![DEFAULT_ORACLE_MODEL.to_string()];
        models.extend(DEFAULT_FALLBACK_MODELS.iter().map(|m| (*m).to_string()));
        Self {
            api_key: api_key.into(),
            models,
            base_url: DEFAULT_ORACLE_BASE_URL.to_string(),
            max_retries: DEFAULT_ORACLE_MAX_RETRIES,
            max_sleep_overloaded_secs: ORACLE_MAX_SLEEP_OVERLOADED_SECS,
            max_sleep_secs: ORACLE_MAX_SLEEP_SECS,
            jitter_secs: ORACLE_JITTER_SECS,
            request_timeout_secs: 120,
        }
    }

    /// Read `GEMINI_API_KEY` and the optional `GEMINI_MODEL` from the environment
    ///
    /// # Errors
    ///
    /// Returns an error when the API key is missing or blank.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            anyhow::bail!("GEMINI_API_KEY is not set");
        }

        let mut config = Self::new(api_key.trim());
        if let Ok(model) = std::env::var("GEMINI_MODEL")
            && !model.trim().is_empty()
        {
            config = config.with_primary_model(model.trim());
        }
        Ok(config)
    }

    /// Put `model` first in the chain, removing any later duplicate
    #[must_use]
    pub fn with_primary_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.models.retain(|m| m != &model);
        self.models.insert(0, model);
        self
    }

    /// Replace the fallback models, keeping the current primary
    #[must_use]
    pub fn with_fallback_models(mut self, fallbacks: Vec<String>) -> Self {
        let primary = self.models.first().cloned();
        self.models = primary.into_iter().collect();
        for model in fallbacks {
            if !self.models.contains(&model) {
                self.models.push(model);
            }
        }
        self
    }
}
