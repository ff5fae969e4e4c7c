//! Oracle boundary
//!
//! The Oracle turns text or bytes plus an optional schema into best-effort
//! structured output. It may be wrong, may be rate limited and may answer
//! with something that is not JSON at all; callers parse its reply with
//! [`parse`] and never trust a value without the evidence gate.

pub mod gemini;
pub mod parse;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{Add, AddAssign};
use thiserror::Error;

pub use gemini::GeminiOracle;

/// Token accounting reported with each reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub candidates_tokens: u64,
    pub total_tokens: u64,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.candidates_tokens += other.candidates_tokens;
        self.total_tokens += other.total_tokens;
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

/// Raw Oracle answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleReply {
    pub text: String,
    pub usage: TokenUsage,
    /// Model that produced the answer
    pub model: String,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Configuration error: {0}")]
    Config(String),
    /// Every model in the chain kept answering 429/503
    #[error("Rate limited on every model: {0}")]
    RateLimited(String),
    /// Non-retryable client error
    #[error("Request rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error: {0}")]
    Server(String),
}

impl OracleError {
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// External structured-data generator
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Text-grounded generation, JSON-constrained when `schema` is given
    async fn generate(&self, prompt: &str, schema: Option<&Value>) -> Result<OracleReply, OracleError>;

    /// Byte-grounded generation (documents, images)
    async fn generate_with_bytes(
        &self,
        prompt: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<OracleReply, OracleError>;
}
