//! Error types for the run pipeline
//!
//! [`PipelineError`] aborts a run and is only produced at startup or by the
//! final export. [`SeedError`] ends one seed; the orchestrator records its
//! [`SeedError::kind`] in the checkpoint and moves on.

use std::path::PathBuf;
use thiserror::Error;

use crate::oracle::OracleError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// File could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Seed input lacks a required column
    #[error("{path}: no {what} column (accepted headers: {accepted})")]
    MissingColumn {
        path: PathBuf,
        what: &'static str,
        accepted: String,
    },

    #[error("Template {0} has an empty header row")]
    EmptyTemplate(PathBuf),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Why a seed ended without being marked done
#[derive(Debug, Error)]
pub enum SeedError {
    /// No fetch session could be opened, or the origin was unreachable
    #[error("Network failure: {0}")]
    Network(String),

    /// Every fetch that mattered stayed blocked and nothing was produced
    #[error("Blocked: {0}")]
    Blocked(String),

    /// Every oracle model stayed rate limited
    #[error("Oracle rate limited: {0}")]
    OracleRateLimited(#[source] OracleError),

    /// The seed task panicked or failed in an unexpected way
    #[error("Seed task failed: {0}")]
    Exception(String),
}

impl SeedError {
    /// Stable tag stored in the checkpoint as `error:<kind>`
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "transient-network",
            Self::Blocked(_) => "blocked",
            Self::OracleRateLimited(_) => "oracle-rate-limited",
            Self::Exception(_) => "seed-exception",
        }
    }
}

impl From<OracleError> for SeedError {
    fn from(error: OracleError) -> Self {
        if error.is_rate_limited() {
            Self::OracleRateLimited(error)
        } else {
            Self::Exception(error.to_string())
        }
    }
}
