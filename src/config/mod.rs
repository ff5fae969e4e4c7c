//! Configuration module for scrape runs
//!
//! This module provides the `RunConfig` struct and its type-safe builder,
//! the oracle connection settings, and the per-goal discovery profiles.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod profile;
pub mod types;

// Re-exports for public API
pub use builder::{Complete, RunConfigBuilder, WithSeedInput};
pub use profile::{DiscoveryProfile, EntryStrategy, PriorityTier, ScoreWeights};
pub use types::{Goal, OracleConfig, RunConfig, UnparseableDatePolicy};
