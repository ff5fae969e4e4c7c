//! Run pipeline: seeds in, rows out
//!
//! The orchestrator walks the seed list with bounded concurrency and hands
//! each seed to the processor of the configured goal. Everything a seed
//! produces is recorded by the orchestrator alone, then exported through
//! the template.

pub mod admission;
pub mod checkpoint;
pub mod errors;
pub mod orchestrator;
pub mod output;
pub mod profile;
pub mod seeds;
pub mod template;

pub use admission::{ExpiryDecision, ValidationRecord, Verdict, expiry_decision, local_gate};
pub use checkpoint::{CheckpointStore, SeedStatus};
pub use errors::{PipelineError, PipelineResult, SeedError};
pub use orchestrator::{Pipeline, RunSummary, SeedContext, SeedOutcome, run_pipeline};
pub use output::{ExportOptions, RowStore, RunAccumulator, SeedRows};
pub use seeds::{Seed, load_seeds};
pub use template::Template;
