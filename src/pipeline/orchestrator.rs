//! Run orchestrator
//!
//! Seeds are processed by spawned tasks, at most `concurrency` at a time.
//! A task owns its fetch session for the whole seed and only hands back a
//! [`SeedOutcome`]; this loop is the single writer of the checkpoint, the
//! row store, the audit trail and the partial snapshot, updating all of them
//! as each seed completes. A failing or panicking seed is recorded as
//! `error:<kind>` and the run goes on.

use chrono::Local;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use super::checkpoint::{CheckpointStore, SeedStatus};
use super::errors::{PipelineError, PipelineResult, SeedError};
use super::output::{
    AuditLog, CANDIDATES_FILE, ExportOptions, FINAL_CSV, ITEMS_FILE, ItemAudit, PARTIAL_CSV,
    ROWS_FILE, Row, RowStore, RunAccumulator, SeedRows, VERDICTS_FILE, write_csv,
    write_valid_links,
};
use super::seeds::{Seed, load_seeds};
use super::template::Template;
use super::admission::ValidationRecord;
use super::{admission, profile};
use crate::config::{Goal, RunConfig};
use crate::crawl_engine::{CandidateLink, DiscoveryReport};
use crate::fetcher::{FetchBackend, Fetcher, MemoFetcher};
use crate::oracle::{Oracle, OracleError, OracleReply, TokenUsage};

/// What a seed's processing code gets to work with
pub struct SeedContext<'a> {
    pub config: &'a RunConfig,
    pub oracle: &'a dyn Oracle,
    /// The seed's own session, memoized
    pub fetcher: &'a dyn Fetcher,
}

/// Everything one seed produced
#[derive(Debug, Default)]
pub struct SeedOutcome {
    pub rows: Vec<Row>,
    pub candidates: Vec<CandidateLink>,
    pub verdicts: Vec<ValidationRecord>,
    pub items: Vec<ItemAudit>,
    pub usage: TokenUsage,
    pub blocked: bool,
    pub origin_failed: bool,
}

impl SeedOutcome {
    #[must_use]
    pub fn from_report(report: &DiscoveryReport) -> Self {
        let mut outcome = Self::default();
        outcome.absorb_report(report);
        outcome
    }

    pub fn absorb_report(&mut self, report: &DiscoveryReport) {
        self.candidates.extend(report.candidates.iter().cloned());
        self.blocked |= report.blocked;
        self.origin_failed |= report.origin_failed;
    }

    /// Count a reply's tokens, or sort an Oracle failure
    ///
    /// An exhausted rate limit ends the seed (`Err`); any other failure is
    /// handed back as a reason (`Ok(Err(..))`) for the caller to record.
    pub fn settle(
        &mut self,
        reply: Result<OracleReply, OracleError>,
    ) -> Result<Result<OracleReply, String>, SeedError> {
        match reply {
            Ok(reply) => {
                self.usage += reply.usage;
                Ok(Ok(reply))
            }
            Err(e) if e.is_rate_limited() => Err(SeedError::from(e)),
            Err(e) => Ok(Err(format!("oracle error: {e}"))),
        }
    }

    /// Status to record for a seed that returned normally
    fn status(&self) -> Result<(), SeedError> {
        if !self.rows.is_empty() || !self.verdicts.is_empty() {
            return Ok(());
        }
        if self.origin_failed && !self.blocked {
            return Err(SeedError::Network("origin unreachable".into()));
        }
        if self.blocked {
            return Err(SeedError::Blocked("no output and blocked pages seen".into()));
        }
        Ok(())
    }
}

/// Totals reported at the end of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub seeds: usize,
    pub skipped: usize,
    pub done: usize,
    pub failed: usize,
    /// Rows processed this run, before the export filter
    pub new_rows: usize,
    /// Rows in `final.csv`
    pub exported_rows: usize,
    pub candidates: usize,
    pub usage: TokenUsage,
    pub elapsed: Duration,
}

/// Shared handles a seed task needs
#[derive(Clone)]
struct SeedWorker {
    config: Arc<RunConfig>,
    backend: Arc<dyn FetchBackend>,
    oracle: Arc<dyn Oracle>,
}

impl SeedWorker {
    async fn process(&self, seed: &Seed) -> Result<SeedOutcome, SeedError> {
        let identity = seed.identity();
        let session = self
            .backend
            .open(&identity)
            .await
            .map_err(|e| SeedError::Network(format!("could not open fetch session: {e:#}")))?;

        let result = {
            let memo = MemoFetcher::new(session.as_ref());
            let ctx = SeedContext {
                config: self.config.as_ref(),
                oracle: self.oracle.as_ref(),
                fetcher: &memo,
            };
            let result = match self.config.goal() {
                Goal::Admission => admission::process(&ctx, seed).await,
                Goal::Profile => profile::process(&ctx, seed).await,
            };
            memo.close().await;
            result
        };

        session.close().await;
        let outcome = result?;
        outcome.status()?;
        Ok(outcome)
    }
}

/// Mutable run state, touched only by the orchestrator loop
struct RunState {
    checkpoint: CheckpointStore,
    row_store: RowStore,
    audit: AuditLog,
    accumulator: RunAccumulator,
    template: Template,
    summary: RunSummary,
}

pub struct Pipeline {
    worker: SeedWorker,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: RunConfig, backend: Arc<dyn FetchBackend>, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            worker: SeedWorker {
                config: Arc::new(config),
                backend,
                oracle,
            },
        }
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.worker.config
    }

    fn export_options(&self) -> ExportOptions {
        let now = Local::now();
        ExportOptions {
            goal: self.config().goal(),
            unparseable_dates: self.config().unparseable_dates(),
            today: now.date_naive(),
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn open_state(&self) -> PipelineResult<RunState> {
        let config = self.config();
        let output_dir = config.output_dir();
        std::fs::create_dir_all(config.state_dir())
            .map_err(|e| PipelineError::io(config.state_dir(), e))?;

        let template = match config.template() {
            Some(path) => Template::load(path)?,
            None => Template::default_for(config.goal()),
        };

        let checkpoint = CheckpointStore::load(config.checkpoint_path())?;
        let row_store = RowStore::new(output_dir.join(ROWS_FILE));
        let mut accumulator = RunAccumulator::new();
        for batch in row_store.load(|key| checkpoint.is_done(key))? {
            accumulator.push(batch);
        }
        if accumulator.row_count() > 0 {
            info!(
                target: "campusscrape::run",
                "resuming with {} row(s) from finished seeds",
                accumulator.row_count()
            );
        }

        Ok(RunState {
            checkpoint,
            row_store,
            audit: AuditLog::new(output_dir),
            accumulator,
            template,
            summary: RunSummary::default(),
        })
    }

    /// Record one finished seed and refresh the partial snapshot
    fn record(
        &self,
        state: &mut RunState,
        seed: &Seed,
        result: Result<SeedOutcome, SeedError>,
    ) -> PipelineResult<()> {
        let key = seed.checkpoint_key(&self.field_set_key());

        let status = match result {
            Ok(outcome) => {
                state.audit.append(CANDIDATES_FILE, &outcome.candidates)?;
                state.audit.append(VERDICTS_FILE, &outcome.verdicts)?;
                state.audit.append(ITEMS_FILE, &outcome.items)?;

                let batch = SeedRows {
                    key: key.clone(),
                    position: seed.position,
                    rows: outcome.rows,
                };
                state.row_store.append(&batch)?;

                state.summary.done += 1;
                state.summary.new_rows += batch.rows.len();
                state.summary.candidates += outcome.candidates.len();
                state.summary.usage += outcome.usage;
                info!(
                    target: "campusscrape::run",
                    "[{}] done: {} row(s), {} candidate(s), {} token(s)",
                    seed.display_name,
                    batch.rows.len(),
                    outcome.candidates.len(),
                    outcome.usage.total_tokens
                );
                state.accumulator.push(batch);
                SeedStatus::Done
            }
            Err(e) => {
                state.summary.failed += 1;
                warn!(target: "campusscrape::run", "[{}] failed: {e}", seed.display_name);
                SeedStatus::Error(e.kind().to_string())
            }
        };

        state.checkpoint.set(key, &status);
        state.checkpoint.persist()?;

        let rows = state.accumulator.export_rows(&self.export_options());
        write_csv(
            &self.config().output_dir().join(PARTIAL_CSV),
            &state.template,
            &rows,
        )
    }

    /// Checkpoint field set; validation-only runs never mark a seed done
    /// for a full run
    fn field_set_key(&self) -> String {
        let goal = self.config().goal().field_set_key();
        if self.config().validate_only() {
            format!("{goal}:validate")
        } else {
            goal.to_string()
        }
    }

    /// Process every pending seed and write the final export
    ///
    /// # Errors
    ///
    /// Fails on unreadable input, a bad template, or when the checkpoint or
    /// outputs cannot be written. Seed failures never end the run.
    pub async fn run(&self) -> PipelineResult<RunSummary> {
        let started = Instant::now();
        let config = Arc::clone(&self.worker.config);
        let seeds = load_seeds(config.seed_input())?;
        let mut state = self.open_state()?;
        state.summary.seeds = seeds.len();

        let field_set = self.field_set_key();
        let mut pending = Vec::new();
        for seed in seeds {
            let key = seed.checkpoint_key(&field_set);
            if state.checkpoint.is_done(&key) {
                debug!(target: "campusscrape::run", "skip {key}");
                state.summary.skipped += 1;
            } else {
                pending.push(seed);
            }
        }

        info!(
            target: "campusscrape::run",
            "{} seed(s): {} pending, {} already done, goal {}, concurrency {}",
            state.summary.seeds,
            pending.len(),
            state.summary.skipped,
            config.goal(),
            config.concurrency()
        );

        let concurrency = config.concurrency().max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut active = FuturesUnordered::new();
        let mut queue = pending.into_iter();
        let total = state.summary.seeds;

        loop {
            while active.len() < concurrency {
                let Some(seed) = queue.next() else { break };

                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    error!(target: "campusscrape::run", "semaphore closed unexpectedly");
                    break;
                };

                info!(
                    target: "campusscrape::run",
                    "[{}/{total}] start {} {}",
                    seed.position + 1,
                    seed.display_name,
                    seed.origin_url
                );
                state
                    .checkpoint
                    .set(seed.checkpoint_key(&field_set), &SeedStatus::Pending);

                let worker = self.worker.clone();
                let task_seed = seed.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    worker.process(&task_seed).await
                });
                active.push(async move { (seed, handle.await) });
            }

            let Some((seed, joined)) = active.next().await else {
                break;
            };

            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        target: "campusscrape::run",
                        "[{}] seed task panicked: {e}",
                        seed.display_name
                    );
                    Err(SeedError::Exception(e.to_string()))
                }
            };
            self.record(&mut state, &seed, result)?;
        }

        let rows = state.accumulator.export_rows(&self.export_options());
        write_csv(&config.output_dir().join(FINAL_CSV), &state.template, &rows)?;
        state.summary.exported_rows = rows.len();

        if config.goal() == Goal::Admission {
            let valid = write_valid_links(config.output_dir())?;
            info!(target: "campusscrape::run", "{valid} valid link(s) exported");
        }

        state.summary.elapsed = started.elapsed();
        let summary = state.summary;
        info!(
            target: "campusscrape::run",
            "finished in {:.1}s: {} done, {} failed, {} skipped, {} row(s) exported, {} token(s)",
            summary.elapsed.as_secs_f64(),
            summary.done,
            summary.failed,
            summary.skipped,
            summary.exported_rows,
            summary.usage.total_tokens
        );
        Ok(summary)
    }
}

/// Convenience wrapper: build the pipeline and run it once
///
/// # Errors
///
/// See [`Pipeline::run`].
pub async fn run_pipeline(
    config: RunConfig,
    backend: Arc<dyn FetchBackend>,
    oracle: Arc<dyn Oracle>,
) -> anyhow::Result<RunSummary> {
    Ok(Pipeline::new(config, backend, oracle).run().await?)
}
