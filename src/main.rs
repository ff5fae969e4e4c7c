//! kodegen-campusscrape: discover and extract university website data
//!
//! Reads a seed CSV, crawls each official site for admission schedules or
//! the institution profile, and writes template-shaped CSV plus audit files
//! into the output directory. Interrupted runs resume from the checkpoint.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kodegen_tools_campusscrape::config::{Goal, OracleConfig, RunConfig, UnparseableDatePolicy};
use kodegen_tools_campusscrape::fetcher::{BrowserBackend, FetchBackend, HttpBackend};
use kodegen_tools_campusscrape::oracle::{GeminiOracle, Oracle};
use kodegen_tools_campusscrape::pipeline::Pipeline;
use kodegen_tools_campusscrape::utils::{
    DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES,
    DEFAULT_SETTLE_MS,
};

#[derive(Parser)]
#[command(name = "kodegen-campusscrape")]
#[command(about = "Same-site discovery and evidence-gated extraction for university websites")]
#[command(version)]
struct Cli {
    /// Seed CSV (campus name and official website columns)
    #[arg(long)]
    input: PathBuf,

    /// CSV whose header row defines the output columns
    #[arg(long)]
    template: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "out")]
    outdir: PathBuf,

    /// admission or profile
    #[arg(long, default_value = "admission")]
    goal: Goal,

    /// Page budget per site, origin included
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u8,

    /// Minimum relevance score for a reported candidate
    #[arg(long, allow_negative_numbers = true)]
    min_score: Option<f64>,

    /// Per-fetch timeout
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Settle wait after navigation (rendering mode)
    #[arg(long, default_value_t = DEFAULT_SETTLE_MS)]
    wait_after_ms: u64,

    /// Sites processed at the same time
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Plain HTTP fetching instead of Chromium
    #[arg(long)]
    no_browser: bool,

    /// Show the browser window (debug builds only)
    #[arg(long)]
    headed: bool,

    /// Validate candidate links, skip extraction
    #[arg(long)]
    validate_only: bool,

    /// Drop schedules whose end date cannot be parsed
    #[arg(long)]
    drop_unparseable_dates: bool,

    /// Primary oracle model (overrides GEMINI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Fallback oracle model, tried in the order given
    #[arg(long = "fallback-model")]
    fallback_models: Vec<String>,

    /// error, warn, info, debug or trace (RUST_LOG wins when set)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},chromiumoxide=warn,hyper=warn")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn oracle_config(cli: &Cli) -> Result<OracleConfig> {
    let mut config = OracleConfig::from_env()?;
    if let Some(model) = &cli.model {
        config = config.with_primary_model(model.trim());
    }
    if !cli.fallback_models.is_empty() {
        config = config.with_fallback_models(cli.fallback_models.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut builder = RunConfig::builder()
        .seed_input(&cli.input)
        .output_dir(&cli.outdir)
        .goal(cli.goal)
        .max_pages(cli.max_pages)
        .max_depth(cli.max_depth)
        .fetch_timeout_ms(cli.timeout_ms)
        .settle_ms(cli.wait_after_ms)
        .concurrency(cli.concurrency)
        .render(!cli.no_browser)
        .headless(!cli.headed)
        .validate_only(cli.validate_only)
        .unparseable_dates(if cli.drop_unparseable_dates {
            UnparseableDatePolicy::Drop
        } else {
            UnparseableDatePolicy::Keep
        });
    if let Some(template) = &cli.template {
        builder = builder.template(template);
    }
    if let Some(score) = cli.min_score {
        builder = builder.min_score(score);
    }
    let config = builder.build().context("invalid run configuration")?;

    let oracle: Arc<dyn Oracle> = Arc::new(
        GeminiOracle::new(oracle_config(&cli)?).context("could not set up the oracle client")?,
    );

    let backend: Arc<dyn FetchBackend> = if config.render() {
        Arc::new(BrowserBackend::new(
            config.fetch_settings(),
            config.state_dir().join("browser"),
        ))
    } else {
        Arc::new(HttpBackend::new(config.fetch_settings()))
    };

    info!(
        goal = %config.goal(),
        input = %config.seed_input().display(),
        outdir = %config.output_dir().display(),
        render = config.render(),
        "starting run"
    );

    let summary = Pipeline::new(config, backend, oracle).run().await?;
    info!(
        done = summary.done,
        failed = summary.failed,
        skipped = summary.skipped,
        rows = summary.exported_rows,
        tokens = summary.usage.total_tokens,
        "run complete"
    );
    Ok(())
}
