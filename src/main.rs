//! Command-line entry point for the `sensorflow-etl` daily pipeline.
//!
//! This binary is the trigger an external scheduler calls once per date:
//! - `run --date YYYY-MM-DD` processes a single day
//! - `backfill --from YYYY-MM-DD --to YYYY-MM-DD` invokes `run` for each day
//!   in the inclusive range, in order, continuing past failed days
//!
//! `--dry-run` swaps the target database for an in-memory store so a day can
//! be previewed without `TARGET_DATABASE_URL`.
//!
//! # Environment Variables
//! - `TARGET_DATABASE_URL` (**required** unless `--dry-run`) – target store
//! - `SOURCE_API_URL` (optional) – raw data endpoint, overridden by `--api-url`
//! - `EXTRACT_TIMEOUT_SECS` (optional) – extract request timeout (default: 30)
//! - `SENSORFLOW_LOG_LEVEL`, `SENSORFLOW_SPAN_EVENTS`, `FORCE_COLOR` – logging
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;

use sensorflow_etl::{
    config::{self, EtlConfig},
    parse_run_date, telemetry, Extractor, MemoryStore, Pipeline, RunReport,
};

#[derive(Parser, Debug)]
#[command(
    name = "sensorflow-etl",
    version,
    about = "Resample raw wind sensor data into 10-minute statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one calendar day
    Run(RunArgs),
    /// Process every day of an inclusive date range, one run per day
    Backfill(BackfillArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Day to process, YYYY-MM-DD
    #[arg(long)]
    date: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
struct BackfillArgs {
    /// First day to process, YYYY-MM-DD
    #[arg(long)]
    from: String,

    /// Last day to process (inclusive), YYYY-MM-DD
    #[arg(long)]
    to: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Raw data endpoint; defaults to SOURCE_API_URL
    #[arg(long = "api-url")]
    api_url: Option<String>,

    /// Run against an in-memory store instead of the target database
    #[arg(long = "dry-run")]
    dry_run: bool,
}

// ---

/// Where a run's output goes.
enum Target {
    Database(String),
    DryRun(MemoryStore),
}

impl Target {
    async fn run(&mut self, pipeline: &Pipeline, date: &str) -> Result<RunReport> {
        // ---
        let report = match self {
            Target::Database(url) => pipeline.run_owned(date, url).await?,
            Target::DryRun(store) => pipeline.run_with_session(date, store).await?,
        };
        Ok(report)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    telemetry::init_tracing();
    dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_one(args).await,
        Command::Backfill(args) => backfill(args).await,
    }
}

fn setup(common: &CommonArgs) -> Result<(Pipeline, Target)> {
    // ---
    let mut cfg: EtlConfig = config::load_etl_config(!common.dry_run)?;
    if let Some(url) = &common.api_url {
        cfg.source_api_url = url.clone();
    }
    cfg.log_config();

    let extractor = Extractor::new(cfg.source_api_url.clone(), cfg.extract_timeout)
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

    let target = if common.dry_run {
        tracing::info!("Dry run: results stay in memory");
        Target::DryRun(MemoryStore::new())
    } else {
        Target::Database(cfg.target_db_url)
    };

    Ok((Pipeline::new(extractor), target))
}

async fn run_one(args: RunArgs) -> Result<()> {
    // ---
    // Reject a bad date before reading any configuration.
    parse_run_date(&args.date)?;

    let (pipeline, mut target) = setup(&args.common)?;
    let report = target.run(&pipeline, &args.date).await?;
    tracing::info!("rows_processed={}", report.loaded.rows_written);
    Ok(())
}

async fn backfill(args: BackfillArgs) -> Result<()> {
    // ---
    let from = parse_run_date(&args.from)?;
    let to = parse_run_date(&args.to)?;
    if from > to {
        return Err(anyhow!("--from {} is after --to {}", from, to));
    }

    let (pipeline, mut target) = setup(&args.common)?;

    let mut failed = Vec::new();
    let mut rows_processed = 0;
    for date in from.iter_days().take_while(|d| *d <= to) {
        let date = date.format("%Y-%m-%d").to_string();
        match target.run(&pipeline, &date).await {
            Ok(report) => rows_processed += report.loaded.rows_written,
            Err(e) => {
                tracing::error!("Run for {} failed: {:#}", date, e);
                failed.push(date);
            }
        }
    }

    tracing::info!(
        "Backfill {}..={} finished: rows_processed={} failed_days={}",
        from,
        to,
        rows_processed,
        failed.len()
    );

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{} day(s) failed: {}", failed.len(), failed.join(", ")))
    }
}
