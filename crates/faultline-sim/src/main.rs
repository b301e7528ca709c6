//! faultline-sim - Synthetic Incident Telemetry Generator
//!
//! Usage:
//!   faultline-sim --start-date 2024-01-01 --days 7
//!   faultline-sim --start-date 2024-01-01 --end-date 2024-02-01 --seed 7
//!   faultline-sim --hours 6 --config faultline.toml --output-dir ./out --no-compress

use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use faultline_core::SimulationConfig;
use faultline_sim::{DirectorySink, SimulationEngine};

#[derive(Parser)]
#[command(name = "faultline-sim")]
#[command(about = "Generate correlated synthetic telemetry across four observability sources")]
struct Cli {
    /// Start date (YYYY-MM-DD), midnight UTC
    #[arg(long, default_value = "2024-01-01")]
    start_date: String,

    /// End date (YYYY-MM-DD); overrides --days/--hours
    #[arg(long)]
    end_date: Option<String>,

    /// Number of days to generate
    #[arg(long)]
    days: Option<u32>,

    /// Number of hours to generate
    #[arg(long)]
    hours: Option<u32>,

    /// TOML configuration file; built-in topology when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for streams and the incident index
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Write plain .jsonl instead of .jsonl.gz
    #[arg(long)]
    no_compress: bool,

    /// Override the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(message) = run(cli) {
        error!("{message}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let start = parse_date(&cli.start_date)?;
    let end = match (&cli.end_date, cli.days, cli.hours) {
        (Some(end_date), _, _) => parse_date(end_date)?,
        (None, Some(days), _) => start + Duration::days(i64::from(days)),
        (None, None, Some(hours)) => start + Duration::hours(i64::from(hours)),
        (None, None, None) => start + Duration::days(1),
    };

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path).map_err(|e| e.to_string())?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.generation.seed = seed;
    }

    let compress = !cli.no_compress;
    info!(
        start = %start,
        end = %end,
        output_dir = %cli.output_dir.display(),
        compress,
        "faultline-sim starting"
    );

    let engine = SimulationEngine::new(config, start, end).map_err(|e| e.to_string())?;
    let mut sink = DirectorySink::new(&cli.output_dir, compress);
    let summary = engine.run(&mut sink).map_err(|e| e.to_string())?;

    for (source, records) in &summary.records_by_source {
        info!(source = source.as_str(), records = *records, "stream written");
    }
    info!(
        incidents = summary.incidents,
        total_records = summary.total_records,
        index = %cli.output_dir.join("correlation/incidents.json").display(),
        "generation complete"
    );
    Ok(())
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{value}': {e}"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date '{value}'"))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}
