//! CLI entry point for wind_fft
//!
//! Reads a wind-direction CSV record, runs the spectral, change-point and
//! windowed-period analyses, and reports the results.
//!
//! # Usage
//!
//! ```bash
//! wind_fft --csv station.csv --output-dir results/
//! wind_fft --csv station.csv --no-unwrap --json > report.json
//! ```
//!
//! Settings are read from `--config` (TOML) and `WIND_FFT_*` environment
//! variables; logging goes to stderr.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use wind_fft::data::change_point::ShiftDirection;
use wind_fft::data::ingest::load_samples;
use wind_fft::data::storage::ReportWriter;
use wind_fft::{logging, AnalysisReport, Settings, WindPipeline};

#[derive(Parser)]
#[command(name = "wind_fft")]
#[command(about = "Wind-direction oscillation and shift analysis", long_about = None)]
struct Cli {
    /// Input CSV with a wind_dir_deg (or wind_dir) column
    #[arg(long, default_value = "debug_wind_data.csv")]
    csv: PathBuf,

    /// Interpolate raw angles without unwrapping 0/360 crossings
    #[arg(long)]
    no_unwrap: bool,

    /// Optional TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for CSV tables and report.json
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the full report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Override the configured log format (pretty, compact, json)
    #[arg(long)]
    log_format: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    if cli.no_unwrap {
        settings.input.unwrap = false;
    }
    settings.validate()?;
    logging::init_from_settings(&settings).map_err(|e| anyhow!(e))?;
    settings.warn_degenerate();

    let samples = load_samples(&cli.csv)
        .with_context(|| format!("failed to read {}", cli.csv.display()))?;
    let report = WindPipeline::from_settings(&settings).run(&samples)?;
    summarize(&report);

    if let Some(dir) = &cli.output_dir {
        ReportWriter::new(dir, settings.spectral.min_period_sec)
            .write_all(&report)
            .with_context(|| format!("failed to write results to {}", dir.display()))?;
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn summarize(report: &AnalysisReport) {
    info!(
        dt = report.series.dt(),
        samples = report.series.len(),
        "series resampled"
    );
    if report.spectral.peaks.is_empty() {
        warn!("no spectral peaks in the configured period band");
    }
    for (rank, peak) in report.spectral.peaks.iter().enumerate() {
        info!(
            rank = rank + 1,
            period_min = peak.period / 60.0,
            amplitude_deg = peak.amplitude,
            "oscillation"
        );
    }
    let veers = report
        .changes
        .events
        .iter()
        .filter(|e| e.direction == ShiftDirection::Veer)
        .count();
    info!(
        events = report.changes.events.len(),
        veers,
        backs = report.changes.events.len() - veers,
        threshold = report.changes.threshold,
        "wind shifts"
    );
    info!(points = report.period_trace.len(), "period trace");
}
