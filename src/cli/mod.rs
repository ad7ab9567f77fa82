//! Command-line parsing for the `epi` growth analyzer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! analysis code; `app` turns these structs into an `AnalysisConfig`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::domain::{FitTarget, Metric};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "epi", version, about = "Exponential growth, doubling time and projections per region")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full per-region report: fit, projections, trend, sparkline.
    Analyze(AnalyzeArgs),
    /// Regions ordered by current doubling time (fastest spread first).
    Rank(RunArgs),
    /// Re-run the analysis periodically, keeping only the newest snapshot.
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Per-day JSON array file.
    Json,
    /// Wide CSV file (one row per region, one column per date).
    Csv,
    /// Remote per-day JSON API (`EPI_API_BASE`).
    Remote,
    /// Seeded synthetic regions.
    Synthetic,
}

/// Where records come from.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Synthetic)]
    pub source: SourceKind,

    /// Input file for `json` and `csv` sources.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Region assigned to JSON rows without a `state` field.
    #[arg(long, default_value = "US")]
    pub default_region: String,

    /// Seed for the synthetic source.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of synthetic regions.
    #[arg(long, default_value_t = 8)]
    pub regions: usize,

    /// Number of synthetic days per region.
    #[arg(long, default_value_t = 40)]
    pub days: usize,
}

/// Options shared by every command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Metric to analyze.
    #[arg(short, long, value_enum, default_value_t = Metric::Positive)]
    pub metric: Metric,

    /// Restrict to these regions (repeatable). Default: all.
    #[arg(short, long = "region", value_name = "CODE")]
    pub region: Vec<String>,

    /// Value fitted by the regression.
    #[arg(long, value_enum, default_value_t = FitTarget::Cumulative)]
    pub target: FitTarget,

    /// Projection threshold (repeatable). Default: 10000, 100000, 1000000.
    #[arg(short, long = "threshold", value_name = "N")]
    pub threshold: Vec<f64>,

    /// Keep downward revisions instead of clamping to the running total.
    #[arg(long)]
    pub no_monotonic: bool,

    /// Keep days whose increase is zero or negative.
    #[arg(long)]
    pub keep_flat_days: bool,

    /// Observations dropped for the "past" doubling time.
    #[arg(long, default_value_t = 5)]
    pub lookback: usize,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Write results to a `.json` or `.csv` file.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Sparkline width (columns); 0 disables sparklines.
    #[arg(long, default_value_t = 30)]
    pub width: usize,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Seconds between refreshes.
    #[arg(long, default_value_t = 300)]
    pub interval: u64,

    /// Stop after this many refreshes (0 = run until interrupted).
    #[arg(long, default_value_t = 0)]
    pub rounds: u64,
}
