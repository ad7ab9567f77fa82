//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads records from the selected source
//! - runs the per-region analysis pipeline
//! - prints reports and writes optional exports

use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};

use crate::cli::{AnalyzeArgs, Cli, Command, RunArgs, SourceArgs, SourceKind, WatchArgs};
use crate::data::{CovidTrackingClient, InMemorySource, SampleConfig, generate_sample};
use crate::domain::{AnalysisConfig, DEFAULT_THRESHOLDS, Metric, NormalizePolicy, RegionCode};
use crate::error::AppError;

pub mod pipeline;

use pipeline::{AnalysisBoard, AnalysisSnapshot, run_analysis};

/// Entry point for the `epi` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Rank(args) => handle_rank(args),
        Command::Watch(args) => handle_watch(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let (snapshot, label) = analyze_once(&args.run, 1)?;

    println!("{}", crate::report::format_run_summary(&snapshot, &label));
    for analysis in &snapshot.regions {
        println!("{}", crate::report::format_region_report(analysis, args.width));
    }
    println!("{}", crate::report::format_rank_table(&snapshot.regions));

    if let Some(path) = &args.export {
        crate::io::export::write_export(path, &snapshot)?;
        info!("wrote export to {}", path.display());
    }

    require_some_fit(&snapshot)
}

fn handle_rank(args: RunArgs) -> Result<(), AppError> {
    let (snapshot, _) = analyze_once(&args, 1)?;
    println!("{}", crate::report::format_rank_table(&snapshot.regions));
    require_some_fit(&snapshot)
}

fn handle_watch(args: WatchArgs) -> Result<(), AppError> {
    let mut board = AnalysisBoard::default();
    let mut epoch: u64 = 0;

    loop {
        epoch += 1;
        match analyze_once(&args.run, epoch) {
            Ok((snapshot, label)) => {
                if board.publish(snapshot) {
                    if let Some(latest) = board.latest() {
                        println!("{}", crate::report::format_run_summary(latest, &label));
                        println!("{}", crate::report::format_rank_table(&latest.regions));
                    }
                }
            }
            // Keep showing the previous snapshot; the next round retries.
            Err(err) => warn!("refresh {epoch} failed: {err}"),
        }

        if args.rounds != 0 && epoch >= args.rounds {
            break;
        }
        thread::sleep(Duration::from_secs(args.interval));
    }

    match board.latest() {
        Some(snapshot) => require_some_fit(snapshot),
        None => Err(AppError::new(4, "No refresh succeeded.")),
    }
}

fn analyze_once(args: &RunArgs, epoch: u64) -> Result<(AnalysisSnapshot, String), AppError> {
    let config = analysis_config_from_args(args)?;
    let (source, label) = load_source(&args.source, config.metric)?;
    let regions: Vec<RegionCode> = args.region.iter().map(RegionCode::new).collect();
    let snapshot = run_analysis(&source, &config, &regions, epoch)?;
    Ok((snapshot, label))
}

fn require_some_fit(snapshot: &AnalysisSnapshot) -> Result<(), AppError> {
    if snapshot.fitted_count() == 0 {
        return Err(AppError::new(3, "No region produced a doubling time."));
    }
    Ok(())
}

pub fn analysis_config_from_args(args: &RunArgs) -> Result<AnalysisConfig, AppError> {
    if args.lookback == 0 {
        return Err(AppError::new(2, "Lookback must be at least 1 observation."));
    }
    if let Some(bad) = args.threshold.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
        return Err(AppError::new(2, format!("Threshold must be a positive number, got {bad}.")));
    }
    let thresholds = if args.threshold.is_empty() {
        DEFAULT_THRESHOLDS.to_vec()
    } else {
        args.threshold.clone()
    };

    Ok(AnalysisConfig {
        metric: args.metric,
        policy: NormalizePolicy {
            enforce_monotonic: !args.no_monotonic,
            drop_non_positive_increments: !args.keep_flat_days,
        },
        target: args.target,
        thresholds,
        trend_lookback: args.lookback,
    })
}

/// Load every record of the selected source, plus a label for reports.
pub fn load_source(args: &SourceArgs, metric: Metric) -> Result<(InMemorySource, String), AppError> {
    let default_region = RegionCode::new(&args.default_region);
    match args.source {
        SourceKind::Json => {
            let path = input_path(args)?;
            let source = InMemorySource::from_json_file(path, &default_region)?;
            Ok((source, format!("json {}", path.display())))
        }
        SourceKind::Csv => {
            let path = input_path(args)?;
            let source = InMemorySource::from_csv_file(path, metric)?;
            Ok((source, format!("csv {}", path.display())))
        }
        SourceKind::Remote => {
            let client = CovidTrackingClient::from_env()?;
            let source = client.fetch_all(&default_region)?;
            Ok((source, format!("remote {}", client.base_url())))
        }
        SourceKind::Synthetic => {
            let config = SampleConfig {
                regions: args.regions,
                days: args.days,
                seed: args.seed,
                ..SampleConfig::default()
            };
            let source = InMemorySource::new(generate_sample(&config)?);
            Ok((source, format!("synthetic (seed {})", args.seed)))
        }
    }
}

fn input_path(args: &SourceArgs) -> Result<&std::path::Path, AppError> {
    args.input
        .as_deref()
        .ok_or_else(|| AppError::new(2, "--input is required for json and csv sources."))
}
