//! Export analysis snapshots to JSON or CSV.
//!
//! - JSON carries everything: fit, trend, projections, the cleaned series and
//!   the fitted curve per region
//! - CSV is one summary row per region, meant for spreadsheets

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::app::pipeline::AnalysisSnapshot;
use crate::domain::{
    FitTarget, Metric, NormalizeReport, Observation, RegionAnalysis, RegionCode, RegressionResult,
    ThresholdProjection, TrendVerdict,
};
use crate::error::{AnalysisError, AppError};
use crate::models::{FittedPoint, fitted_values};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(ExportFormat::Json),
            Some("csv") => Ok(ExportFormat::Csv),
            _ => Err(AppError::new(
                2,
                format!("Unsupported export extension for '{}' (use .json or .csv).", path.display()),
            )),
        }
    }
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    epoch: u64,
    metric: Metric,
    target: FitTarget,
    as_of: Option<NaiveDate>,
    regions: Vec<RegionExport<'a>>,
    row_errors: Vec<RowErrorExport<'a>>,
}

#[derive(Serialize)]
struct RegionExport<'a> {
    region: &'a RegionCode,
    metric: Metric,
    status: &'static str,
    error: Option<&'a AnalysisError>,
    fit: Option<&'a RegressionResult>,
    trend: &'a TrendVerdict,
    growth_change: Option<f64>,
    projections: Vec<ProjectionExport>,
    normalization: &'a NormalizeReport,
    observations: &'a [Observation],
    fitted: Vec<FittedPoint>,
}

#[derive(Serialize)]
struct ProjectionExport {
    threshold: f64,
    days: Option<i64>,
    date: Option<NaiveDate>,
    error: Option<String>,
}

#[derive(Serialize)]
struct RowErrorExport<'a> {
    line: usize,
    region: Option<&'a RegionCode>,
    message: &'a str,
}

/// Write `snapshot` to `path`, choosing the format by extension.
pub fn write_export(path: &Path, snapshot: &AnalysisSnapshot) -> Result<(), AppError> {
    let format = ExportFormat::from_path(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    match format {
        ExportFormat::Json => write_json_export(&mut writer, snapshot)?,
        ExportFormat::Csv => write_csv_export(&mut writer, snapshot)?,
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export '{}': {e}", path.display())))
}

pub fn write_json_export<W: Write>(writer: W, snapshot: &AnalysisSnapshot) -> Result<(), AppError> {
    let doc = ExportDocument {
        epoch: snapshot.epoch,
        metric: snapshot.metric,
        target: snapshot.target,
        as_of: snapshot.as_of(),
        regions: snapshot.regions.iter().map(region_export).collect(),
        row_errors: snapshot
            .row_errors
            .iter()
            .map(|e| RowErrorExport {
                line: e.line,
                region: e.region.as_ref(),
                message: &e.message,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(writer, &doc)
        .map_err(|e| AppError::new(4, format!("Failed to write export JSON: {e}")))
}

fn region_export(analysis: &RegionAnalysis) -> RegionExport<'_> {
    let fitted = match (&analysis.regression, &analysis.series) {
        (Ok(result), Some(series)) => fitted_values(result, series),
        _ => Vec::new(),
    };
    RegionExport {
        region: &analysis.region,
        metric: analysis.metric,
        status: analysis.status_label(),
        error: analysis.regression.as_ref().err(),
        fit: analysis.regression.as_ref().ok(),
        trend: &analysis.trend,
        growth_change: analysis.trend.growth_change(),
        projections: analysis.projections.iter().map(projection_export).collect(),
        normalization: &analysis.report,
        observations: analysis.series.as_ref().map(|s| s.observations()).unwrap_or(&[]),
        fitted,
    }
}

fn projection_export(p: &ThresholdProjection) -> ProjectionExport {
    match &p.outcome {
        Ok(day) => ProjectionExport {
            threshold: p.threshold,
            days: Some(day.days),
            date: Some(day.date),
            error: None,
        },
        Err(err) => ProjectionExport {
            threshold: p.threshold,
            days: None,
            date: None,
            error: Some(err.label().to_string()),
        },
    }
}

/// One summary row per region; projection columns follow the thresholds of
/// the first region (all regions of a run share them).
pub fn write_csv_export<W: Write>(mut writer: W, snapshot: &AnalysisSnapshot) -> Result<(), AppError> {
    let write_err = |e: std::io::Error| AppError::new(4, format!("Failed to write export CSV: {e}"));

    let thresholds: Vec<f64> = snapshot
        .regions
        .first()
        .map(|r| r.projections.iter().map(|p| p.threshold).collect())
        .unwrap_or_default();

    let mut header = String::from(
        "region,metric,status,observations,last_date,c0,growth_rate,doubling_time,r_squared,trend,growth_change",
    );
    for t in &thresholds {
        header.push_str(&format!(",days_to_{t}"));
    }
    writeln!(writer, "{header}").map_err(write_err)?;

    for a in &snapshot.regions {
        let fit = a.regression.as_ref().ok();
        let mut row = format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            a.region,
            a.metric.field_name(),
            a.status_label(),
            a.series.as_ref().map_or(0, |s| s.len()),
            fit.map(|f| f.last_date.to_string()).unwrap_or_default(),
            fmt_opt(fit.map(|f| f.c0), 4),
            fmt_opt(fit.map(|f| f.growth_rate), 6),
            fmt_opt(a.doubling_time(), 4),
            fmt_opt(fit.map(|f| f.r_squared), 4),
            a.trend.label(),
            fmt_opt(a.trend.growth_change(), 4),
        );
        for t in &thresholds {
            let days = a
                .projections
                .iter()
                .find(|p| p.threshold == *t)
                .and_then(|p| p.outcome.as_ref().ok())
                .map(|d| d.days.to_string())
                .unwrap_or_default();
            row.push(',');
            row.push_str(&days);
        }
        writeln!(writer, "{row}").map_err(write_err)?;
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.filter(|x| x.is_finite())
        .map(|x| format!("{x:.precision$}"))
        .unwrap_or_default()
}
