//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the analysis code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::AnalysisSnapshot;
use crate::domain::{RegionAnalysis, ThresholdProjection, TrendVerdict};
use crate::plot::sparkline;
use crate::report::rank_by_doubling_time;

const NOT_AVAILABLE: &str = "n/a";

/// Format the run header (source, metric, coverage).
pub fn format_run_summary(snapshot: &AnalysisSnapshot, source: &str) -> String {
    let mut out = String::new();

    out.push_str("=== epi - Exponential Growth Analysis ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Metric: {} | fitted on: {}\n",
        snapshot.metric.display_name(),
        snapshot.target.cli_name()
    ));
    out.push_str(&format!(
        "As-of: {}\n",
        snapshot
            .as_of()
            .map(|d| d.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    ));
    out.push_str(&format!(
        "Regions: n={} | with doubling time={}\n",
        snapshot.regions.len(),
        snapshot.fitted_count()
    ));
    if !snapshot.row_errors.is_empty() {
        out.push_str(&format!("Dropped input rows: {}\n", snapshot.row_errors.len()));
        for err in snapshot.row_errors.iter().take(5) {
            out.push_str(&format!("  line {}: {}\n", err.line, err.message));
        }
    }
    out
}

/// Format the detailed block for one region.
pub fn format_region_report(analysis: &RegionAnalysis, spark_width: usize) -> String {
    let mut out = String::new();

    let latest = analysis.series.as_ref().and_then(|s| s.last());
    out.push_str(&format!(
        "{} {}: latest {} (as of {})\n",
        analysis.region,
        analysis.metric.display_name(),
        latest.map_or_else(|| NOT_AVAILABLE.to_string(), |o| format!("{:.0}", o.cumulative_value)),
        latest.map_or_else(|| NOT_AVAILABLE.to_string(), |o| o.date.to_string()),
    ));

    match &analysis.regression {
        Ok(fit) => {
            out.push_str(&format!(
                "  fit: c0={:.2} growth={:.4}/day doubling={} R2={:.4} (n={})\n",
                fit.c0,
                fit.growth_rate,
                fmt_days(fit.doubling_time),
                fit.r_squared,
                fit.n_points
            ));
        }
        Err(err) => out.push_str(&format!("  fit: {NOT_AVAILABLE} ({err})\n")),
    }

    out.push_str(&format!("  trend: {}\n", fmt_trend(&analysis.trend)));

    if !analysis.projections.is_empty() {
        out.push_str("  projections:\n");
        for p in &analysis.projections {
            out.push_str(&format!("    {}\n", fmt_projection(p)));
        }
    }

    if spark_width > 0 {
        if let Some(series) = analysis.series.as_ref().filter(|s| !s.is_empty()) {
            out.push_str(&format!(
                "  daily: {}\n",
                sparkline(&series.daily_increases(), spark_width)
            ));
        }
    }

    let r = &analysis.report;
    out.push_str(&format!(
        "  input: {} records | {} malformed | {} unreported | {} filled | {} clamped | {} flat dropped\n",
        r.records_in,
        r.malformed.len(),
        r.leading_unreported,
        r.missing_filled,
        r.revisions_clamped,
        r.flat_days_dropped
    ));
    out
}

/// Format the ranking table (fastest spread first).
pub fn format_rank_table(analyses: &[RegionAnalysis]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:<8} {:>10} {:>8} {:<14} {:>10} {:>12}\n",
            "rank", "region", "doubling", "R2", "trend", "growth_chg", "latest"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<4} {:-<8} {:-<10} {:-<8} {:-<14} {:-<10} {:-<12}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for (i, a) in rank_by_doubling_time(analyses).into_iter().enumerate() {
        let rank = if a.doubling_time().is_some() {
            (i + 1).to_string()
        } else {
            "-".to_string()
        };
        let r2 = a
            .regression
            .as_ref()
            .map_or_else(|_| NOT_AVAILABLE.to_string(), |f| format!("{:.4}", f.r_squared));
        let latest = a
            .series
            .as_ref()
            .and_then(|s| s.last())
            .map_or_else(|| NOT_AVAILABLE.to_string(), |o| format!("{:.0}", o.cumulative_value));
        out.push_str(
            format!(
                "{:>4} {:<8} {:>10} {:>8} {:<14} {:>10} {:>12}\n",
                rank,
                truncate(a.region.as_str(), 8),
                fmt_days(a.doubling_time()),
                r2,
                truncate(a.trend.label(), 14),
                fmt_percent(a.trend.growth_change()),
                latest,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_trend(trend: &TrendVerdict) -> String {
    match trend {
        TrendVerdict::Accelerating { current, past } | TrendVerdict::Decelerating { current, past } => {
            format!(
                "{} (doubling {:.2}d now vs {:.2}d before, growth change {})",
                trend.label(),
                current,
                past,
                fmt_percent(trend.growth_change())
            )
        }
        TrendVerdict::Indeterminate { reason } => format!("{} ({})", trend.label(), reason.label()),
    }
}

fn fmt_projection(p: &ThresholdProjection) -> String {
    match &p.outcome {
        Ok(day) => format!("{:>12.0} -> {} ({:+} days)", p.threshold, day.date, day.days),
        Err(err) => format!("{:>12} -> {NOT_AVAILABLE} ({})", p.threshold, err.label()),
    }
}

fn fmt_days(d: Option<f64>) -> String {
    d.filter(|v| v.is_finite())
        .map(|v| format!("{v:.2}d"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn fmt_percent(v: Option<f64>) -> String {
    v.filter(|x| x.is_finite())
        .map(|x| format!("{:+.1}%", x * 100.0))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
