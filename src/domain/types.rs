//! Shared domain types.
//!
//! Everything produced by the analysis core is an immutable value: a `Series` is
//! rebuilt from raw records whenever new data arrives, and a `RegressionResult`
//! is recomputed from the current `Series` on every request.

use chrono::{Datelike, Duration, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Minimum number of qualifying observations required for a fit.
pub const MIN_OBSERVATIONS: usize = 5;

/// Number of most recent observations removed for the "past" trend fit.
pub const TREND_LOOKBACK: usize = 5;

/// Default projection thresholds (cumulative counts).
pub const DEFAULT_THRESHOLDS: [f64; 3] = [1.0e4, 1.0e5, 1.0e6];

/// Epidemic metric carried by a raw record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Confirmed cases.
    Positive,
    Hospitalized,
    Death,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Positive, Metric::Hospitalized, Metric::Death];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Positive => "Positives",
            Metric::Hospitalized => "Hospitalizations",
            Metric::Death => "Deaths",
        }
    }

    /// Field name used by the per-day JSON feed.
    pub fn field_name(self) -> &'static str {
        match self {
            Metric::Positive => "positive",
            Metric::Hospitalized => "hospitalized",
            Metric::Death => "death",
        }
    }
}

/// Identifier of a geographic unit (country aggregate or subdivision).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(String);

impl RegionCode {
    /// Normalizes to trimmed upper case so `ny` and `NY ` name the same region.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-metric cumulative counts of one raw record. `None` means "not reported".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCounts {
    pub positive: Option<i64>,
    pub hospitalized: Option<i64>,
    pub death: Option<i64>,
}

impl MetricCounts {
    pub fn get(&self, metric: Metric) -> Option<i64> {
        match metric {
            Metric::Positive => self.positive,
            Metric::Hospitalized => self.hospitalized,
            Metric::Death => self.death,
        }
    }

    pub fn with(mut self, metric: Metric, value: Option<i64>) -> Self {
        match metric {
            Metric::Positive => self.positive = value,
            Metric::Hospitalized => self.hospitalized = value,
            Metric::Death => self.death = value,
        }
        self
    }
}

/// A raw per-day record as delivered by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Calendar day as `YYYYMMDD`.
    pub date: u32,
    pub region: RegionCode,
    pub metrics: MetricCounts,
}

impl RawRecord {
    pub fn new(date: u32, region: RegionCode, metrics: MetricCounts) -> Self {
        Self {
            date,
            region,
            metrics,
        }
    }

    /// Single-metric convenience constructor.
    pub fn single(date: u32, region: RegionCode, metric: Metric, value: Option<i64>) -> Self {
        Self::new(date, region, MetricCounts::default().with(metric, value))
    }

    pub fn calendar_date(&self) -> Option<NaiveDate> {
        parse_date_int(self.date)
    }
}

/// Parse a `YYYYMMDD` integer into a calendar date.
///
/// Returns `None` for impossible dates such as `20200231` or `2020325`.
pub fn parse_date_int(value: u32) -> Option<NaiveDate> {
    if !(10_000_101..=99_991_231).contains(&value) {
        return None;
    }
    let year = (value / 10_000) as i32;
    let month = (value / 100) % 100;
    let day = value % 100;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Inverse of `parse_date_int`.
pub fn date_to_int(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// A cleaned observation of a `Series`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    /// Dense 0-based ordinal among the qualifying observations.
    pub time_index: usize,
    pub date: NaiveDate,
    pub cumulative_value: f64,
    /// `None` only for the first raw record, whose increase is unobservable.
    pub daily_increase: Option<f64>,
}

/// Cleaning policy of the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizePolicy {
    /// Clamp downward revisions to the running total (otherwise reset to raw).
    pub enforce_monotonic: bool,
    /// Drop records whose daily increase is not positive.
    pub drop_non_positive_increments: bool,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            enforce_monotonic: true,
            drop_non_positive_increments: true,
        }
    }
}

/// What happened to the raw records during normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub records_in: usize,
    /// Records dropped because they could not be interpreted.
    pub malformed: Vec<AnalysisError>,
    /// Records whose value was absent and carried forward.
    pub missing_filled: usize,
    /// Leading records without a value (nothing to carry forward yet).
    pub leading_unreported: usize,
    /// Records whose raw value was below the running total.
    pub revisions_clamped: usize,
    /// Records dropped for carrying no new signal.
    pub flat_days_dropped: usize,
}

/// Cleaned, strictly time-ordered series for one `(region, metric)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    region: RegionCode,
    metric: Metric,
    observations: Vec<Observation>,
}

impl Series {
    pub(crate) fn from_parts(
        region: RegionCode,
        metric: Metric,
        observations: Vec<Observation>,
    ) -> Self {
        Self {
            region,
            metric,
            observations,
        }
    }

    pub fn region(&self) -> &RegionCode {
        &self.region
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// A series shorter than `MIN_OBSERVATIONS` is marked insufficient.
    pub fn is_analyzable(&self) -> bool {
        self.len() >= MIN_OBSERVATIONS
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// A new series without the most recent `k` observations.
    pub fn truncated(&self, k: usize) -> Series {
        let keep = self.len().saturating_sub(k);
        Series {
            region: self.region.clone(),
            metric: self.metric,
            observations: self.observations[..keep].to_vec(),
        }
    }

    /// Daily increases in chronological order (undefined increases as 0).
    pub fn daily_increases(&self) -> Vec<f64> {
        self.observations
            .iter()
            .map(|o| o.daily_increase.unwrap_or(0.0))
            .collect()
    }

    /// Re-express the series as raw records.
    ///
    /// When the first observation carries an increase, a baseline record holding
    /// the preceding total is emitted the day before it, so normalizing the
    /// output again reproduces this series.
    pub fn to_raw_records(&self) -> Vec<RawRecord> {
        let mut out = Vec::with_capacity(self.len() + 1);
        if let Some(first) = self.first() {
            if let (Some(inc), Some(prev_day)) = (first.daily_increase, first.date.pred_opt()) {
                out.push(self.raw_record(prev_day, first.cumulative_value - inc));
            }
        }
        for o in &self.observations {
            out.push(self.raw_record(o.date, o.cumulative_value));
        }
        out
    }

    fn raw_record(&self, date: NaiveDate, value: f64) -> RawRecord {
        RawRecord::single(
            date_to_int(date),
            self.region.clone(),
            self.metric,
            Some(value.round() as i64),
        )
    }
}

/// Which per-observation value the regression is fitted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FitTarget {
    /// Running total reported to date.
    #[default]
    Cumulative,
    /// Day-over-day incidence.
    DailyIncrease,
}

impl FitTarget {
    /// Name as spelled on the command line and in exports.
    pub fn cli_name(self) -> &'static str {
        match self {
            FitTarget::Cumulative => "cumulative",
            FitTarget::DailyIncrease => "daily-increase",
        }
    }

    pub fn value_of(self, obs: &Observation) -> Option<f64> {
        match self {
            FitTarget::Cumulative => Some(obs.cumulative_value),
            FitTarget::DailyIncrease => obs.daily_increase,
        }
    }
}

/// Exponential-growth fit `value(t) = c0 · 2^(t / doubling_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionResult {
    pub c0: f64,
    /// Slope `b` of `ln(value)` on `t`.
    pub growth_rate: f64,
    /// `None` when the fitted trend is not exponential growth (`b <= 0`).
    pub doubling_time: Option<f64>,
    /// Coefficient of determination of the log-linear fit, in `[0, 1]`.
    pub r_squared: f64,
    pub last_time_index: usize,
    pub last_date: NaiveDate,
    pub n_points: usize,
    pub target: FitTarget,
}

impl RegressionResult {
    pub fn is_exponential(&self) -> bool {
        self.doubling_time.is_some()
    }

    /// Doubling time, or `NonExponentialTrend` if the fit has none.
    pub fn doubling_time_checked(&self) -> Result<f64, AnalysisError> {
        self.doubling_time
            .ok_or(AnalysisError::NonExponentialTrend {
                growth_rate: self.growth_rate,
            })
    }
}

/// Projected arrival of a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectedDay {
    /// Days after the last observation (negative if already exceeded).
    pub days: i64,
    pub date: NaiveDate,
}

impl ProjectedDay {
    pub fn from_days(last_date: NaiveDate, days: i64) -> Option<Self> {
        let date = last_date.checked_add_signed(Duration::try_days(days)?)?;
        Some(Self { days, date })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdProjection {
    pub threshold: f64,
    pub outcome: Result<ProjectedDay, AnalysisError>,
}

/// Acceleration verdict of the trend comparator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TrendVerdict {
    /// Doubling time shrank or held (`current <= past`).
    Accelerating { current: f64, past: f64 },
    /// Doubling takes longer than it used to (`current > past`).
    Decelerating { current: f64, past: f64 },
    Indeterminate { reason: AnalysisError },
}

impl TrendVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            TrendVerdict::Accelerating { .. } => "accelerating",
            TrendVerdict::Decelerating { .. } => "decelerating",
            TrendVerdict::Indeterminate { .. } => "indeterminate",
        }
    }

    /// Relative change of the growth rate, `past / current - 1`.
    ///
    /// Positive when spread is accelerating.
    pub fn growth_change(&self) -> Option<f64> {
        match self {
            TrendVerdict::Accelerating { current, past }
            | TrendVerdict::Decelerating { current, past } => Some(past / current - 1.0),
            TrendVerdict::Indeterminate { .. } => None,
        }
    }
}

/// Analysis configuration for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub metric: Metric,
    pub policy: NormalizePolicy,
    pub target: FitTarget,
    pub thresholds: Vec<f64>,
    pub trend_lookback: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Positive,
            policy: NormalizePolicy::default(),
            target: FitTarget::default(),
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            trend_lookback: TREND_LOOKBACK,
        }
    }
}

/// Complete analysis of one region for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAnalysis {
    pub region: RegionCode,
    pub metric: Metric,
    /// `None` when normalization failed (see `regression` for the reason).
    pub series: Option<Series>,
    pub report: NormalizeReport,
    pub regression: Result<RegressionResult, AnalysisError>,
    pub projections: Vec<ThresholdProjection>,
    pub trend: TrendVerdict,
}

impl RegionAnalysis {
    pub fn doubling_time(&self) -> Option<f64> {
        self.regression.as_ref().ok().and_then(|r| r.doubling_time)
    }

    /// Short outcome label: `ok`, or the reason no doubling time exists.
    pub fn status_label(&self) -> &'static str {
        match &self.regression {
            Ok(r) if r.doubling_time.is_some() => "ok",
            Ok(_) => "non-exponential trend",
            Err(err) => err.label(),
        }
    }
}

#[cfg(test)]
pub(crate) fn series_from_values(values: &[f64]) -> Series {
    let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
    let mut prev: Option<f64> = None;
    let observations = values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let obs = Observation {
                time_index: i,
                date: start + Duration::days(i as i64),
                cumulative_value: v,
                daily_increase: prev.map(|p| v - p),
            };
            prev = Some(v);
            obs
        })
        .collect();
    Series::from_parts(RegionCode::new("XX"), Metric::Positive, observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_target_cli_name_matches_serde_and_clap() {
        for target in [FitTarget::Cumulative, FitTarget::DailyIncrease] {
            let json = serde_json::to_string(&target).unwrap();
            assert_eq!(json, format!("\"{}\"", target.cli_name()));
            let value = target.to_possible_value().unwrap();
            assert_eq!(value.get_name(), target.cli_name());
        }
    }

    #[test]
    fn parse_date_int_accepts_real_days_only() {
        assert_eq!(
            parse_date_int(20200325),
            NaiveDate::from_ymd_opt(2020, 3, 25)
        );
        assert_eq!(parse_date_int(20200229), NaiveDate::from_ymd_opt(2020, 2, 29));
        assert!(parse_date_int(20190229).is_none());
        assert!(parse_date_int(20201301).is_none());
        assert!(parse_date_int(2020325).is_none());
        assert!(parse_date_int(0).is_none());
    }

    #[test]
    fn date_int_round_trips() {
        let d = NaiveDate::from_ymd_opt(2021, 12, 7).unwrap();
        assert_eq!(date_to_int(d), 20211207);
        assert_eq!(parse_date_int(date_to_int(d)), Some(d));
    }

    #[test]
    fn region_code_is_normalized() {
        assert_eq!(RegionCode::new(" ny "), RegionCode::new("NY"));
        assert_eq!(RegionCode::new("us").as_str(), "US");
    }

    #[test]
    fn truncated_drops_most_recent_observations() {
        let s = series_from_values(&[1.0, 2.0, 4.0, 8.0, 16.0, 32.0]);
        let t = s.truncated(2);
        assert_eq!(t.len(), 4);
        assert_eq!(t.last().unwrap().cumulative_value, 8.0);
        assert_eq!(s.len(), 6);
        assert!(s.truncated(10).is_empty());
    }

    #[test]
    fn growth_change_sign_follows_verdict() {
        let acc = TrendVerdict::Accelerating {
            current: 2.0,
            past: 3.0,
        };
        assert!(acc.growth_change().unwrap() > 0.0);
        let dec = TrendVerdict::Decelerating {
            current: 4.0,
            past: 2.0,
        };
        assert!((dec.growth_change().unwrap() + 0.5).abs() < 1e-12);
    }
}
