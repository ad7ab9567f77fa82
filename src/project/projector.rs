//! Projector.
//!
//! `days_until(N) = ceil(D · ln(N / c0) / ln(2) − last_time_index)`
//!
//! Rounding is upward. A negative day count means the threshold was already
//! exceeded by the model before the last observation; that is a valid answer.
//! Non-finite intermediate values are never handed to callers: they surface as
//! `UndefinedProjection`.

use chrono::NaiveDate;

use crate::domain::{ProjectedDay, RegressionResult, ThresholdProjection};
use crate::error::AnalysisError;
use crate::models::time_to_reach;

/// Projection closed over a valid exponential fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    c0: f64,
    doubling_time: f64,
    last_time_index: usize,
    last_date: NaiveDate,
}

impl Projection {
    /// Build a projection, refusing fits without a usable doubling time.
    pub fn new(result: &RegressionResult) -> Result<Self, AnalysisError> {
        let doubling_time = result
            .doubling_time
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or(AnalysisError::UndefinedProjection)?;
        if !(result.c0.is_finite() && result.c0 > 0.0) {
            return Err(AnalysisError::UndefinedProjection);
        }
        Ok(Self {
            c0: result.c0,
            doubling_time,
            last_time_index: result.last_time_index,
            last_date: result.last_date,
        })
    }

    /// Days after the last observation until the model reaches `threshold`.
    pub fn days_until(&self, threshold: f64) -> Result<i64, AnalysisError> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(AnalysisError::InvalidProjectionTarget { threshold });
        }

        let t = time_to_reach(self.c0, self.doubling_time, threshold);
        let days = (t - self.last_time_index as f64).ceil();

        // Anything outside this range cannot be a calendar offset anyway.
        if !days.is_finite() || days.abs() > i32::MAX as f64 {
            return Err(AnalysisError::UndefinedProjection);
        }
        Ok(days as i64)
    }

    /// Day count plus the calendar date it lands on.
    pub fn date_until(&self, threshold: f64) -> Result<ProjectedDay, AnalysisError> {
        let days = self.days_until(threshold)?;
        ProjectedDay::from_days(self.last_date, days).ok_or(AnalysisError::UndefinedProjection)
    }

    /// The projection as a plain `daysUntil` function.
    pub fn into_fn(self) -> impl Fn(f64) -> Result<i64, AnalysisError> {
        move |threshold| self.days_until(threshold)
    }
}

/// Project every threshold against a fit outcome.
///
/// A failed fit propagates as `UndefinedProjection` for each threshold, except
/// that invalid thresholds are always reported as such.
pub fn project_thresholds(
    regression: &Result<RegressionResult, AnalysisError>,
    thresholds: &[f64],
) -> Vec<ThresholdProjection> {
    let projection = regression
        .as_ref()
        .map_err(|_| AnalysisError::UndefinedProjection)
        .and_then(Projection::new);

    thresholds
        .iter()
        .map(|&threshold| {
            let outcome = if !(threshold.is_finite() && threshold > 0.0) {
                Err(AnalysisError::InvalidProjectionTarget { threshold })
            } else {
                projection
                    .as_ref()
                    .map_err(Clone::clone)
                    .and_then(|p| p.date_until(threshold))
            };
            ThresholdProjection { threshold, outcome }
        })
        .collect()
}
