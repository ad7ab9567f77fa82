//! Exponential growth fitter.
//!
//! Given a series and a fit target, we:
//! - keep observations whose target value is strictly positive
//! - regress `ln(value_i)` on `time_index_i`
//! - map the line `a + b·t` back to `c0 = e^a`, `D = ln(2) / b`
//!
//! `R²` is the coefficient of determination of the linear fit in log space,
//! not of the exponential curve in the original space, so it is comparable
//! across series of very different magnitude.

use std::f64::consts::LN_2;

use log::debug;

use crate::domain::{FitTarget, MIN_OBSERVATIONS, RegressionResult, Series};
use crate::error::AnalysisError;
use crate::math::fit_line;

/// Fit an exponential growth model to `series`.
///
/// A flat or declining fit is still returned, with `doubling_time = None`;
/// callers that need a doubling time use `RegressionResult::doubling_time_checked`.
pub fn fit_exponential(series: &Series, target: FitTarget) -> Result<RegressionResult, AnalysisError> {
    let insufficient = |usable: usize| AnalysisError::InsufficientData {
        usable,
        required: MIN_OBSERVATIONS,
    };

    let Some(last) = series.last() else {
        return Err(insufficient(0));
    };
    if series.len() < MIN_OBSERVATIONS {
        return Err(insufficient(series.len()));
    }

    let (t, ln_y): (Vec<f64>, Vec<f64>) = series
        .observations()
        .iter()
        .filter_map(|o| {
            let v = target.value_of(o)?;
            (v.is_finite() && v > 0.0).then(|| (o.time_index as f64, v.ln()))
        })
        .unzip();

    if t.len() < MIN_OBSERVATIONS {
        return Err(insufficient(t.len()));
    }

    let line = fit_line(&t, &ln_y).ok_or_else(|| insufficient(t.len()))?;
    // Slopes within rounding of the data scale are flat, not growth.
    let span = t[t.len() - 1] - t[0];
    let scale = ln_y.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let noise_floor = 16.0 * f64::EPSILON * scale / span;
    let growth_rate = if line.slope.abs() <= noise_floor { 0.0 } else { line.slope };
    let doubling_time = (growth_rate > 0.0)
        .then(|| LN_2 / growth_rate)
        .filter(|d| d.is_finite());

    let result = RegressionResult {
        c0: line.intercept.exp(),
        growth_rate,
        doubling_time,
        r_squared: line.r_squared,
        last_time_index: last.time_index,
        last_date: last.date,
        n_points: t.len(),
        target,
    };

    debug!(
        "{}/{}: fit n={} c0={:.4} b={:.6} D={:?} R²={:.4}",
        series.region(),
        series.metric().field_name(),
        result.n_points,
        result.c0,
        result.growth_rate,
        result.doubling_time,
        result.r_squared
    );

    Ok(result)
}
