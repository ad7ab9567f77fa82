//! Model evaluation for `value(t) = c0 · 2^(t / D)`.
//!
//! Two primitive operations:
//! - predict the modeled value at a time index
//! - invert the model: the (fractional) time index at which a value is reached
//!
//! plus a fitted curve over a series for charting (value and fitted
//! day-over-day change).

use serde::Serialize;

use crate::domain::{RegressionResult, Series};

/// Modeled value at time index `t`.
pub fn predict(c0: f64, doubling_time: f64, t: f64) -> f64 {
    c0 * (t / doubling_time).exp2()
}

/// Fractional time index at which the model reaches `value`.
///
/// `t = D · ln(value / c0) / ln(2)`, evaluated as `D · log2(value / c0)`.
pub fn time_to_reach(c0: f64, doubling_time: f64, value: f64) -> f64 {
    doubling_time * (value / c0).log2()
}

/// One point of a fitted curve aligned with a series observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FittedPoint {
    pub time_index: usize,
    pub fit: f64,
    /// Fitted change from the previous time index (`None` at index 0).
    pub change_fit: Option<f64>,
}

/// Fitted values for every observation of `series`.
///
/// Returns an empty curve when the fit has no doubling time.
pub fn fitted_values(result: &RegressionResult, series: &Series) -> Vec<FittedPoint> {
    let Some(d) = result.doubling_time else {
        return Vec::new();
    };

    series
        .observations()
        .iter()
        .map(|o| {
            let t = o.time_index as f64;
            let fit = predict(result.c0, d, t);
            let change_fit = (o.time_index > 0).then(|| fit - predict(result.c0, d, t - 1.0));
            FittedPoint {
                time_index: o.time_index,
                fit,
                change_fit,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_doubles_every_doubling_time() {
        let y0 = predict(3.0, 2.5, 4.0);
        let y1 = predict(3.0, 2.5, 6.5);
        assert!((y1 / y0 - 2.0).abs() < 1e-12);
        assert!((predict(3.0, 2.5, 0.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn time_to_reach_inverts_predict() {
        let t = time_to_reach(7.0, 3.0, predict(7.0, 3.0, 11.25));
        assert!((t - 11.25).abs() < 1e-9);
    }

    #[test]
    fn fitted_values_follow_the_curve() {
        let series = crate::domain::series_from_values(&[1.0, 2.0, 4.0, 8.0, 16.0]);
        let result = crate::fit::fit_exponential(&series, crate::domain::FitTarget::Cumulative).unwrap();
        let curve = fitted_values(&result, &series);
        assert_eq!(curve.len(), 5);
        assert!(curve[0].change_fit.is_none());
        assert!((curve[4].fit - 16.0).abs() < 1e-6);
        assert!((curve[4].change_fit.unwrap() - 8.0).abs() < 1e-6);
    }
}
