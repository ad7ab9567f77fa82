//! Trend comparator: is spread accelerating or decelerating?
//!
//! Compares the doubling time fitted on the full series (`current`) with the
//! one fitted on the series minus its most recent `lookback` observations
//! (`past`). A longer current doubling time means growth is slowing.

use crate::domain::{FitTarget, MIN_OBSERVATIONS, Series, TrendVerdict};
use crate::error::AnalysisError;
use crate::fit::fitter::fit_exponential;

/// Compare current and past doubling times of `series`.
///
/// Needs `lookback + MIN_OBSERVATIONS` observations; either fit lacking a
/// doubling time yields `Indeterminate` rather than a guessed direction.
/// `lookback == 0` has no past window, so no history ever suffices.
pub fn compare_trend(series: &Series, target: FitTarget, lookback: usize) -> TrendVerdict {
    let required = match lookback {
        0 => usize::MAX,
        k => k.saturating_add(MIN_OBSERVATIONS),
    };
    if series.len() < required {
        return TrendVerdict::Indeterminate {
            reason: AnalysisError::InsufficientHistory {
                len: series.len(),
                required,
            },
        };
    }

    let doubling = |s: &Series| fit_exponential(s, target).and_then(|r| r.doubling_time_checked());

    let current = match doubling(series) {
        Ok(d) => d,
        Err(reason) => return TrendVerdict::Indeterminate { reason },
    };
    let past = match doubling(&series.truncated(lookback)) {
        Ok(d) => d,
        Err(reason) => return TrendVerdict::Indeterminate { reason },
    };

    if current > past {
        TrendVerdict::Decelerating { current, past }
    } else {
        TrendVerdict::Accelerating { current, past }
    }
}
