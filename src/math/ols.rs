//! Least squares line fitting.
//!
//! The exponential model `value(t) = c0 · 2^(t / D)` is linear in log space:
//!
//! ```text
//! ln(value) = a + b·t,   c0 = e^a,   D = ln(2) / b
//! ```
//!
//! so every fit in this crate reduces to a straight-line regression of
//! `y_i = ln(value_i)` on `x_i = t_i`.
//!
//! Implementation choices:
//! - The design matrix `[1, x_i]` is solved with SVD, which stays well defined
//!   for tall matrices and reports rank deficiency (all `x_i` equal) instead of
//!   returning garbage.
//! - Sums for `R²` are accumulated in input order, so fitting the same data
//!   twice is bit-identical.

use nalgebra::{DMatrix, DVector};

/// Straight-line fit `y = intercept + slope · x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    /// `1 - SS_res / SS_tot`, clamped to `[0, 1]`.
    pub r_squared: f64,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit a straight line through `(x_i, y_i)`.
///
/// Returns `None` for fewer than two points, mismatched lengths, non-finite
/// inputs, or when all `x_i` coincide (slope unidentified).
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LineFit> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }
    if x.iter().all(|&v| v == x[0]) {
        return None;
    }
    // Constant y: the SVD solve leaves rounding noise in the slope.
    if y.iter().all(|&v| v == y[0]) {
        return Some(LineFit {
            intercept: y[0],
            slope: 0.0,
            r_squared: 1.0,
        });
    }

    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = xi;
    }
    let rhs = DVector::from_column_slice(y);

    let beta = solve_least_squares(&design, &rhs)?;
    let intercept = beta[0];
    let slope = beta[1];

    Some(LineFit {
        intercept,
        slope,
        r_squared: r_squared(x, y, intercept, slope),
    })
}

/// Coefficient of determination of a straight line over `(x_i, y_i)`.
pub fn r_squared(x: &[f64], y: &[f64], intercept: f64, slope: f64) -> f64 {
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let r = yi - (intercept + slope * xi);
        ss_res += r * r;
        let d = yi - mean;
        ss_tot += d * d;
    }

    if ss_tot <= 0.0 {
        // Constant y: the fit is exact iff the residuals vanish.
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| -1.5 + 0.25 * v).collect();
        let fit = fit_line(&x, &y).unwrap();
        assert!((fit.intercept + 1.5).abs() < 1e-10);
        assert!((fit.slope - 0.25).abs() < 1e-10);
        assert!((fit.r_squared - 1.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_rejects_degenerate_inputs() {
        assert!(fit_line(&[1.0], &[1.0]).is_none());
        assert!(fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(fit_line(&[0.0, 1.0], &[f64::NAN, 1.0]).is_none());
        assert!(fit_line(&[0.0, 1.0, 2.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn constant_y_gives_an_exactly_flat_line() {
        for n in 2..40 {
            let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
            for c in [0.0, 1.0, 2.0_f64.ln(), 7.0_f64.ln(), 1999.0_f64.ln()] {
                let fit = fit_line(&x, &vec![c; n]).unwrap();
                assert_eq!(fit.slope, 0.0, "n={n} c={c}");
                assert_eq!(fit.intercept, c);
                assert_eq!(fit.r_squared, 1.0);
            }
        }
    }

    #[test]
    fn r_squared_drops_with_noise() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0, 1.3, 1.7, 3.4, 3.6, 5.2];
        let fit = fit_line(&x, &y).unwrap();
        assert!(fit.r_squared > 0.8 && fit.r_squared < 1.0);
    }

    #[test]
    fn fitting_twice_is_bit_identical() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [0.1, 0.9, 2.2, 2.8, 4.1, 5.3, 5.9];
        assert_eq!(fit_line(&x, &y), fit_line(&x, &y));
    }
}
