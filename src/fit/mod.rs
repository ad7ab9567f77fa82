//! Growth fitting.
//!
//! Responsibilities:
//!
//! - fit `value(t) = c0 · 2^(t / D)` to a series (log-linear OLS)
//! - compare the current doubling time against the one from `lookback`
//!   observations earlier (acceleration / deceleration)

pub mod fitter;
pub mod trend;

pub use fitter::*;
pub use trend::*;
