//! Exponential growth model evaluation.
//!
//! Kept as small, pure functions so that fitting, projection and charting code
//! share one definition of the curve.

pub mod model;

pub use model::*;
