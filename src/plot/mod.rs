//! Terminal charts.

pub mod sparkline;

pub use sparkline::*;
