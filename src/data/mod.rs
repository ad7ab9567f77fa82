//! Record sources.
//!
//! - `source`: the `DataSource` seam + an in-memory implementation
//! - `covidtracking`: remote per-day JSON feeds (reqwest, blocking)
//! - `sample`: seeded synthetic regions for offline runs

pub mod covidtracking;
pub mod sample;
pub mod source;

pub use covidtracking::*;
pub use sample::*;
pub use source::*;
