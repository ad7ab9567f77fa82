//! Raw record cleaning.
//!
//! Turns ascending per-day records into a monotonic cumulative `Series` with
//! derived daily increases.

pub mod normalizer;

pub use normalizer::*;
