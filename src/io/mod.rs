//! Input/output helpers.
//!
//! - per-day JSON and wide CSV ingest (`ingest`)
//! - analysis exports (JSON/CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
