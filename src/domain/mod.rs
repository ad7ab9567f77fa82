//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw input records (`RawRecord`, `MetricCounts`, `Metric`, `RegionCode`)
//! - the cleaned series (`Observation`, `Series`, `NormalizePolicy`)
//! - analysis outputs (`RegressionResult`, `ProjectedDay`, `TrendVerdict`, `RegionAnalysis`)

pub mod types;

pub use types::*;
