//! `epi-growth` library crate.
//!
//! The binary (`epi`) is a thin wrapper around this library so that:
//!
//! - the analysis core (normalize, fit, project, trend) is testable without
//!   spawning processes or touching the network
//! - sources, reports and exports stay swappable around that core

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod normalize;
pub mod plot;
pub mod project;
pub mod report;
