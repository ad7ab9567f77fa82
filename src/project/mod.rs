//! Threshold projection: when does the fitted curve reach `N`?

pub mod projector;

pub use projector::*;
