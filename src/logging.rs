//! Logger setup for the binary.
//!
//! Logs go to stderr so stdout stays reserved for reports. `RUST_LOG`, when
//! set, overrides the verbosity flag.

use env_logger::{Builder, Env, Target};

/// Default filter for a `-v` count.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn init(verbosity: u8) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter(verbosity)));
    builder.target(Target::Stderr).format_timestamp(None);
    // A second init (e.g. from tests) keeps the first logger.
    let _ = builder.try_init();
}
