//! Error types.
//!
//! Two layers:
//!
//! - `AnalysisError`: typed "no result" outcomes of the analysis core. These are
//!   returned as values so a presentation layer can render a neutral
//!   "not available" state instead of failing.
//! - `AppError`: exit-code carrying error for the binary and its IO glue.

use chrono::NaiveDate;
use serde::Serialize;

/// Typed analysis outcomes that prevent a result from being produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    /// Raw records were not strictly ascending by date.
    UnsortedInput {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },
    /// A single record could not be interpreted; it is dropped.
    MalformedRecord { date: u32, reason: String },
    /// Fewer usable observations than the fit requires.
    InsufficientData { usable: usize, required: usize },
    /// Fitted growth rate is flat or declining.
    NonExponentialTrend { growth_rate: f64 },
    /// Projection threshold was not a positive finite number.
    InvalidProjectionTarget { threshold: f64 },
    /// Projection requested on a fit that has no usable doubling time.
    UndefinedProjection,
    /// Too few observations to compare current and past doubling times.
    InsufficientHistory { len: usize, required: usize },
}

impl AnalysisError {
    /// Short stable label, used in reports and exports.
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisError::UnsortedInput { .. } => "unsorted input",
            AnalysisError::MalformedRecord { .. } => "malformed record",
            AnalysisError::InsufficientData { .. } => "insufficient data",
            AnalysisError::NonExponentialTrend { .. } => "non-exponential trend",
            AnalysisError::InvalidProjectionTarget { .. } => "invalid projection target",
            AnalysisError::UndefinedProjection => "undefined projection",
            AnalysisError::InsufficientHistory { .. } => "insufficient history",
        }
    }
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::UnsortedInput {
                index,
                previous,
                date,
            } => write!(
                f,
                "Records are not ascending by date: record {index} ({date}) follows {previous}."
            ),
            AnalysisError::MalformedRecord { date, reason } => {
                write!(f, "Malformed record for date {date}: {reason}")
            }
            AnalysisError::InsufficientData { usable, required } => write!(
                f,
                "Insufficient data: {usable} usable observations, {required} required."
            ),
            AnalysisError::NonExponentialTrend { growth_rate } => write!(
                f,
                "Non-exponential trend: fitted growth rate {growth_rate:.6} is not positive."
            ),
            AnalysisError::InvalidProjectionTarget { threshold } => {
                write!(f, "Invalid projection target {threshold}: must be > 0.")
            }
            AnalysisError::UndefinedProjection => {
                write!(f, "Projection undefined: fit has no valid doubling time.")
            }
            AnalysisError::InsufficientHistory { len, required } => write!(
                f,
                "Insufficient history: {len} observations, {required} required for trend comparison."
            ),
        }
    }
}

impl std::error::Error for AnalysisError {}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        let exit_code = match err {
            AnalysisError::UnsortedInput { .. }
            | AnalysisError::MalformedRecord { .. }
            | AnalysisError::InvalidProjectionTarget { .. } => 2,
            AnalysisError::InsufficientData { .. }
            | AnalysisError::NonExponentialTrend { .. }
            | AnalysisError::UndefinedProjection
            | AnalysisError::InsufficientHistory { .. } => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
