//! Error types for the linksim system.
//!
//! All operations return structured errors rather than panicking. Parsing
//! failures and configuration failures are kept apart so callers can tell a
//! broken model file from an unrunnable timeline.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Parse: a channel model record is short or malformed
/// - Config: a timeline or model cannot be simulated
/// - Catalog: a file in the model directory failed to parse or read
/// - CSV: an exported catalog could not be read back
/// - I/O: file system operations
#[derive(Debug, Error)]
pub enum Error {
    /// Channel model record could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Simulation configuration is not runnable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigurationError),

    /// A catalog file failed to parse
    #[error("invalid model file {}: {source}", .path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A catalog file could not be inspected or read
    #[error("cannot read model file {}: {source}", .path.display())]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV row when re-importing an exported catalog
    #[error("CSV error at line {line}: {reason}")]
    Csv { line: usize, reason: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel model record errors.
///
/// Line numbers are 1-based, matching what an editor shows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Record ended before the given field
    #[error("missing line {line} ({field})")]
    MissingLine { line: usize, field: &'static str },

    /// Line has no `key = value` separator
    #[error("line {line} ({field}) is not a `key = value` pair")]
    MissingSeparator { line: usize, field: &'static str },

    /// Numeric field could not be parsed or is not finite
    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Simulation configuration errors.
///
/// These are checked before any step runs, so a failed run never yields a
/// partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Timeline has no intervals
    #[error("timeline is empty")]
    EmptyTimeline,

    /// Interval duration must be a positive number of milliseconds
    #[error("interval duration must be positive")]
    ZeroDuration,

    /// Slot duration must be positive and finite
    #[error("model {title:?} has invalid tx time {tx_time_ms} ms")]
    InvalidTxTime { title: String, tx_time_ms: f64 },

    /// Transition probability outside [0, 1]
    #[error("model {title:?} has {field} = {value} outside [0, 1]")]
    ProbabilityOutOfRange {
        title: String,
        field: &'static str,
        value: f64,
    },

    /// Both transitions out of a state have zero weight
    #[error("model {title:?} has no outgoing weight from state {state}")]
    DegenerateRow { title: String, state: u8 },

    /// Total step count exceeds the caller's ceiling
    #[error("timeline needs {steps} steps, limit is {max_steps}")]
    StepLimitExceeded { steps: u64, max_steps: u64 },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
