//! Error types for the gaze dwell library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Smoother or filter construction error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Calibration solver options were invalid
    #[error("Calibration error: {0}")]
    CalibrationError(String),

    /// Sample trace could not be parsed
    #[error("Trace parse error on line {line}: {msg}")]
    TraceParse {
        /// 1-based line number in the trace file
        line: usize,
        /// What went wrong
        msg: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
