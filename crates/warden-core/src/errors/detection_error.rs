//! Detection errors.

use super::error_code::{self, WardenErrorCode};

/// Errors that can occur while a detector strategy scans a file.
///
/// These never abort a scan: the scorer drops the failing strategy's
/// findings for that file and records a `StrategyFailure`.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Strategy {strategy} failed on {file}: {message}")]
    StrategyFailed {
        strategy: String,
        file: String,
        message: String,
    },

    #[error("Strategy {strategy} panicked on {file}: {message}")]
    StrategyPanic {
        strategy: String,
        file: String,
        message: String,
    },

    #[error("Invalid input for {file}: {message}")]
    InvalidInput { file: String, message: String },
}

impl WardenErrorCode for DetectionError {
    fn error_code(&self) -> &'static str {
        error_code::STRATEGY_FAILURE
    }
}
