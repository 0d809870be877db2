//! Rule registry errors.

use super::error_code::{self, WardenErrorCode};

/// Errors raised while building the rule registry. Fatal to startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Duplicate rule: {name}")]
    DuplicateRule { name: String },

    #[error("Invalid pattern '{name}': {message}")]
    InvalidPattern { name: String, message: String },
}

impl WardenErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateRule { .. } => error_code::DUPLICATE_RULE,
            Self::InvalidPattern { .. } => error_code::INVALID_PATTERN,
        }
    }
}
