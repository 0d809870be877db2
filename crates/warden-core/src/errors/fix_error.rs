//! Fix application errors.

use std::path::PathBuf;

use super::error_code::{self, WardenErrorCode};
use super::AuditError;

/// Hard failures during fix orchestration.
///
/// Validation outcomes (stale context, conflicts, policy exclusions) are not
/// errors; they are `Rejected` decisions.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("I/O error applying fix to {path}: {source}")]
    ApplyIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Verification failed for {path}: {message}")]
    VerificationFailure { path: PathBuf, message: String },

    #[error("Audit trail write failed, batch halted: {0}")]
    AuditWrite(#[from] AuditError),

    #[error("Illegal transition {from} -> {to} for decision {decision_id}")]
    IllegalTransition {
        decision_id: String,
        from: String,
        to: String,
    },

    #[error("Fix batch cancelled")]
    Cancelled,
}

impl FixError {
    /// Returns true when the error must halt the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuditWrite(_))
    }
}

impl WardenErrorCode for FixError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ApplyIo { .. } => error_code::APPLY_IO_ERROR,
            Self::VerificationFailure { .. } => error_code::VERIFICATION_FAILURE,
            Self::AuditWrite(_) => error_code::AUDIT_WRITE_FAILED,
            Self::IllegalTransition { .. } => error_code::ILLEGAL_TRANSITION,
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}
