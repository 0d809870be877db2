//! Audit trail errors.

use super::error_code::{self, WardenErrorCode};

/// Errors raised by an audit trail implementation.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit write failed for decision {decision_id}: {message}")]
    WriteFailed { decision_id: String, message: String },

    #[error("Audit read failed: {message}")]
    ReadFailed { message: String },

    #[error("Audit entry for decision {decision_id} is corrupt: {message}")]
    Corrupt { decision_id: String, message: String },
}

impl WardenErrorCode for AuditError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::WriteFailed { .. } => error_code::AUDIT_WRITE_FAILED,
            Self::ReadFailed { .. } | Self::Corrupt { .. } => error_code::AUDIT_READ_FAILED,
        }
    }
}
