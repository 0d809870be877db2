//! WardenErrorCode trait for the collaborator boundary.

/// Trait for converting Warden errors to stable error codes.
/// Every error enum implements this so the reporting collaborator can
/// branch on a code instead of parsing messages.
pub trait WardenErrorCode {
    /// Returns the error code string (e.g., "AUDIT_WRITE_FAILED").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted boundary string: `[ERROR_CODE] message`.
    fn boundary_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const DUPLICATE_RULE: &str = "DUPLICATE_RULE";
pub const INVALID_PATTERN: &str = "INVALID_PATTERN";
pub const STRATEGY_FAILURE: &str = "STRATEGY_FAILURE";
pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const UNSUPPORTED_LANGUAGE: &str = "UNSUPPORTED_LANGUAGE";
pub const APPLY_IO_ERROR: &str = "APPLY_IO_ERROR";
pub const VERIFICATION_FAILURE: &str = "VERIFICATION_FAILURE";
pub const AUDIT_WRITE_FAILED: &str = "AUDIT_WRITE_FAILED";
pub const AUDIT_READ_FAILED: &str = "AUDIT_READ_FAILED";
pub const ILLEGAL_TRANSITION: &str = "ILLEGAL_TRANSITION";
pub const CANCELLED: &str = "CANCELLED";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
