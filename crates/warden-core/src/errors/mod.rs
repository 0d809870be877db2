//! Error handling for Warden.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod audit_error;
pub mod config_error;
pub mod detection_error;
pub mod error_code;
pub mod fix_error;
pub mod parse_error;
pub mod registry_error;
pub mod storage_error;

pub use audit_error::AuditError;
pub use config_error::ConfigError;
pub use detection_error::DetectionError;
pub use error_code::WardenErrorCode;
pub use fix_error::FixError;
pub use parse_error::ParseError;
pub use registry_error::RegistryError;
pub use storage_error::StorageError;
