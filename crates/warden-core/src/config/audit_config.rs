//! Audit trail configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the durable audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// SQLite database path, relative to the project root. Default: ".warden/audit.db".
    pub db_path: Option<String>,
    /// Use `synchronous = FULL` for every append. Default: true.
    pub synchronous_full: Option<bool>,
}

impl AuditConfig {
    pub fn effective_db_path(&self) -> &str {
        self.db_path.as_deref().unwrap_or(".warden/audit.db")
    }

    pub fn effective_synchronous_full(&self) -> bool {
        self.synchronous_full.unwrap_or(true)
    }
}
