//! Structured span field names.
//!
//! Shared across subsystems so log queries can rely on stable keys.

/// Ensemble: files scanned in a run.
pub const FILES_SCANNED: &str = "files_scanned";

/// Ensemble: violations emitted after merging.
pub const VIOLATION_COUNT: &str = "violation_count";

/// Ensemble: strategy failures recorded in a run.
pub const STRATEGY_FAILURES: &str = "strategy_failures";

/// Strategies: wall-clock per (file, strategy) in microseconds.
pub const STRATEGY_TIME_US: &str = "strategy_time_us";

/// Fixes: candidates submitted to a batch.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Fixes: batch identifier.
pub const BATCH_ID: &str = "batch_id";

/// Audit: sequence number of an appended entry.
pub const AUDIT_SEQUENCE: &str = "audit_sequence";
