//! Event payload types.

use crate::audit::FixState;
use crate::types::Severity;

/// Payload for `on_scan_started`.
#[derive(Debug, Clone)]
pub struct ScanStartedEvent {
    pub file_count: usize,
    pub strategy_count: usize,
}

/// Payload for `on_violation_detected`.
#[derive(Debug, Clone)]
pub struct ViolationDetectedEvent {
    pub violation_id: String,
    pub file: String,
    pub rule: String,
    pub severity: Severity,
    pub confidence: f64,
}

/// Payload for `on_strategy_failed`.
#[derive(Debug, Clone)]
pub struct StrategyFailedEvent {
    pub strategy: String,
    pub file: String,
    pub message: String,
}

/// Payload for `on_scan_complete`.
#[derive(Debug, Clone)]
pub struct ScanCompleteEvent {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub violations: usize,
    pub failures: usize,
    pub duration_ms: u64,
}

/// Payload for `on_fix_transition`.
#[derive(Debug, Clone)]
pub struct FixTransitionEvent {
    pub decision_id: String,
    pub file: String,
    pub rule: String,
    pub from: Option<FixState>,
    pub to: FixState,
}

/// Payload for `on_batch_complete`.
#[derive(Debug, Clone)]
pub struct BatchCompleteEvent {
    pub batch_id: String,
    pub files: usize,
    pub confirmed: usize,
    pub rejected: usize,
    pub rolled_back: usize,
    pub dry_run: bool,
}
