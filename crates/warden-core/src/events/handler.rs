//! WardenEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for handling Warden events.
///
/// Handlers only override the events they care about. `Send + Sync` because
/// scans and fix batches emit from rayon worker threads.
pub trait WardenEventHandler: Send + Sync {
    // ---- Scan Lifecycle ----
    fn on_scan_started(&self, _event: &ScanStartedEvent) {}
    fn on_violation_detected(&self, _event: &ViolationDetectedEvent) {}
    fn on_strategy_failed(&self, _event: &StrategyFailedEvent) {}
    fn on_scan_complete(&self, _event: &ScanCompleteEvent) {}

    // ---- Fix Lifecycle ----
    fn on_fix_transition(&self, _event: &FixTransitionEvent) {}
    fn on_batch_complete(&self, _event: &BatchCompleteEvent) {}
}
