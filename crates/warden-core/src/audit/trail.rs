//! AuditTrail trait: the append-only ledger contract.
//!
//! The orchestrator depends on the trait; `warden-analysis` ships an
//! in-memory implementation and `warden-storage` a SQLite one.

use crate::errors::AuditError;

use super::types::{AuditEntry, DecisionId, FixState};

/// Append-only ledger of fix decision transitions.
///
/// Implementations must accept concurrent `record` calls from different
/// files' orchestration tasks. A returned `Ok` means the entry is durable.
pub trait AuditTrail: Send + Sync {
    /// Append an entry, returning its assigned sequence number.
    fn record(&self, entry: &AuditEntry) -> Result<u64, AuditError>;

    /// Full transition history of one decision, in append order.
    fn replay(&self, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, AuditError>;

    /// Latest entry of every decision on `file` whose last state is not terminal.
    fn find_active_by_file(&self, file: &str) -> Result<Vec<AuditEntry>, AuditError>;

    /// Every recorded entry, in append order.
    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Check that a replayed history forms a legal chain and return its final state.
///
/// Returns `None` for an empty history.
pub fn replay_state(history: &[AuditEntry]) -> Result<Option<FixState>, AuditError> {
    let mut current: Option<FixState> = None;
    for entry in history {
        let legal = match (current, entry.from) {
            (None, None) => entry.to == FixState::Proposed,
            (Some(cur), Some(from)) => cur == from && cur.can_transition_to(entry.to),
            _ => false,
        };
        if !legal {
            return Err(AuditError::Corrupt {
                decision_id: entry.decision_id.to_string(),
                message: format!(
                    "entry #{} ({:?} -> {}) does not follow {:?}",
                    entry.sequence, entry.from, entry.to, current
                ),
            });
        }
        current = Some(entry.to);
    }
    Ok(current)
}
