//! Durable audit trail backed by SQLite.

use std::path::Path;
use std::sync::Arc;

use warden_core::audit::{AuditEntry, AuditTrail, DecisionId};
use warden_core::config::AuditConfig;
use warden_core::errors::{AuditError, StorageError};

use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::audit as q;

/// `AuditTrail` over the `audit_entries` table.
///
/// Each `record` is its own immediate transaction, so an `Ok` return means
/// the row is committed (and synced, under `synchronous = FULL`).
#[derive(Debug, Clone)]
pub struct SqliteAuditTrail {
    db: Arc<DatabaseManager>,
}

impl SqliteAuditTrail {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(DatabaseManager::open(path)?)))
    }

    pub fn open_from_config(root: &Path, config: &AuditConfig) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(DatabaseManager::open_from_config(root, config)?)))
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(DatabaseManager::open_in_memory()?)))
    }

    pub fn database(&self) -> &Arc<DatabaseManager> {
        &self.db
    }

    /// Every entry touching `file`, terminal or not.
    pub fn history_of_file(&self, file: &str) -> Result<Vec<AuditEntry>, AuditError> {
        self.db
            .with_conn(|conn| q::entries_for_file(conn, file))
            .map_err(read_failed)
    }

    pub fn len(&self) -> Result<u64, AuditError> {
        self.db.with_conn(q::count_entries).map_err(read_failed)
    }

    pub fn is_empty(&self) -> Result<bool, AuditError> {
        Ok(self.len()? == 0)
    }
}

fn read_failed(e: StorageError) -> AuditError {
    AuditError::ReadFailed {
        message: e.to_string(),
    }
}

impl AuditTrail for SqliteAuditTrail {
    fn record(&self, entry: &AuditEntry) -> Result<u64, AuditError> {
        let sequence = self
            .db
            .with_conn(|conn| with_immediate_transaction(conn, |tx| q::insert_entry(tx, entry)))
            .map_err(|e| AuditError::WriteFailed {
                decision_id: entry.decision_id.to_string(),
                message: e.to_string(),
            })?;
        tracing::trace!(
            audit_sequence = sequence,
            decision = %entry.decision_id,
            to = %entry.to,
            "audit entry recorded"
        );
        Ok(sequence)
    }

    fn replay(&self, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, AuditError> {
        self.db
            .with_conn(|conn| q::entries_for_decision(conn, decision_id))
            .map_err(read_failed)
    }

    fn find_active_by_file(&self, file: &str) -> Result<Vec<AuditEntry>, AuditError> {
        self.db
            .with_conn(|conn| q::active_for_file(conn, file))
            .map_err(read_failed)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        self.db.with_conn(q::all_entries).map_err(read_failed)
    }
}

#[cfg(test)]
mod tests {
    use warden_core::audit::{replay_state, FixState};
    use warden_core::types::ContentHash;

    use super::*;

    fn entry(id: &str, from: Option<FixState>, to: FixState) -> AuditEntry {
        AuditEntry::transition(DecisionId::new(id), "c1", "b1", "src/a.py", "no-eval", from, to)
    }

    #[test]
    fn record_and_replay_round_trip() {
        let trail = SqliteAuditTrail::in_memory().unwrap();
        let applied = entry("d1", Some(FixState::Validated), FixState::Applied)
            .with_hashes(Some(ContentHash(1)), Some(ContentHash(u64::MAX)))
            .with_reason("first edit");

        trail.record(&entry("d1", None, FixState::Proposed)).unwrap();
        trail
            .record(&entry("d1", Some(FixState::Proposed), FixState::Validated))
            .unwrap();
        let seq = trail.record(&applied).unwrap();
        assert_eq!(seq, 3);

        let history = trail.replay(&DecisionId::new("d1")).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(replay_state(&history).unwrap(), Some(FixState::Applied));
        let last = &history[2];
        assert_eq!(last.sequence, 3);
        assert_eq!(last.before_hash, Some(ContentHash(1)));
        assert_eq!(last.after_hash, Some(ContentHash(u64::MAX)));
        assert_eq!(last.reason.as_deref(), Some("first edit"));
        assert_eq!(last.timestamp_ms, applied.timestamp_ms);
    }

    #[test]
    fn active_ignores_terminal_decisions() {
        let trail = SqliteAuditTrail::in_memory().unwrap();
        trail.record(&entry("d1", None, FixState::Proposed)).unwrap();
        trail
            .record(&entry("d1", Some(FixState::Proposed), FixState::Rejected))
            .unwrap();
        trail.record(&entry("d2", None, FixState::Proposed)).unwrap();

        let active = trail.find_active_by_file("src/a.py").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].decision_id, DecisionId::new("d2"));
        assert!(trail.find_active_by_file("other.py").unwrap().is_empty());
    }
}
