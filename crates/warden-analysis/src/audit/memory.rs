//! Process-local audit trail, for tests and dry runs.

use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;

use warden_core::audit::{AuditEntry, AuditTrail, DecisionId};
use warden_core::errors::AuditError;

/// Append-only trail held in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryAuditTrail {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditTrail for InMemoryAuditTrail {
    fn record(&self, entry: &AuditEntry) -> Result<u64, AuditError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = entries.len() as u64 + 1;
        let mut stored = entry.clone();
        stored.sequence = sequence;
        entries.push(stored);
        Ok(sequence)
    }

    fn replay(&self, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|e| &e.decision_id == decision_id)
            .cloned()
            .collect())
    }

    fn find_active_by_file(&self, file: &str) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut latest: FxHashMap<&DecisionId, &AuditEntry> = FxHashMap::default();
        for entry in entries.iter().filter(|e| e.file == file) {
            latest.insert(&entry.decision_id, entry);
        }
        let mut active: Vec<AuditEntry> = latest
            .into_values()
            .filter(|e| !e.to.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|e| e.sequence);
        Ok(active)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
