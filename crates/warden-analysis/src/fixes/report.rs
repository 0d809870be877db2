//! Batch and recovery reports.

use serde::{Deserialize, Serialize};

use warden_core::audit::FixState;

use super::{FixDecision, RejectReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Completed,
    /// An I/O failure or a pending recovery stopped the file's candidates.
    Aborted { cause: String },
    /// Cancelled before the file was started.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionReport {
    pub decision_id: String,
    pub candidate_id: String,
    pub rule: String,
    pub state: FixState,
    pub reason: Option<RejectReason>,
}

impl From<&FixDecision> for DecisionReport {
    fn from(d: &FixDecision) -> Self {
        Self {
            decision_id: d.id.to_string(),
            candidate_id: d.candidate.id.clone(),
            rule: d.candidate.rule.clone(),
            state: d.state().unwrap_or(FixState::Proposed),
            reason: d.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub outcome: FileOutcome,
    pub decisions: Vec<DecisionReport>,
}

impl FileReport {
    pub fn new(file: String, outcome: FileOutcome, decisions: &[FixDecision]) -> Self {
        Self {
            file,
            outcome,
            decisions: decisions.iter().map(DecisionReport::from).collect(),
        }
    }
}

/// Outcome of one fix batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub dry_run: bool,
    /// Sorted by file path.
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn decisions(&self) -> impl Iterator<Item = &DecisionReport> {
        self.files.iter().flat_map(|f| f.decisions.iter())
    }

    pub fn decision_for(&self, candidate_id: &str) -> Option<&DecisionReport> {
        self.decisions().find(|d| d.candidate_id == candidate_id)
    }

    pub fn count(&self, state: FixState) -> usize {
        self.decisions().filter(|d| d.state == state).count()
    }

    pub fn confirmed(&self) -> usize {
        self.count(FixState::Confirmed)
    }

    pub fn rejected(&self) -> usize {
        self.count(FixState::Rejected)
    }

    pub fn rolled_back(&self) -> usize {
        self.count(FixState::RolledBack)
    }

    pub fn dry_run_confirmed(&self) -> usize {
        self.count(FixState::DryRunConfirmed)
    }

    /// True when every requested fix reached a successful terminal state
    /// (`Confirmed`, or `DryRunConfirmed` in a dry run).
    pub fn all_succeeded(&self) -> bool {
        self.decisions().all(|d| d.state.is_success())
    }
}

/// Outcome of recovering one file from a leftover backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub file: String,
    pub backup_found: bool,
    /// The file content was replaced from the backup.
    pub restored: bool,
    pub rolled_back: usize,
    pub interrupted: usize,
    /// Confirmed decisions undone by the restore, recorded as superseding
    /// decisions.
    pub superseded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(id: &str, state: FixState) -> DecisionReport {
        DecisionReport {
            decision_id: format!("b:{id}"),
            candidate_id: id.to_string(),
            rule: "r".to_string(),
            state,
            reason: None,
        }
    }

    fn batch(states: &[FixState]) -> BatchReport {
        BatchReport {
            batch_id: "b".to_string(),
            dry_run: false,
            files: vec![FileReport {
                file: "a.py".to_string(),
                outcome: FileOutcome::Completed,
                decisions: states
                    .iter()
                    .enumerate()
                    .map(|(i, s)| decision(&i.to_string(), *s))
                    .collect(),
            }],
        }
    }

    #[test]
    fn all_rejected_is_not_success() {
        assert!(!batch(&[FixState::Rejected]).all_succeeded());
    }

    #[test]
    fn confirmed_and_dry_run_confirmed_succeed() {
        assert!(batch(&[FixState::Confirmed, FixState::DryRunConfirmed]).all_succeeded());
        assert!(!batch(&[FixState::Confirmed, FixState::RolledBack]).all_succeeded());
    }
}
