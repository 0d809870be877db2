//! Fix decision state machine.

use warden_core::audit::{AuditEntry, DecisionId, FixState};
use warden_core::errors::FixError;

use super::{FixCandidate, RejectReason};

/// Lifecycle record of one candidate within a batch.
///
/// `prepare` builds the audit entry for a transition and refuses illegal
/// ones; `commit` moves the state only after the entry is durable.
#[derive(Debug, Clone)]
pub struct FixDecision {
    pub id: DecisionId,
    pub batch_id: String,
    pub candidate: FixCandidate,
    pub reason: Option<RejectReason>,
    state: Option<FixState>,
}

impl FixDecision {
    pub fn new(batch_id: &str, candidate: FixCandidate) -> Self {
        Self {
            id: DecisionId::new(format!("{batch_id}:{}", candidate.id)),
            batch_id: batch_id.to_string(),
            candidate,
            reason: None,
            state: None,
        }
    }

    /// `None` until the `Proposed` entry is recorded.
    pub fn state(&self) -> Option<FixState> {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_some_and(|s| s.is_terminal())
    }

    pub fn can_transition_to(&self, to: FixState) -> bool {
        match self.state {
            None => to == FixState::Proposed,
            Some(current) => current.can_transition_to(to),
        }
    }

    /// Audit entry for `self.state -> to`.
    pub fn prepare(&self, to: FixState) -> Result<AuditEntry, FixError> {
        if !self.can_transition_to(to) {
            return Err(FixError::IllegalTransition {
                decision_id: self.id.to_string(),
                from: self
                    .state
                    .map_or_else(|| "none".to_string(), |s| s.name().to_string()),
                to: to.name().to_string(),
            });
        }
        Ok(AuditEntry::transition(
            self.id.clone(),
            self.candidate.id.clone(),
            self.batch_id.clone(),
            self.candidate.file.clone(),
            self.candidate.rule.clone(),
            self.state,
            to,
        ))
    }

    pub fn commit(&mut self, to: FixState) {
        self.state = Some(to);
    }
}
