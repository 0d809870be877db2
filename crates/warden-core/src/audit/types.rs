//! Fix decision states and audit entries.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::types::ContentHash;

/// Lifecycle state of a fix decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixState {
    Proposed,
    Validated,
    Applied,
    Confirmed,
    Rejected,
    RolledBack,
    DryRunConfirmed,
}

impl FixState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::Rejected | Self::RolledBack | Self::DryRunConfirmed
        )
    }

    /// Terminal states that count as a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed | Self::DryRunConfirmed)
    }

    /// Whether `self -> next` is an edge of the decision state machine.
    ///
    /// `Validated -> Rejected` exists only for per-file aborts (I/O failure,
    /// stale content at apply time, cancellation before application).
    pub fn can_transition_to(&self, next: FixState) -> bool {
        use FixState::*;
        matches!(
            (self, next),
            (Proposed, Validated)
                | (Proposed, Rejected)
                | (Validated, Applied)
                | (Validated, DryRunConfirmed)
                | (Validated, Rejected)
                | (Applied, Confirmed)
                | (Applied, RolledBack)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Validated => "validated",
            Self::Applied => "applied",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::RolledBack => "rolled_back",
            Self::DryRunConfirmed => "dry_run_confirmed",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "proposed" => Some(Self::Proposed),
            "validated" => Some(Self::Validated),
            "applied" => Some(Self::Applied),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            "rolled_back" => Some(Self::RolledBack),
            "dry_run_confirmed" => Some(Self::DryRunConfirmed),
            _ => None,
        }
    }
}

impl fmt::Display for FixState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Who caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Automated,
    Human,
}

impl Actor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Automated => "automated",
            Self::Human => "human",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "automated" => Some(Self::Automated),
            "human" => Some(Self::Human),
            _ => None,
        }
    }
}

/// Identity of a fix decision. Unique across batches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(pub String);

impl DecisionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One durable record of a decision transition. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Assigned by the trail on append; zero until recorded.
    pub sequence: u64,
    pub decision_id: DecisionId,
    pub candidate_id: String,
    pub batch_id: String,
    pub file: String,
    pub rule: String,
    pub from: Option<FixState>,
    pub to: FixState,
    pub reason: Option<String>,
    pub before_hash: Option<ContentHash>,
    pub after_hash: Option<ContentHash>,
    pub actor: Actor,
    pub timestamp_ms: u64,
    /// Earlier terminal decision this one corrects, if any.
    pub supersedes: Option<DecisionId>,
}

impl AuditEntry {
    /// Build an automated entry stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn transition(
        decision_id: DecisionId,
        candidate_id: impl Into<String>,
        batch_id: impl Into<String>,
        file: impl Into<String>,
        rule: impl Into<String>,
        from: Option<FixState>,
        to: FixState,
    ) -> Self {
        Self {
            sequence: 0,
            decision_id,
            candidate_id: candidate_id.into(),
            batch_id: batch_id.into(),
            file: file.into(),
            rule: rule.into(),
            from,
            to,
            reason: None,
            before_hash: None,
            after_hash: None,
            actor: Actor::Automated,
            timestamp_ms: now_ms(),
            supersedes: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_hashes(mut self, before: Option<ContentHash>, after: Option<ContentHash>) -> Self {
        self.before_hash = before;
        self.after_hash = after;
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    pub fn superseding(mut self, earlier: DecisionId) -> Self {
        self.supersedes = Some(earlier);
        self
    }
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
