//! Fix context analyzer: staleness, conflict and policy checks.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use warden_core::config::FixPolicy;
use warden_core::types::{ContentHash, SafetyClass, Severity, Span};

use super::FixCandidate;

/// How a conflict between two overlapping candidates was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    HigherSeverity,
    SimplerFix,
    /// Same severity and safety class: both rejected.
    ManualReview,
}

/// Which policy clause excluded a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "clause", rename_all = "snake_case")]
pub enum PolicyClause {
    SafetyClass { class: SafetyClass, max: SafetyClass },
    Confidence { confidence: f64, min: f64 },
    ExcludedPath { pattern: String },
}

/// Why a candidate did not reach `Applied`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    StaleContext,
    ConflictRejected {
        against: String,
        resolution: ConflictResolution,
    },
    PolicyExcluded(PolicyClause),
    ApplyIo { message: String },
    /// A crash left the decision unfinished; found during recovery.
    Interrupted,
    Cancelled,
    /// The file carries a leftover backup or unfinished decisions from an
    /// earlier batch and must be recovered first.
    NeedsRecovery { cause: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleContext => f.write_str("stale context"),
            Self::ConflictRejected { against, resolution } => {
                write!(f, "conflict with {against} ({resolution:?})")
            }
            Self::PolicyExcluded(PolicyClause::SafetyClass { class, max }) => {
                write!(f, "policy excluded: safety class {class} above {max}")
            }
            Self::PolicyExcluded(PolicyClause::Confidence { confidence, min }) => {
                write!(f, "policy excluded: confidence {confidence:.3} below {min:.3}")
            }
            Self::PolicyExcluded(PolicyClause::ExcludedPath { pattern }) => {
                write!(f, "policy excluded: path matches {pattern}")
            }
            Self::ApplyIo { message } => write!(f, "i/o failure: {message}"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::NeedsRecovery { cause } => write!(f, "needs recovery: {cause}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Accepted,
    Rejected(RejectReason),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug, Clone)]
struct AcceptedFix {
    id: String,
    span: Span,
    severity: Severity,
    safety: SafetyClass,
}

/// Candidates accepted so far in one batch, keyed by file.
///
/// A later candidate can displace an earlier one; the displaced ids and
/// their reasons are collected in `displaced`.
#[derive(Debug, Default)]
pub struct ValidationSet {
    accepted: FxHashMap<String, Vec<AcceptedFix>>,
    displaced: Vec<(String, RejectReason)>,
}

impl ValidationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_accepted(&self, candidate_id: &str) -> bool {
        self.accepted
            .values()
            .any(|fixes| fixes.iter().any(|f| f.id == candidate_id))
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.values().map(Vec::len).sum()
    }

    /// Candidates accepted earlier and later displaced, with reasons.
    pub fn displaced(&self) -> &[(String, RejectReason)] {
        &self.displaced
    }

    /// Final reason for a candidate previously reported `Accepted`, if it
    /// has since been displaced.
    pub fn displacement_of(&self, candidate_id: &str) -> Option<&RejectReason> {
        self.displaced
            .iter()
            .find(|(id, _)| id == candidate_id)
            .map(|(_, r)| r)
    }
}

/// Outcome of comparing a candidate against one accepted fix.
enum Contest {
    Wins(ConflictResolution),
    Loses(ConflictResolution),
    Tie,
}

fn contest(candidate: &FixCandidate, other: &AcceptedFix) -> Contest {
    if candidate.severity != other.severity {
        return if candidate.severity > other.severity {
            Contest::Wins(ConflictResolution::HigherSeverity)
        } else {
            Contest::Loses(ConflictResolution::HigherSeverity)
        };
    }
    if candidate.safety != other.safety {
        return if candidate.safety < other.safety {
            Contest::Wins(ConflictResolution::SimplerFix)
        } else {
            Contest::Loses(ConflictResolution::SimplerFix)
        };
    }
    Contest::Tie
}

/// Stateless validator; all batch state lives in the `ValidationSet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixContextAnalyzer;

impl FixContextAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Validate `candidate` against the live file text, the batch's
    /// accepted candidates, and `policy`, in that order.
    ///
    /// A winning candidate displaces the loser only when it also passes
    /// the policy check; a full tie rejects both for manual review.
    pub fn validate(
        &self,
        set: &mut ValidationSet,
        candidate: &FixCandidate,
        live_text: &str,
        policy: &FixPolicy,
    ) -> Validation {
        if !is_fresh(candidate, live_text) {
            return Validation::Rejected(RejectReason::StaleContext);
        }

        let policy_result = check_policy(candidate, policy);
        let accepted = set.accepted.entry(candidate.file.clone()).or_default();

        let mut beaten: Vec<(usize, ConflictResolution)> = Vec::new();
        let mut tied: Vec<usize> = Vec::new();
        for (i, other) in accepted.iter().enumerate() {
            if other.id == candidate.id || !other.span.overlaps(&candidate.span) {
                continue;
            }
            match contest(candidate, other) {
                Contest::Loses(resolution) => {
                    return Validation::Rejected(RejectReason::ConflictRejected {
                        against: other.id.clone(),
                        resolution,
                    });
                }
                Contest::Wins(resolution) => beaten.push((i, resolution)),
                Contest::Tie => tied.push(i),
            }
        }

        if let Err(clause) = policy_result {
            return Validation::Rejected(RejectReason::PolicyExcluded(clause));
        }

        if let Some(&first_tie) = tied.first() {
            let against = accepted[first_tie].id.clone();
            let mut remove: Vec<usize> = tied.clone();
            remove.sort_unstable();
            for i in remove.into_iter().rev() {
                let other = accepted.remove(i);
                set.displaced.push((
                    other.id,
                    RejectReason::ConflictRejected {
                        against: candidate.id.clone(),
                        resolution: ConflictResolution::ManualReview,
                    },
                ));
            }
            return Validation::Rejected(RejectReason::ConflictRejected {
                against,
                resolution: ConflictResolution::ManualReview,
            });
        }

        beaten.sort_unstable_by_key(|(i, _)| *i);
        for (i, resolution) in beaten.into_iter().rev() {
            let other = accepted.remove(i);
            set.displaced.push((
                other.id,
                RejectReason::ConflictRejected {
                    against: candidate.id.clone(),
                    resolution,
                },
            ));
        }

        accepted.push(AcceptedFix {
            id: candidate.id.clone(),
            span: candidate.span,
            severity: candidate.severity,
            safety: candidate.safety,
        });
        Validation::Accepted
    }
}

/// True when the live text at the candidate span hashes to the original.
pub fn is_fresh(candidate: &FixCandidate, live_text: &str) -> bool {
    candidate
        .span
        .slice(live_text)
        .is_some_and(|text| ContentHash::of_str(text) == candidate.original_hash)
}

fn check_policy(candidate: &FixCandidate, policy: &FixPolicy) -> Result<(), PolicyClause> {
    if candidate.safety > policy.max_safety_class {
        return Err(PolicyClause::SafetyClass {
            class: candidate.safety,
            max: policy.max_safety_class,
        });
    }
    if candidate.confidence < policy.min_confidence {
        return Err(PolicyClause::Confidence {
            confidence: candidate.confidence,
            min: policy.min_confidence,
        });
    }
    if let Some(pattern) = policy.exclude.iter().find(|p| p.matches(&candidate.file)) {
        return Err(PolicyClause::ExcludedPath {
            pattern: pattern.as_str().to_string(),
        });
    }
    Ok(())
}
