//! Fix pipeline: candidates, context analysis, edit arena, file
//! transactions, verification, decisions and the orchestrator.

pub mod arena;
pub mod candidate;
pub mod context;
pub mod decision;
pub mod orchestrator;
pub mod report;
pub mod transaction;
pub mod verifier;

pub use arena::{AppliedEdit, EditArena};
pub use candidate::FixCandidate;
pub use context::{
    ConflictResolution, FixContextAnalyzer, PolicyClause, RejectReason, Validation, ValidationSet,
};
pub use decision::FixDecision;
pub use orchestrator::FixOrchestrator;
pub use report::{BatchReport, DecisionReport, FileOutcome, FileReport, RecoveryReport};
pub use transaction::{backup_path_for, AppliedChange, ApplyOutcome, FileTransaction};
pub use verifier::{delimiter_depths, FixVerifier};
