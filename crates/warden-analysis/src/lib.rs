//! # warden-analysis
//!
//! Detection and fix engine for Warden.
//!
//! A scan runs every [`detectors::DetectorStrategy`] over each
//! [`source::SourceFile`] in parallel and merges overlapping findings into
//! confidence-scored [`ensemble::Violation`]s. Fixable violations yield
//! [`fixes::FixCandidate`]s, which the [`fixes::FixOrchestrator`] validates,
//! applies, verifies and records in an audit trail, one file at a time.

pub mod audit;
pub mod detectors;
pub mod ensemble;
pub mod fixes;
pub mod rules;
pub mod source;
pub mod suppression;
pub mod syntax;

pub use audit::InMemoryAuditTrail;
pub use ensemble::{EnsembleScorer, ScanReport, Violation};
pub use fixes::{BatchReport, FixCandidate, FixOrchestrator, RecoveryReport};
pub use rules::{Pattern, RuleRegistry};
pub use source::{Language, SourceFile};
pub use syntax::{SyntaxTreeProvider, TreeSitterProvider};
