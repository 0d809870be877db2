//! Ensemble scoring: merging strategy findings into confidence-scored
//! violations, plus shared strategy statistics.

pub mod merge;
pub mod noisy_or;
pub mod scorer;
pub mod stats;
pub mod types;

pub use merge::{merge_findings, MergedGroup};
pub use noisy_or::noisy_or;
pub use scorer::EnsembleScorer;
pub use stats::{StrategyStats, StrategyStatsTable};
pub use types::{RawFinding, ScanReport, ScanStats, StrategyFailure, Violation};
