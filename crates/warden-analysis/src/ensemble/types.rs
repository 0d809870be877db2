//! Findings, violations and scan reports.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use warden_core::types::{Severity, Span};

use crate::fixes::FixCandidate;

/// One strategy's match, before merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFinding {
    pub rule: String,
    pub strategy: String,
    pub file: String,
    pub span: Span,
    pub line: u32,
    /// Strategy confidence in [0, 1].
    pub confidence: f64,
    pub snippet: Option<String>,
}

/// A scored detection of a rule at a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// `"{rule}:{file}:{start}-{end}"`.
    pub id: String,
    pub file: String,
    pub span: Span,
    pub line: u32,
    pub rule: String,
    pub category: String,
    pub severity: Severity,
    /// Combined confidence in [0, 1].
    pub confidence: f64,
    /// Contributing strategy ids, sorted.
    pub strategies: SmallVec<[String; 3]>,
    pub suppressed: bool,
    pub fix: Option<FixCandidate>,
}

impl Violation {
    pub fn make_id(rule: &str, file: &str, span: Span) -> String {
        format!("{rule}:{file}:{}-{}", span.start, span.end)
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }
}

/// A strategy that errored or panicked on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub file: String,
    pub message: String,
    pub panicked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub findings: usize,
    pub violations: usize,
    pub suppressed: usize,
    pub below_threshold: usize,
    pub duration_ms: u64,
}

/// Result of scanning a set of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Sorted by (file, start, rule).
    pub violations: Vec<Violation>,
    pub failures: Vec<StrategyFailure>,
    pub stats: ScanStats,
}

impl ScanReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn violations_for<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.file == file)
    }

    /// Fix candidates attached to unsuppressed violations, in violation order.
    pub fn fix_candidates(&self) -> Vec<FixCandidate> {
        self.violations.iter().filter_map(|v| v.fix.clone()).collect()
    }
}
