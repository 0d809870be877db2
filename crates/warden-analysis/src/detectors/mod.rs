//! Detector strategies: the trait plus literal, regex and structural
//! strategies compiled from a rule registry.

pub mod literal;
pub mod regex_scan;
pub mod structural;
pub mod traits;

use std::sync::Arc;

use smallvec::SmallVec;

use warden_core::errors::DetectionError;
use warden_core::types::Span;

pub use literal::{LiteralStrategy, LITERAL_STRATEGY_ID};
pub use regex_scan::{RegexStrategy, REGEX_STRATEGY_ID};
pub use structural::{StructuralStrategy, STRUCTURAL_STRATEGY_ID};
pub use traits::DetectorStrategy;

use crate::ensemble::RawFinding;
use crate::rules::{Descriptor, Pattern, RuleRegistry};
use crate::source::{Language, SourceFile};

/// The parts of a pattern a strategy needs at match time.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    rule: String,
    languages: SmallVec<[Language; 2]>,
    confidence: f64,
}

impl CompiledRule {
    pub(crate) fn new(pattern: &Pattern, descriptor: &Descriptor) -> Self {
        Self {
            rule: pattern.name.clone(),
            languages: pattern.languages.iter().copied().collect(),
            confidence: pattern.confidence_of(descriptor),
        }
    }

    pub(crate) fn applies_to(&self, language: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }

    pub(crate) fn finding(&self, strategy: &str, file: &SourceFile, span: Span) -> RawFinding {
        RawFinding {
            rule: self.rule.clone(),
            strategy: strategy.to_string(),
            file: file.path.clone(),
            span,
            line: file.line_of(span.start),
            confidence: self.confidence,
            snippet: span.slice(&file.content).map(str::to_string),
        }
    }
}

/// Compile the built-in strategies for `registry`, skipping any with
/// nothing to match.
pub fn builtin_strategies(
    registry: &RuleRegistry,
) -> Result<Vec<Arc<dyn DetectorStrategy>>, DetectionError> {
    let mut strategies: Vec<Arc<dyn DetectorStrategy>> = Vec::new();

    let literal = LiteralStrategy::compile(registry)?;
    if !literal.is_empty() {
        strategies.push(Arc::new(literal));
    }
    let regex = RegexStrategy::compile(registry)?;
    if !regex.is_empty() {
        strategies.push(Arc::new(regex));
    }
    let structural = StructuralStrategy::compile(registry)?;
    if !structural.is_empty() {
        strategies.push(Arc::new(structural));
    }
    Ok(strategies)
}
