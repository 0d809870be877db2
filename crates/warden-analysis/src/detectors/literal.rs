//! Literal substring strategy backed by Aho-Corasick.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use warden_core::errors::DetectionError;
use warden_core::types::Span;

use super::{CompiledRule, DetectorStrategy};
use crate::ensemble::RawFinding;
use crate::rules::{Descriptor, RuleRegistry};
use crate::source::{Language, SourceFile};

pub const LITERAL_STRATEGY_ID: &str = "literal";

/// Matches every literal needle in one pass per case-sensitivity mode.
#[derive(Debug)]
pub struct LiteralStrategy {
    exact: Option<(AhoCorasick, Vec<CompiledRule>)>,
    folded: Option<(AhoCorasick, Vec<CompiledRule>)>,
}

impl LiteralStrategy {
    /// Compile all literal descriptors of `registry`.
    pub fn compile(registry: &RuleRegistry) -> Result<Self, DetectionError> {
        let mut exact = (Vec::new(), Vec::new());
        let mut folded = (Vec::new(), Vec::new());

        for pattern in registry.iter() {
            for descriptor in &pattern.detection {
                if let Descriptor::Literal {
                    needle,
                    case_insensitive,
                    ..
                } = descriptor
                {
                    let target = if *case_insensitive { &mut folded } else { &mut exact };
                    target.0.push(needle.clone());
                    target.1.push(CompiledRule::new(pattern, descriptor));
                }
            }
        }

        Ok(Self {
            exact: build(exact, false)?,
            folded: build(folded, true)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.folded.is_none()
    }

    fn rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.exact
            .iter()
            .chain(self.folded.iter())
            .flat_map(|(_, rules)| rules.iter())
    }
}

fn build(
    (needles, rules): (Vec<String>, Vec<CompiledRule>),
    case_insensitive: bool,
) -> Result<Option<(AhoCorasick, Vec<CompiledRule>)>, DetectionError> {
    if needles.is_empty() {
        return Ok(None);
    }
    let automaton = AhoCorasickBuilder::new()
        .match_kind(MatchKind::Standard)
        .ascii_case_insensitive(case_insensitive)
        .build(&needles)
        .map_err(|e| DetectionError::InvalidInput {
            file: "<registry>".to_string(),
            message: format!("literal automaton: {e}"),
        })?;
    Ok(Some((automaton, rules)))
}

impl DetectorStrategy for LiteralStrategy {
    fn id(&self) -> &str {
        LITERAL_STRATEGY_ID
    }

    fn supports(&self, language: Language) -> bool {
        self.rules().any(|r| r.applies_to(language))
    }

    fn scan(&self, file: &SourceFile) -> Result<Vec<RawFinding>, DetectionError> {
        let mut findings = Vec::new();
        for (automaton, rules) in self.exact.iter().chain(self.folded.iter()) {
            for m in automaton.find_overlapping_iter(&file.content) {
                let rule = &rules[m.pattern().as_usize()];
                if !rule.applies_to(file.language) {
                    continue;
                }
                findings.push(rule.finding(LITERAL_STRATEGY_ID, file, Span::new(m.start(), m.end())));
            }
        }
        Ok(findings)
    }
}
