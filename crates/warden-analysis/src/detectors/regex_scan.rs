//! Regular-expression strategy with a `RegexSet` prefilter.

use regex::{Regex, RegexSet};

use warden_core::errors::DetectionError;
use warden_core::types::Span;

use super::{CompiledRule, DetectorStrategy};
use crate::ensemble::RawFinding;
use crate::rules::{Descriptor, RuleRegistry};
use crate::source::{Language, SourceFile};

pub const REGEX_STRATEGY_ID: &str = "regex";

#[derive(Debug)]
pub struct RegexStrategy {
    set: RegexSet,
    entries: Vec<(Regex, CompiledRule)>,
}

impl RegexStrategy {
    pub fn compile(registry: &RuleRegistry) -> Result<Self, DetectionError> {
        let mut sources = Vec::new();
        let mut entries = Vec::new();
        for pattern in registry.iter() {
            for descriptor in &pattern.detection {
                if let Descriptor::Regex { pattern: source, .. } = descriptor {
                    let regex = Regex::new(source).map_err(|e| compile_error(&pattern.name, e))?;
                    sources.push(source.clone());
                    entries.push((regex, CompiledRule::new(pattern, descriptor)));
                }
            }
        }
        let set = RegexSet::new(&sources).map_err(|e| compile_error("<set>", e))?;
        Ok(Self { set, entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compile_error(rule: &str, e: regex::Error) -> DetectionError {
    DetectionError::InvalidInput {
        file: "<registry>".to_string(),
        message: format!("regex for {rule}: {e}"),
    }
}

impl DetectorStrategy for RegexStrategy {
    fn id(&self) -> &str {
        REGEX_STRATEGY_ID
    }

    fn supports(&self, language: Language) -> bool {
        self.entries.iter().any(|(_, r)| r.applies_to(language))
    }

    fn scan(&self, file: &SourceFile) -> Result<Vec<RawFinding>, DetectionError> {
        let mut findings = Vec::new();
        for index in self.set.matches(&file.content).iter() {
            let (regex, rule) = &self.entries[index];
            if !rule.applies_to(file.language) {
                continue;
            }
            for m in regex.find_iter(&file.content) {
                findings.push(rule.finding(REGEX_STRATEGY_ID, file, Span::new(m.start(), m.end())));
            }
        }
        Ok(findings)
    }
}
