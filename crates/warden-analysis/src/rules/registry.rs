//! Rule registry: built once, read-only afterwards.

use rustc_hash::FxHashMap;

use warden_core::errors::RegistryError;

use super::types::{Descriptor, FixAction, Invariant, Pattern};
use crate::source::Language;

/// Collects patterns and validates them before freezing into a `RuleRegistry`.
#[derive(Debug, Default)]
pub struct RuleRegistryBuilder {
    patterns: Vec<Pattern>,
    index: FxHashMap<String, usize>,
}

impl RuleRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern. Names must be unique and every regex must compile.
    pub fn register(&mut self, pattern: Pattern) -> Result<&mut Self, RegistryError> {
        if self.index.contains_key(&pattern.name) {
            return Err(RegistryError::DuplicateRule { name: pattern.name });
        }
        validate(&pattern)?;
        self.index.insert(pattern.name.clone(), self.patterns.len());
        self.patterns.push(pattern);
        Ok(self)
    }

    /// Register every pattern, stopping at the first failure.
    pub fn register_all(
        &mut self,
        patterns: impl IntoIterator<Item = Pattern>,
    ) -> Result<&mut Self, RegistryError> {
        for pattern in patterns {
            self.register(pattern)?;
        }
        Ok(self)
    }

    pub fn build(self) -> RuleRegistry {
        tracing::debug!(rules = self.patterns.len(), "rule registry built");
        RuleRegistry {
            patterns: self.patterns,
            index: self.index,
        }
    }
}

fn invalid(pattern: &Pattern, message: impl Into<String>) -> RegistryError {
    RegistryError::InvalidPattern {
        name: pattern.name.clone(),
        message: message.into(),
    }
}

fn check_regex(pattern: &Pattern, source: &str) -> Result<(), RegistryError> {
    regex::Regex::new(source)
        .map(|_| ())
        .map_err(|e| invalid(pattern, format!("regex '{source}' does not compile: {e}")))
}

fn check_unit(pattern: &Pattern, what: &str, value: f64) -> Result<(), RegistryError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(pattern, format!("{what} {value} outside [0, 1]")))
    }
}

fn validate(pattern: &Pattern) -> Result<(), RegistryError> {
    if pattern.name.trim().is_empty() {
        return Err(invalid(pattern, "name must not be empty"));
    }
    if pattern.detection.is_empty() {
        return Err(invalid(pattern, "at least one detection descriptor is required"));
    }
    check_unit(pattern, "base confidence", pattern.base_confidence)?;

    for descriptor in &pattern.detection {
        if let Some(c) = descriptor.confidence() {
            check_unit(pattern, "descriptor confidence", c)?;
        }
        match descriptor {
            Descriptor::Literal { needle, .. } if needle.is_empty() => {
                return Err(invalid(pattern, "literal needle must not be empty"));
            }
            Descriptor::Literal { .. } => {}
            Descriptor::Regex { pattern: source, .. } => check_regex(pattern, source)?,
            Descriptor::Structural { node_kind, text, .. } => {
                if node_kind.is_empty() {
                    return Err(invalid(pattern, "structural node kind must not be empty"));
                }
                if let Some(source) = text {
                    check_regex(pattern, source)?;
                }
            }
        }
    }

    if let Some(fix) = &pattern.fix {
        if let FixAction::RegexReplace { pattern: source, .. } = &fix.action {
            check_regex(pattern, source)?;
        }
        for invariant in &fix.invariants {
            if let Invariant::MustNotMatch(source) = invariant {
                check_regex(pattern, source)?;
            }
        }
    }
    Ok(())
}

/// Immutable set of patterns, shared across scanning threads.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    patterns: Vec<Pattern>,
    index: FxHashMap<String, usize>,
}

impl RuleRegistry {
    pub fn builder() -> RuleRegistryBuilder {
        RuleRegistryBuilder::new()
    }

    /// Build a registry from a list of patterns.
    pub fn from_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Result<Self, RegistryError> {
        let mut builder = RuleRegistryBuilder::new();
        builder.register_all(patterns)?;
        Ok(builder.build())
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.index.get(name).map(|&i| &self.patterns[i])
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// All patterns in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    pub fn rules_for_category<'a>(&'a self, category: &'a str) -> RulesFor<'a> {
        RulesFor {
            inner: self.patterns.iter(),
            filter: RuleFilter::Category(category),
        }
    }

    pub fn rules_for_language(&self, language: Language) -> RulesFor<'_> {
        RulesFor {
            inner: self.patterns.iter(),
            filter: RuleFilter::Language(language),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RuleFilter<'a> {
    Category(&'a str),
    Language(Language),
}

/// Lazy, restartable view over matching patterns in registration order.
/// Clone it to iterate again from the same point.
#[derive(Debug, Clone)]
pub struct RulesFor<'a> {
    inner: std::slice::Iter<'a, Pattern>,
    filter: RuleFilter<'a>,
}

impl<'a> Iterator for RulesFor<'a> {
    type Item = &'a Pattern;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner.by_ref().find(|p| match filter {
            RuleFilter::Category(c) => p.category == c,
            RuleFilter::Language(l) => p.applies_to(l),
        })
    }
}
