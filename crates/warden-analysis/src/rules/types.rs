//! Pattern definitions: detection descriptors and fix templates.

use std::fmt;

use serde::{Deserialize, Serialize};

use warden_core::types::{SafetyClass, Severity};

use crate::source::Language;

/// A named, declarative rule. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub category: String,
    pub severity: Severity,
    /// Languages the rule applies to. Empty means all.
    #[serde(default)]
    pub languages: Vec<Language>,
    /// Static confidence weight, used when a descriptor has no override.
    pub base_confidence: f64,
    pub detection: Vec<Descriptor>,
    pub rationale: String,
    pub fix: Option<FixTemplate>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, category: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            severity,
            languages: Vec::new(),
            base_confidence: 0.8,
            detection: Vec::new(),
            rationale: String::new(),
            fix: None,
        }
    }

    pub fn for_language(mut self, language: Language) -> Self {
        self.languages.push(language);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.base_confidence = confidence;
        self
    }

    pub fn detect(mut self, descriptor: Descriptor) -> Self {
        self.detection.push(descriptor);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_fix(mut self, fix: FixTemplate) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn applies_to(&self, language: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }

    /// Confidence a descriptor reports for a match.
    pub fn confidence_of(&self, descriptor: &Descriptor) -> f64 {
        descriptor.confidence().unwrap_or(self.base_confidence)
    }
}

/// Which built-in strategy evaluates a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Literal,
    Regex,
    Structural,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Regex => "regex",
            Self::Structural => "structural",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a pattern is matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Descriptor {
    /// Plain substring scan.
    Literal {
        needle: String,
        #[serde(default)]
        case_insensitive: bool,
        confidence: Option<f64>,
    },
    /// Regular expression over the file text.
    Regex {
        pattern: String,
        confidence: Option<f64>,
    },
    /// Syntax nodes of `node_kind`, optionally filtered by a regex over the
    /// node text.
    Structural {
        node_kind: String,
        text: Option<String>,
        confidence: Option<f64>,
    },
}

impl Descriptor {
    pub fn literal(needle: impl Into<String>) -> Self {
        Self::Literal {
            needle: needle.into(),
            case_insensitive: false,
            confidence: None,
        }
    }

    pub fn literal_ci(needle: impl Into<String>) -> Self {
        Self::Literal {
            needle: needle.into(),
            case_insensitive: true,
            confidence: None,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            confidence: None,
        }
    }

    pub fn structural(node_kind: impl Into<String>, text: Option<&str>) -> Self {
        Self::Structural {
            node_kind: node_kind.into(),
            text: text.map(str::to_string),
            confidence: None,
        }
    }

    /// Override the pattern's base confidence for this descriptor.
    pub fn with_confidence(mut self, value: f64) -> Self {
        match &mut self {
            Self::Literal { confidence, .. }
            | Self::Regex { confidence, .. }
            | Self::Structural { confidence, .. } => *confidence = Some(value),
        }
        self
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::Literal { confidence, .. }
            | Self::Regex { confidence, .. }
            | Self::Structural { confidence, .. } => *confidence,
        }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        match self {
            Self::Literal { .. } => StrategyKind::Literal,
            Self::Regex { .. } => StrategyKind::Regex,
            Self::Structural { .. } => StrategyKind::Structural,
        }
    }
}

/// Automated correction attached to a pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixTemplate {
    pub action: FixAction,
    pub safety: SafetyClass,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
}

impl FixTemplate {
    pub fn new(action: FixAction, safety: SafetyClass) -> Self {
        Self {
            action,
            safety,
            invariants: Vec::new(),
        }
    }

    pub fn with_invariant(mut self, invariant: Invariant) -> Self {
        self.invariants.push(invariant);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixAction {
    /// Replace the violation text verbatim.
    Replace { with: String },
    /// Regex rewrite applied to the violation text only.
    RegexReplace { pattern: String, replacement: String },
    Delete,
}

/// Post-fix check evaluated against the rewritten region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Invariant {
    MustNotMatch(String),
    MustContain(String),
    /// The rewrite leaves bracket nesting unchanged.
    BalancedDelimiters,
}
