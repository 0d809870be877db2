//! Fix candidates rendered from a violation and its pattern's template.

use serde::{Deserialize, Serialize};

use warden_core::types::{ContentHash, SafetyClass, Severity, Span};

use crate::ensemble::Violation;
use crate::rules::{FixAction, Invariant, Pattern};

/// A proposed correction for exactly one violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixCandidate {
    /// Same as the violation id.
    pub id: String,
    pub file: String,
    pub rule: String,
    pub span: Span,
    /// xxh3 of the span text when the candidate was created.
    pub original_hash: ContentHash,
    pub original: String,
    pub replacement: String,
    pub safety: SafetyClass,
    pub severity: Severity,
    pub confidence: f64,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
}

impl FixCandidate {
    /// Render `pattern`'s fix template against the violation text.
    ///
    /// Returns `None` for suppressed violations, patterns without a template,
    /// spans that do not slice `content`, and rewrites that change nothing.
    pub fn from_violation(violation: &Violation, pattern: &Pattern, content: &str) -> Option<Self> {
        if violation.suppressed {
            return None;
        }
        let template = pattern.fix.as_ref()?;
        let original = violation.span.slice(content)?;

        let replacement = match &template.action {
            FixAction::Replace { with } => with.clone(),
            FixAction::Delete => String::new(),
            FixAction::RegexReplace {
                pattern: source,
                replacement,
            } => match regex::Regex::new(source) {
                Ok(re) => re.replace_all(original, replacement.as_str()).into_owned(),
                Err(e) => {
                    tracing::warn!(rule = %pattern.name, error = %e, "fix regex does not compile");
                    return None;
                }
            },
        };
        if replacement == original {
            return None;
        }

        Some(Self {
            id: violation.id.clone(),
            file: violation.file.clone(),
            rule: violation.rule.clone(),
            span: violation.span,
            original_hash: ContentHash::of_str(original),
            original: original.to_string(),
            replacement,
            safety: template.safety,
            severity: violation.severity,
            confidence: violation.confidence,
            invariants: template.invariants.clone(),
        })
    }

    /// Signed length change this candidate makes.
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - self.span.len() as isize
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;
    use crate::rules::{Descriptor, FixTemplate};

    fn violation(span: Span, suppressed: bool) -> Violation {
        Violation {
            id: Violation::make_id("cors", "app.py", span),
            file: "app.py".to_string(),
            span,
            line: 1,
            rule: "cors".to_string(),
            category: "security".to_string(),
            severity: Severity::Critical,
            confidence: 0.9,
            strategies: smallvec!["literal".to_string()],
            suppressed,
            fix: None,
        }
    }

    fn pattern(action: FixAction) -> Pattern {
        Pattern::new("cors", "security", Severity::Critical)
            .detect(Descriptor::literal("origins=\"*\""))
            .with_fix(FixTemplate::new(action, SafetyClass::Simple))
    }

    const CONTENT: &str = "CORS(app, origins=\"*\")\n";

    #[test]
    fn regex_rewrite_applies_to_span_only() {
        let p = pattern(FixAction::RegexReplace {
            pattern: r#""\*""#.to_string(),
            replacement: "ALLOWED_ORIGINS".to_string(),
        });
        let c = FixCandidate::from_violation(&violation(Span::new(10, 21), false), &p, CONTENT)
            .unwrap();
        assert_eq!(c.original, "origins=\"*\"");
        assert_eq!(c.replacement, "origins=ALLOWED_ORIGINS");
        assert_eq!(c.original_hash, ContentHash::of_str("origins=\"*\""));
        assert_eq!(c.delta(), 12);
    }

    #[test]
    fn suppressed_or_noop_yields_nothing() {
        let p = pattern(FixAction::Replace {
            with: "origins=\"*\"".to_string(),
        });
        assert!(FixCandidate::from_violation(&violation(Span::new(10, 21), false), &p, CONTENT)
            .is_none());
        let p = pattern(FixAction::Delete);
        assert!(FixCandidate::from_violation(&violation(Span::new(10, 21), true), &p, CONTENT)
            .is_none());
    }

    #[test]
    fn out_of_bounds_span_yields_nothing() {
        let p = pattern(FixAction::Delete);
        assert!(FixCandidate::from_violation(&violation(Span::new(10, 99), false), &p, CONTENT)
            .is_none());
    }
}
