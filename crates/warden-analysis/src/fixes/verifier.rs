//! Post-fix verification: syntax check plus the rule's invariants.

use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use warden_core::errors::FixError;
use warden_core::types::Span;

use super::FixCandidate;
use crate::rules::Invariant;
use crate::source::Language;
use crate::syntax::SyntaxTreeProvider;

/// Net nesting depth of `()`, `[]` and `{}` in `text`.
pub fn delimiter_depths(text: &str) -> [i64; 3] {
    let mut depth = [0i64; 3];
    for c in text.chars() {
        match c {
            '(' => depth[0] += 1,
            ')' => depth[0] -= 1,
            '[' => depth[1] += 1,
            ']' => depth[1] -= 1,
            '{' => depth[2] += 1,
            '}' => depth[2] -= 1,
            _ => {}
        }
    }
    depth
}

/// Confirms an applied fix or reports why it must be rolled back.
#[derive(Clone, Default)]
pub struct FixVerifier {
    provider: Option<Arc<dyn SyntaxTreeProvider>>,
}

impl FixVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<dyn SyntaxTreeProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Error-node count of the unmodified file, if it can be parsed.
    pub fn baseline_errors(&self, language: Option<Language>, content: &str) -> Option<u32> {
        let provider = self.provider.as_ref()?;
        let language = language.filter(|l| provider.supports(*l))?;
        provider.parse(language, content).ok().map(|t| t.error_count())
    }

    /// Verify `content` after `candidate` was written at `region`.
    ///
    /// The syntax check fails when the fix adds error nodes relative to
    /// `baseline`. Invariants are evaluated against the rewritten region.
    pub fn verify(
        &self,
        path: &Path,
        language: Option<Language>,
        baseline: Option<u32>,
        candidate: &FixCandidate,
        content: &str,
        region: Span,
    ) -> Result<(), FixError> {
        let fail = |message: String| FixError::VerificationFailure {
            path: path.to_path_buf(),
            message,
        };

        if let (Some(provider), Some(language)) = (&self.provider, language) {
            if provider.supports(language) {
                let tree = provider
                    .parse(language, content)
                    .map_err(|e| fail(format!("re-parse failed: {e}")))?;
                if tree.error_count() > baseline.unwrap_or(0) {
                    return Err(fail(format!(
                        "fix introduced syntax errors ({} error nodes)",
                        tree.error_count()
                    )));
                }
            }
        }

        let text = region
            .slice(content)
            .ok_or_else(|| fail(format!("rewritten region {region:?} is out of bounds")))?;

        for invariant in &candidate.invariants {
            match invariant {
                Invariant::MustNotMatch(source) => {
                    let re = Regex::new(source).map_err(|e| fail(format!("invariant regex: {e}")))?;
                    if re.is_match(text) {
                        return Err(fail(format!("rewritten text still matches /{source}/")));
                    }
                }
                Invariant::MustContain(literal) => {
                    if !text.contains(literal.as_str()) {
                        return Err(fail(format!("rewritten text lacks '{literal}'")));
                    }
                }
                Invariant::BalancedDelimiters => {
                    if delimiter_depths(&candidate.original) != delimiter_depths(text) {
                        return Err(fail("rewrite changes delimiter nesting".to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FixVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixVerifier")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use warden_core::types::{ContentHash, SafetyClass, Severity};

    use super::*;
    use crate::syntax::TreeSitterProvider;

    fn candidate(original: &str, replacement: &str, invariants: Vec<Invariant>) -> FixCandidate {
        FixCandidate {
            id: "c".to_string(),
            file: "a.py".to_string(),
            rule: "r".to_string(),
            span: Span::new(0, original.len()),
            original_hash: ContentHash::of_str(original),
            original: original.to_string(),
            replacement: replacement.to_string(),
            safety: SafetyClass::Simple,
            severity: Severity::High,
            confidence: 1.0,
            invariants,
        }
    }

    #[test]
    fn syntax_regression_fails() {
        let verifier = FixVerifier::with_provider(Arc::new(TreeSitterProvider::new()));
        let c = candidate("f(x)", "f(x", vec![]);
        let baseline = verifier.baseline_errors(Some(Language::Python), "f(x)\n");
        assert_eq!(baseline, Some(0));
        let result = verifier.verify(
            Path::new("a.py"),
            Some(Language::Python),
            baseline,
            &c,
            "f(x\n",
            Span::new(0, 3),
        );
        assert!(matches!(result, Err(FixError::VerificationFailure { .. })));
    }

    #[test]
    fn invariants_checked_on_region() {
        let verifier = FixVerifier::new();
        let c = candidate(
            "origins=\"*\"",
            "origins=ALLOWED",
            vec![
                Invariant::MustNotMatch(r#""\*""#.to_string()),
                Invariant::MustContain("ALLOWED".to_string()),
                Invariant::BalancedDelimiters,
            ],
        );
        let content = "cors(origins=ALLOWED)";
        assert!(verifier
            .verify(Path::new("a.py"), None, None, &c, content, Span::new(5, 20))
            .is_ok());

        let bad = candidate("x", "x)", vec![Invariant::BalancedDelimiters]);
        assert!(verifier
            .verify(Path::new("a.py"), None, None, &bad, "x)", Span::new(0, 2))
            .is_err());
    }
}
