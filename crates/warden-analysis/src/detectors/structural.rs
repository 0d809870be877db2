//! Structural strategy: checks node kinds in the file's syntax tree.

use regex::Regex;

use warden_core::errors::DetectionError;

use super::{CompiledRule, DetectorStrategy};
use crate::ensemble::RawFinding;
use crate::rules::{Descriptor, RuleRegistry};
use crate::source::{Language, SourceFile};

pub const STRUCTURAL_STRATEGY_ID: &str = "structural";

#[derive(Debug)]
struct NodeCheck {
    node_kind: String,
    text: Option<Regex>,
    rule: CompiledRule,
}

#[derive(Debug)]
pub struct StructuralStrategy {
    checks: Vec<NodeCheck>,
}

impl StructuralStrategy {
    pub fn compile(registry: &RuleRegistry) -> Result<Self, DetectionError> {
        let mut checks = Vec::new();
        for pattern in registry.iter() {
            for descriptor in &pattern.detection {
                if let Descriptor::Structural { node_kind, text, .. } = descriptor {
                    let text = text
                        .as_deref()
                        .map(Regex::new)
                        .transpose()
                        .map_err(|e| DetectionError::InvalidInput {
                            file: "<registry>".to_string(),
                            message: format!("node text regex for {}: {e}", pattern.name),
                        })?;
                    checks.push(NodeCheck {
                        node_kind: node_kind.clone(),
                        text,
                        rule: CompiledRule::new(pattern, descriptor),
                    });
                }
            }
        }
        Ok(Self { checks })
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl DetectorStrategy for StructuralStrategy {
    fn id(&self) -> &str {
        STRUCTURAL_STRATEGY_ID
    }

    fn supports(&self, language: Language) -> bool {
        self.checks.iter().any(|c| c.rule.applies_to(language))
    }

    /// Files without a tree yield nothing. Trees with error nodes are
    /// still walked; only well-formed nodes are reported.
    fn scan(&self, file: &SourceFile) -> Result<Vec<RawFinding>, DetectionError> {
        let Some(tree) = &file.tree else {
            tracing::trace!(file = %file.path, "no syntax tree, structural checks skipped");
            return Ok(Vec::new());
        };
        if tree.language() != file.language {
            return Err(DetectionError::InvalidInput {
                file: file.path.clone(),
                message: format!(
                    "tree language {} does not match file language {}",
                    tree.language(),
                    file.language
                ),
            });
        }

        let mut findings = Vec::new();
        for (_, node) in tree.iter() {
            if node.is_error {
                continue;
            }
            for check in &self.checks {
                if node.kind != check.node_kind || !check.rule.applies_to(file.language) {
                    continue;
                }
                let Some(text) = tree.text_of(node, &file.content) else {
                    continue;
                };
                if check.text.as_ref().is_some_and(|re| !re.is_match(text)) {
                    continue;
                }
                findings.push(check.rule.finding(STRUCTURAL_STRATEGY_ID, file, node.span));
            }
        }
        Ok(findings)
    }
}
