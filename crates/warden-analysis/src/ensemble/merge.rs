//! Grouping raw findings into violations.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use warden_core::types::Span;

use super::noisy_or::{clamp_unit, noisy_or};
use super::RawFinding;

/// Findings of one rule at one location, after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGroup {
    pub file: String,
    pub rule: String,
    /// Span of the anchor finding.
    pub span: Span,
    pub line: u32,
    pub confidence: f64,
    /// Strategy ids, sorted and unique.
    pub strategies: SmallVec<[String; 3]>,
    pub members: usize,
}

/// Total order used before the sweep: file, rule, earliest start, longest
/// span, then strategy and confidence so equal spans still sort stably.
fn finding_order(a: &RawFinding, b: &RawFinding) -> Ordering {
    a.file
        .cmp(&b.file)
        .then_with(|| a.rule.cmp(&b.rule))
        .then_with(|| a.span.start.cmp(&b.span.start))
        .then_with(|| b.span.end.cmp(&a.span.end))
        .then_with(|| a.strategy.cmp(&b.strategy))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
}

/// Merge findings into groups and score each with weighted noisy-OR.
///
/// A group is anchored on its earliest, longest finding; later findings of
/// the same rule join it when they overlap the anchor. Each strategy
/// contributes only its strongest finding in a group. The output is
/// sorted by (file, start, rule) and does not depend on input order.
pub fn merge_findings<W>(mut findings: Vec<RawFinding>, weight_of: W) -> Vec<MergedGroup>
where
    W: Fn(&str) -> f64,
{
    findings.sort_by(finding_order);

    let mut groups = Vec::new();
    let mut iter = findings.into_iter().peekable();

    while let Some(anchor) = iter.next() {
        let mut best: FxHashMap<String, f64> = FxHashMap::default();
        best.insert(anchor.strategy.clone(), clamp_unit(anchor.confidence));
        let mut members = 1;

        while let Some(next) = iter.peek() {
            if next.file != anchor.file || next.rule != anchor.rule || !anchor.span.overlaps(&next.span) {
                break;
            }
            let Some(next) = iter.next() else { break };
            let entry = best.entry(next.strategy).or_insert(0.0);
            *entry = entry.max(clamp_unit(next.confidence));
            members += 1;
        }

        let mut strategies: SmallVec<[String; 3]> = best.keys().cloned().collect();
        strategies.sort();
        let confidence = noisy_or(strategies.iter().map(|s| (weight_of(s), best[s])));

        groups.push(MergedGroup {
            file: anchor.file,
            rule: anchor.rule,
            span: anchor.span,
            line: anchor.line,
            confidence,
            strategies,
            members,
        });
    }

    groups.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then_with(|| a.span.start.cmp(&b.span.start))
            .then_with(|| a.rule.cmp(&b.rule))
            .then_with(|| a.span.end.cmp(&b.span.end))
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule: &str, strategy: &str, start: usize, end: usize, confidence: f64) -> RawFinding {
        RawFinding {
            rule: rule.to_string(),
            strategy: strategy.to_string(),
            file: "a.py".to_string(),
            span: Span::new(start, end),
            line: 1,
            confidence,
            snippet: None,
        }
    }

    #[test]
    fn overlapping_same_rule_merges() {
        let groups = merge_findings(
            vec![
                finding("r", "regex", 2, 8, 0.5),
                finding("r", "literal", 0, 5, 0.6),
            ],
            |_| 1.0,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].span, Span::new(0, 5));
        assert_eq!(groups[0].strategies.as_slice(), ["literal", "regex"]);
        assert!((groups[0].confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn different_rules_never_merge() {
        let groups = merge_findings(
            vec![finding("b", "literal", 0, 5, 0.5), finding("a", "literal", 0, 5, 0.5)],
            |_| 1.0,
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].rule, "a");
    }

    #[test]
    fn same_strategy_counts_once() {
        let groups = merge_findings(
            vec![finding("r", "literal", 0, 5, 0.4), finding("r", "literal", 1, 3, 0.7)],
            |_| 1.0,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, 2);
        assert!((groups[0].confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn longest_span_anchors_on_equal_start() {
        let groups = merge_findings(
            vec![finding("r", "regex", 4, 6, 0.5), finding("r", "literal", 4, 10, 0.5)],
            |_| 1.0,
        );
        assert_eq!(groups[0].span, Span::new(4, 10));
    }

    #[test]
    fn chain_without_anchor_overlap_splits() {
        let groups = merge_findings(
            vec![
                finding("r", "a", 0, 4, 0.5),
                finding("r", "b", 3, 8, 0.5),
                finding("r", "c", 6, 9, 0.5),
            ],
            |_| 1.0,
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].span, Span::new(6, 9));
    }

    #[test]
    fn weights_scale_contributions() {
        let groups = merge_findings(vec![finding("r", "regex", 0, 1, 0.8)], |_| 0.5);
        assert!((groups[0].confidence - 0.4).abs() < 1e-12);
    }
}
