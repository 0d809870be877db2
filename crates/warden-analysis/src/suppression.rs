//! Inline suppression: `warden-ignore` and `# noqa` comments.

/// Checks whether a violation line is suppressed by a comment on the same
/// line or the line above.
///
/// Supports:
/// - `// warden-ignore` / `# warden-ignore` (all rules)
/// - `// warden-ignore no-eval, no-wildcard-cors` (listed rules)
/// - `# noqa` / `# noqa: no-eval`
#[derive(Debug, Default, Clone, Copy)]
pub struct SuppressionChecker;

impl SuppressionChecker {
    pub fn new() -> Self {
        Self
    }

    /// `line` is 1-based.
    pub fn is_suppressed(&self, lines: &[&str], line: u32, rule: &str) -> bool {
        if line == 0 {
            return false;
        }
        let idx = (line - 1) as usize;
        if lines.get(idx).is_some_and(|l| self.line_suppresses(l, rule)) {
            return true;
        }
        idx > 0 && lines.get(idx - 1).is_some_and(|l| self.line_suppresses(l, rule))
    }

    fn line_suppresses(&self, line: &str, rule: &str) -> bool {
        let trimmed = line.trim();
        self.check_warden_ignore(trimmed, rule)
            .or_else(|| self.check_noqa(trimmed, rule))
            .unwrap_or(false)
    }

    fn check_warden_ignore(&self, trimmed: &str, rule: &str) -> Option<bool> {
        let marker = "warden-ignore";
        let pos = trimmed.find(marker)?;

        let before = &trimmed[..pos];
        let is_comment = before.contains("//") || before.contains('#') || before.contains("/*");
        if !is_comment {
            return None;
        }

        let after = trimmed[pos + marker.len()..]
            .trim()
            .trim_end_matches("*/")
            .trim();
        if after.is_empty() {
            return Some(true);
        }
        Some(lists_rule(after, rule))
    }

    fn check_noqa(&self, trimmed: &str, rule: &str) -> Option<bool> {
        let pos = trimmed.find("# noqa")?;
        let after = trimmed[pos + "# noqa".len()..].trim();
        if after.is_empty() {
            return Some(true);
        }
        match after.strip_prefix(':') {
            Some(rules) => Some(lists_rule(rules, rule)),
            None => Some(true),
        }
    }
}

fn lists_rule(list: &str, rule: &str) -> bool {
    list.split(',').map(str::trim).any(|r| r == rule)
}
