//! Byte spans within a file.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive end used for overlap tests. An empty span covers its start
    /// offset so that insertions at the same point still collide.
    fn covered_end(&self) -> usize {
        self.end.max(self.start + 1)
    }

    /// Two spans overlap when they share any byte offset.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.covered_end() && other.start < self.covered_end()
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.covered_end()
    }

    /// Shift both ends by a signed delta.
    pub fn shifted(&self, delta: isize) -> Span {
        Span {
            start: self.start.saturating_add_signed(delta),
            end: self.end.saturating_add_signed(delta),
        }
    }

    /// Slice `text` at this span, returning `None` when the span is out of
    /// bounds or not on char boundaries.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

/// 1-based line number of a byte offset.
pub fn line_of(text: &str, offset: usize) -> u32 {
    let end = offset.min(text.len());
    let newlines = text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count();
    newlines as u32 + 1
}
