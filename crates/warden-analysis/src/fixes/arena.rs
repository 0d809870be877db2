//! Edit arena: live offsets recomputed from applied edits.

use warden_core::types::Span;

/// An applied edit, in original-file coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub candidate_id: String,
    pub original: Span,
    pub delta: isize,
}

/// Edits applied to one file during a batch.
///
/// Entries are immutable; a rolled-back edit is removed. Candidates in a
/// file never overlap, so every edit lies entirely before or after any
/// other candidate's span.
#[derive(Debug, Default, Clone)]
pub struct EditArena {
    edits: Vec<AppliedEdit>,
}

impl EditArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate_id: impl Into<String>, original: Span, replacement_len: usize) {
        self.edits.push(AppliedEdit {
            candidate_id: candidate_id.into(),
            original,
            delta: replacement_len as isize - original.len() as isize,
        });
    }

    /// Drop a rolled-back edit. Returns whether it was present.
    pub fn remove(&mut self, candidate_id: &str) -> bool {
        let before = self.edits.len();
        self.edits.retain(|e| e.candidate_id != candidate_id);
        self.edits.len() != before
    }

    /// Where `original` sits in the current content: shifted by the delta
    /// of every edit ending at or before its start.
    pub fn live_span(&self, original: Span) -> Span {
        let shift: isize = self
            .edits
            .iter()
            .filter(|e| e.original.end <= original.start && e.original != original)
            .map(|e| e.delta)
            .sum();
        original.shifted(shift)
    }

    /// Where an applied edit's replacement currently sits.
    pub fn live_replacement(&self, candidate_id: &str) -> Option<Span> {
        let edit = self.edits.iter().find(|e| e.candidate_id == candidate_id)?;
        let start = self.live_span(edit.original).start;
        Some(Span::new(
            start,
            start.saturating_add_signed(edit.original.len() as isize + edit.delta),
        ))
    }

    pub fn edits(&self) -> &[AppliedEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
