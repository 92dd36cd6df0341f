// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::{Display, Formatter, Result},
          ops::Range};

use unicode_segmentation::UnicodeSegmentation;

/// Everything the console has shown, split at `edit_start`:
///
/// ```text
/// ┌──────── history region ────────┬──── editable line ────┐
/// │ >>> 1+1\n2\n>>>                │ 2*3                   │
/// └────────────────────────────────┴───────────────────────┘
/// 0                           edit_start             caret ▲ len()
/// ```
///
/// Invariants, checked on every mutation:
/// - `edit_start <= len()` and `caret <= len()`.
/// - Both sit on grapheme cluster boundaries.
/// - After any mutation of the editable line, `edit_start <= caret`.
///
/// Breaking one of these is a bug in this crate, so it panics instead of being
/// reported as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
    edit_start: usize,
    caret: usize,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn as_str(&self) -> &str { &self.text }

    #[must_use]
    pub fn len(&self) -> usize { self.text.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.text.is_empty() }

    #[must_use]
    pub fn edit_start(&self) -> usize { self.edit_start }

    #[must_use]
    pub fn caret(&self) -> usize { self.caret }

    #[must_use]
    pub fn editable_range(&self) -> Range<usize> { self.edit_start..self.text.len() }

    #[must_use]
    pub fn editable_text(&self) -> &str { &self.text[self.edit_start..] }

    #[must_use]
    pub fn history_text(&self) -> &str { &self.text[..self.edit_start] }

    #[must_use]
    pub fn is_caret_editable(&self) -> bool { self.caret >= self.edit_start }

    /// Insert output from the interpreter just above the editable line. `edit_start`
    /// moves forward by `text.len()`, and so does the caret unless it was parked in the
    /// history region. Returns the offset the text was inserted at.
    pub fn insert_before_edit_start(&mut self, text: &str) -> usize {
        let at = self.edit_start;
        self.text.insert_str(at, text);
        self.edit_start += text.len();
        if self.caret >= at {
            self.caret += text.len();
        }
        self.assert_invariants();
        at
    }

    /// Move a caret that is parked in the history region to the end. Mutating edits call
    /// this first.
    pub fn clamp_caret_for_edit(&mut self) {
        if !self.is_caret_editable() {
            self.caret = self.text.len();
        }
    }

    /// Insert `text` at the caret (clamping it first), and return the offset it was
    /// inserted at.
    pub fn insert_at_caret(&mut self, text: &str) -> usize {
        self.clamp_caret_for_edit();
        let at = self.caret;
        self.text.insert_str(at, text);
        self.caret += text.len();
        self.assert_edit_invariants();
        at
    }

    /// Delete the grapheme cluster before the caret. Returns the deleted range, or
    /// [`None`] if that would reach into the history region.
    pub fn delete_backward(&mut self) -> Option<Range<usize>> {
        if !self.is_caret_editable() {
            return None;
        }
        let grapheme = self.text[self.edit_start..self.caret].graphemes(true).next_back()?;
        let range = self.caret - grapheme.len()..self.caret;
        self.text.replace_range(range.clone(), "");
        self.caret = range.start;
        self.assert_edit_invariants();
        Some(range)
    }

    /// Delete the grapheme cluster after the caret. Returns the deleted range, or
    /// [`None`] if there is nothing editable there.
    pub fn delete_forward(&mut self) -> Option<Range<usize>> {
        if !self.is_caret_editable() {
            return None;
        }
        let grapheme = self.text[self.caret..].graphemes(true).next()?;
        let range = self.caret..self.caret + grapheme.len();
        self.text.replace_range(range.clone(), "");
        self.assert_edit_invariants();
        Some(range)
    }

    /// Delete an arbitrary range of the editable line. Ranges that are not entirely
    /// editable are ignored.
    pub fn delete_range(&mut self, range: Range<usize>) -> Option<Range<usize>> {
        let range = self.snap_range(range);
        if range.is_empty() || range.start < self.edit_start {
            return None;
        }
        self.text.replace_range(range.clone(), "");
        self.caret = range.start;
        self.assert_edit_invariants();
        Some(range)
    }

    /// Replace the whole editable line with `text`, and put the caret at the end. Returns
    /// the range that was replaced.
    pub fn replace_editable(&mut self, text: &str) -> Range<usize> {
        let range = self.editable_range();
        self.text.replace_range(range.clone(), text);
        self.caret = self.text.len();
        self.assert_edit_invariants();
        range
    }

    /// Take the editable line, terminate it with `terminator` and make it part of the
    /// history region. Returns the line (without terminator).
    pub fn commit_line(&mut self, terminator: &str) -> String {
        let line = self.editable_text().to_string();
        self.text.push_str(terminator);
        self.edit_start = self.text.len();
        self.caret = self.text.len();
        self.assert_edit_invariants();
        line
    }

    pub fn move_caret_home(&mut self) { self.caret = self.edit_start; }

    pub fn move_caret_end(&mut self) { self.caret = self.text.len(); }

    /// One grapheme left. Stops at `edit_start` while in the editable line.
    pub fn move_caret_left(&mut self) {
        let floor = if self.is_caret_editable() { self.edit_start } else { 0 };
        if let Some(grapheme) = self.text[floor..self.caret].graphemes(true).next_back() {
            self.caret -= grapheme.len();
        }
    }

    /// One grapheme right, anywhere in the transcript.
    pub fn move_caret_right(&mut self) {
        if let Some(grapheme) = self.text[self.caret..].graphemes(true).next() {
            self.caret += grapheme.len();
        }
    }

    /// Navigation only, so any position is allowed. It is clamped to the transcript and
    /// snapped back to the closest grapheme boundary.
    pub fn move_caret_to(&mut self, position: usize) { self.caret = self.snap(position); }

    /// The text in `range` after snapping it to the transcript.
    #[must_use]
    pub fn text_in(&self, range: Range<usize>) -> &str { &self.text[self.snap_range(range)] }

    fn snap_range(&self, range: Range<usize>) -> Range<usize> {
        let start = self.snap(range.start);
        let end = self.snap(range.end).max(start);
        start..end
    }

    /// Largest grapheme boundary that is `<= position`.
    fn snap(&self, position: usize) -> usize {
        if position >= self.text.len() {
            return self.text.len();
        }
        self.text
            .grapheme_indices(true)
            .map(|(index, _)| index)
            .take_while(|index| *index <= position)
            .last()
            .unwrap_or(0)
    }

    fn assert_invariants(&self) {
        let len = self.text.len();
        assert!(self.edit_start <= len, "edit_start {} > len {len}", self.edit_start);
        assert!(self.caret <= len, "caret {} > len {len}", self.caret);
        assert!(self.text.is_char_boundary(self.edit_start));
        assert!(self.text.is_char_boundary(self.caret));
    }

    /// Edits of the editable line must leave the caret inside it.
    fn assert_edit_invariants(&self) {
        self.assert_invariants();
        assert!(
            self.edit_start <= self.caret,
            "caret {} < edit_start {}",
            self.caret,
            self.edit_start
        );
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}|{}", self.history_text(), self.editable_text())
    }
}
