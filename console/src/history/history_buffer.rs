// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Submitted lines, oldest first, plus a recall cursor used when browsing them.
///
/// `cursor` is `0` when not browsing. When it is `k > 0`, the `k`-th most recent entry
/// is selected. The first time you browse away from the live line, its text is
/// remembered as the `staged_line`, so browsing all the way back down restores it.
///
/// ```text
/// entries:  [ "a", "b", "c" ]      cursor: 0 → live line (staged)
///                          ▲       cursor: 1 → "c"
///                     ▲            cursor: 2 → "b"
///                ▲                 cursor: 3 → "a"
/// ```
///
/// Duplicates and empty lines are kept. Boundaries are no-ops, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryBuffer {
    entries: Vec<String>,
    cursor: usize,
    staged_line: String,
}

impl HistoryBuffer {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn append(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
        self.cursor = 0;
    }

    /// Step one entry back in time. `current_line` is saved as the staged line when
    /// browsing starts. Returns [`None`] when there is no history at all.
    pub fn recall_older(&mut self, current_line: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        if self.cursor == 0 {
            current_line.clone_into(&mut self.staged_line);
        }

        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }

        self.selected().map(ToString::to_string)
    }

    /// Step one entry forward in time. Stepping past the most recent entry gives back the
    /// staged line. Returns [`None`] when not browsing.
    pub fn recall_newer(&mut self) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }

        self.cursor -= 1;

        match self.cursor {
            0 => Some(self.staged_line.clone()),
            _ => self.selected().map(ToString::to_string),
        }
    }

    pub fn reset_cursor(&mut self) { self.cursor = 0; }

    #[must_use]
    pub fn cursor(&self) -> usize { self.cursor }

    #[must_use]
    pub fn is_browsing(&self) -> bool { self.cursor > 0 }

    #[must_use]
    pub fn staged_line(&self) -> &str { &self.staged_line }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(String::as_str) }

    fn selected(&self) -> Option<&str> {
        match self.cursor {
            0 => None,
            cursor => self
                .entries
                .get(self.entries.len() - cursor)
                .map(String::as_str),
        }
    }
}
