// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::ops::Range;

use crate::{ConsoleResult, INTERRUPT_ECHO, LINE_TERMINATOR, PipeWriter, SafeConsoleState,
            SafeDisplaySurface, StyleHint, Transcript, lock_state,
            normalize_empty_line_sentinel};

/// Interprets edit intents against the editable line at the tail of the transcript.
///
/// Every method locks the shared [`SafeConsoleState`], mutates it, and reports the
/// mutation to the [`crate::DisplaySurface`] before the lock is released. No method blocks on
/// the interpreter: [`Self::submit()`] only appends to the command pipe.
///
/// Boundary violations are no-ops:
/// - Deleting into the history region.
/// - Moving past either end of the transcript.
/// - Browsing past either end of the history.
#[derive(Debug, Clone)]
pub struct LineDiscipline {
    state: SafeConsoleState,
    surface: SafeDisplaySurface,
    command_writer: PipeWriter,
    empty_line_sentinel: String,
}

impl LineDiscipline {
    /// An unusable `empty_line_sentinel` is replaced, see
    /// [`crate::normalize_empty_line_sentinel()`].
    #[must_use]
    pub fn new(
        state: SafeConsoleState,
        surface: SafeDisplaySurface,
        command_writer: PipeWriter,
        empty_line_sentinel: impl Into<String>,
    ) -> Self {
        Self {
            state,
            surface,
            command_writer,
            empty_line_sentinel: normalize_empty_line_sentinel(empty_line_sentinel.into()),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SafeConsoleState { &self.state }

    #[must_use]
    pub fn command_writer(&self) -> &PipeWriter { &self.command_writer }

    /// Snapshot of the editable line.
    #[must_use]
    pub fn current_line(&self) -> String {
        lock_state(&self.state).transcript.editable_text().to_string()
    }

    pub fn insert_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut state = lock_state(&self.state);
        let at = state.transcript.insert_at_caret(text);
        self.surface.replace_range(at..at, text);
        self.surface.notify_caret_moved(state.transcript.caret());
    }

    pub fn delete_backward(&self) {
        let mut state = lock_state(&self.state);
        if let Some(range) = state.transcript.delete_backward() {
            self.surface.replace_range(range, "");
            self.surface.notify_caret_moved(state.transcript.caret());
        }
    }

    pub fn delete_forward(&self) {
        let mut state = lock_state(&self.state);
        if let Some(range) = state.transcript.delete_forward() {
            self.surface.replace_range(range, "");
            self.surface.notify_caret_moved(state.transcript.caret());
        }
    }

    pub fn move_caret_home(&self) { self.navigate(Transcript::move_caret_home); }

    pub fn move_caret_end(&self) { self.navigate(Transcript::move_caret_end); }

    pub fn move_caret_left(&self) { self.navigate(Transcript::move_caret_left); }

    pub fn move_caret_right(&self) { self.navigate(Transcript::move_caret_right); }

    pub fn move_caret_to(&self, position: usize) {
        self.navigate(|transcript| transcript.move_caret_to(position));
    }

    fn navigate(&self, move_caret: impl FnOnce(&mut Transcript)) {
        let mut state = lock_state(&self.state);
        let before = state.transcript.caret();
        move_caret(&mut state.transcript);
        let after = state.transcript.caret();
        if before != after {
            self.surface.notify_caret_moved(after);
        }
    }

    pub fn history_up(&self) {
        let mut state = lock_state(&self.state);
        let current_line = state.transcript.editable_text().to_string();
        if let Some(recalled) = state.history.recall_older(&current_line) {
            self.replace_editable(&mut state.transcript, &recalled);
        }
    }

    pub fn history_down(&self) {
        let mut state = lock_state(&self.state);
        if let Some(recalled) = state.history.recall_newer() {
            self.replace_editable(&mut state.transcript, &recalled);
        }
    }

    pub fn clear_current_line(&self) {
        let mut state = lock_state(&self.state);
        state.history.reset_cursor();
        if !state.transcript.editable_text().is_empty() {
            self.replace_editable(&mut state.transcript, "");
        }
    }

    /// Echo [`INTERRUPT_ECHO`] at the end of the editable line. Nothing is sent to the
    /// interpreter.
    pub fn interrupt(&self) {
        self.move_caret_end();
        self.insert_text(INTERRUPT_ECHO);
    }

    fn replace_editable(&self, transcript: &mut Transcript, text: &str) {
        let range = transcript.replace_editable(text);
        self.surface.replace_range(range, text);
        self.surface.notify_caret_moved(transcript.caret());
    }

    /// Send the editable line to the interpreter and start a new one. An empty line is
    /// sent as the empty line sentinel, and is not added to the history. Returns the
    /// statement that was sent (without the line terminator).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsoleError::PipeClosed`] if the command pipe is closed. In that
    /// case nothing changes, and the line is still editable.
    pub fn submit(&self) -> ConsoleResult<String> {
        let mut state = lock_state(&self.state);

        let line = state.transcript.editable_text().to_string();
        let statement = match line.as_str() {
            "" => self.empty_line_sentinel.clone(),
            _ => line.clone(),
        };

        // Written while holding the lock, so the interpreter's reply can't be relayed
        // before the line is committed.
        self.command_writer
            .write_text(&format!("{statement}{LINE_TERMINATOR}"))?;

        if !line.is_empty() {
            state.history.append(line);
        }
        state.history.reset_cursor();

        let at = state.transcript.len();
        state.transcript.commit_line(LINE_TERMINATOR);
        self.surface
            .append_text(at, LINE_TERMINATOR, StyleHint::Plain);
        self.surface.notify_caret_moved(state.transcript.caret());

        tracing::debug!(
            message = "line submitted",
            statement = %statement,
            writer_id = %self.command_writer.id,
            edit_start = state.transcript.edit_start()
        );

        Ok(statement)
    }

    /// Text in `selection`, which may span both regions.
    #[must_use]
    pub fn copy(&self, selection: Range<usize>) -> String {
        lock_state(&self.state).transcript.text_in(selection).to_string()
    }

    /// Like [`Self::copy()`], and also deletes the selection if it lies entirely in the
    /// editable line. Otherwise it degrades to a copy.
    #[must_use]
    pub fn cut(&self, selection: Range<usize>) -> String {
        let mut state = lock_state(&self.state);
        let text = state.transcript.text_in(selection.clone()).to_string();
        if let Some(range) = state.transcript.delete_range(selection) {
            self.surface.replace_range(range, "");
            self.surface.notify_caret_moved(state.transcript.caret());
        }
        text
    }

    /// Insert clipboard `text` into the editable line. A caret in the history region is
    /// moved to the end first.
    pub fn paste(&self, text: &str) { self.insert_text(text); }
}
