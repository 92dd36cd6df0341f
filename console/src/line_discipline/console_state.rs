// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::sync::{Arc, MutexGuard, PoisonError};

use crate::{DisplaySurface, HistoryBuffer, SafeConsoleState, StdMutex, StyleHint,
            Transcript};

/// State that is mutated by both the edit thread and the [`crate::OutputRelay`] thread.
/// Always accessed through a [`SafeConsoleState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleState {
    pub transcript: Transcript,
    pub history: HistoryBuffer,
}

impl ConsoleState {
    #[must_use]
    pub fn new_safe() -> SafeConsoleState { Arc::new(StdMutex::new(ConsoleState::default())) }

    /// Put `text` above the editable line and tell the `surface`. Used for relayed
    /// interpreter output and for the [`crate::Session`] print API alike.
    pub fn insert_output(
        &mut self,
        text: &str,
        style: StyleHint,
        surface: &dyn DisplaySurface,
    ) {
        if text.is_empty() {
            return;
        }
        let caret_before = self.transcript.caret();
        let at = self.transcript.insert_before_edit_start(text);
        surface.append_text(at, text, style);
        if self.transcript.caret() != caret_before {
            surface.notify_caret_moved(self.transcript.caret());
        }
        tracing::trace!(
            message = "output inserted",
            at,
            bytes = text.len(),
            edit_start = self.transcript.edit_start()
        );
    }
}

/// A panic while holding this lock means an invariant assertion already fired, so the
/// guard is handed back as is.
pub fn lock_state(state: &SafeConsoleState) -> MutexGuard<'_, ConsoleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
