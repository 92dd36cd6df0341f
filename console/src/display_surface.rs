// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::Debug, ops::Range};

/// Advisory styling for a run of text. A surface that can't render colors is free to
/// ignore it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StyleHint {
    #[default]
    Plain,
    Error,
    Notice,
    Fg(u8, u8, u8),
}

/// The renderer and input adapter that the console reports to.
///
/// All positions are byte offsets into the transcript, and always sit on grapheme
/// cluster boundaries. Calls are made while the console state lock is held, so they
/// arrive in exactly the order the mutations happened. An implementation must not call
/// back into the console from inside any of these methods, since that would deadlock.
pub trait DisplaySurface: Debug + Send + Sync {
    /// Text was inserted at byte offset `at`, before the editable line.
    fn append_text(&self, at: usize, text: &str, style: StyleHint);

    /// The bytes in `range` of the editable line were replaced by `text`. An empty range
    /// is an insertion, and an empty `text` is a deletion.
    fn replace_range(&self, range: Range<usize>, text: &str);

    fn notify_caret_moved(&self, caret: usize);

    fn notify_error(&self, message: &str);
}
