// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{ops::Range,
          sync::{Arc, MutexGuard, PoisonError},
          time::{Duration, Instant}};

use crate::{DisplaySurface, StdMutex, StyleHint};

/// One call made on a [`DisplaySurfaceMock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    AppendText {
        at: usize,
        text: String,
        style: StyleHint,
    },
    ReplaceRange {
        range: Range<usize>,
        text: String,
    },
    CaretMoved(usize),
    Error(String),
}

#[derive(Debug, Default)]
pub struct DisplaySurfaceMockInner {
    pub events: Vec<SurfaceEvent>,
    /// The transcript as rebuilt from the reported mutations.
    pub mirror: String,
    pub caret: usize,
}

/// You can safely clone this struct, since it only contains an
/// `Arc<StdMutex<DisplaySurfaceMockInner>>`. Hand one clone to the console and keep
/// another to inspect what the console reported.
///
/// Besides recording every call, it applies them to a `mirror` string. If the console
/// reports correctly, the mirror always equals the transcript.
#[derive(Debug, Clone, Default)]
pub struct DisplaySurfaceMock {
    pub inner: Arc<StdMutex<DisplaySurfaceMockInner>>,
}

impl DisplaySurfaceMock {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, DisplaySurfaceMockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn events(&self) -> Vec<SurfaceEvent> { self.lock().events.clone() }

    #[must_use]
    pub fn mirror_text(&self) -> String { self.lock().mirror.clone() }

    #[must_use]
    pub fn caret(&self) -> usize { self.lock().caret }

    /// All text passed to [`DisplaySurface::append_text()`], in call order.
    #[must_use]
    pub fn appended_text(&self) -> String {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::AppendText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Poll until `predicate` holds for the mirror text, or `timeout` passes. Returns
    /// whether it held. Output arrives on the relay thread, so tests use this instead of
    /// sleeping.
    pub fn wait_for(&self, predicate: impl Fn(&str) -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if predicate(&self.lock().mirror) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl DisplaySurface for DisplaySurfaceMock {
    fn append_text(&self, at: usize, text: &str, style: StyleHint) {
        let mut inner = self.lock();
        inner.mirror.insert_str(at, text);
        inner.events.push(SurfaceEvent::AppendText {
            at,
            text: text.to_string(),
            style,
        });
    }

    fn replace_range(&self, range: Range<usize>, text: &str) {
        let mut inner = self.lock();
        inner.mirror.replace_range(range.clone(), text);
        inner.events.push(SurfaceEvent::ReplaceRange {
            range,
            text: text.to_string(),
        });
    }

    fn notify_caret_moved(&self, caret: usize) {
        let mut inner = self.lock();
        inner.caret = caret;
        inner.events.push(SurfaceEvent::CaretMoved(caret));
    }

    fn notify_error(&self, message: &str) {
        self.lock().events.push(SurfaceEvent::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_clones_share_events_and_mirror() {
        let surface = DisplaySurfaceMock::new();
        let surface_clone = surface.clone();

        surface.append_text(0, "hllo", StyleHint::Plain);
        surface.replace_range(1..1, "e");
        surface.replace_range(4..5, "");
        surface.notify_caret_moved(4);

        assert_eq!(surface_clone.mirror_text(), "hell");
        assert_eq!(surface_clone.caret(), 4);
        assert_eq!(surface_clone.appended_text(), "hllo");
        assert_eq!(surface_clone.events().len(), 4);
    }
}
