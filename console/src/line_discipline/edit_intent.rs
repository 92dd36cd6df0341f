// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{ops::Range, str::FromStr};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use strum_macros::{AsRefStr, EnumString};

use crate::{ConsoleResult, LineDiscipline};

/// Everything a [`crate::DisplaySurface`] can ask the console to do with the editable
/// line. Apply one with [`LineDiscipline::apply()`].
///
/// The names (eg: `up`, `clear`) parse with [`FromStr`], which the demo binary uses for
/// its `\name [arg]` commands. See [`EditIntent::parse_command()`].
#[derive(Debug, Clone, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EditIntent {
    #[strum(serialize = "insert", serialize = "insert_text")]
    InsertText(String),
    #[strum(serialize = "backspace", serialize = "delete_backward")]
    DeleteBackward,
    #[strum(serialize = "delete", serialize = "delete_forward")]
    DeleteForward,
    #[strum(serialize = "home")]
    MoveCaretHome,
    #[strum(serialize = "end")]
    MoveCaretEnd,
    #[strum(serialize = "left")]
    MoveCaretLeft,
    #[strum(serialize = "right")]
    MoveCaretRight,
    #[strum(serialize = "to")]
    MoveCaretTo(usize),
    #[strum(serialize = "up", serialize = "history_up")]
    HistoryUp,
    #[strum(serialize = "down", serialize = "history_down")]
    HistoryDown,
    #[strum(serialize = "clear", serialize = "clear_current_line")]
    ClearCurrentLine,
    /// Ctrl+C with nothing selected. A surface with a selection should send
    /// [`EditIntent::Copy`] instead.
    Interrupt,
    Submit,
    Copy(Range<usize>),
    Cut(Range<usize>),
    Paste(String),
}

/// What happened as a result of [`LineDiscipline::apply()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    Continue,
    /// Text for the clipboard, from [`EditIntent::Copy`] or [`EditIntent::Cut`].
    Copied(String),
    /// The statement sent to the interpreter.
    Submitted(String),
}

impl EditIntent {
    /// Parse `name [arg]`, eg: `up`, `to 3`, `cut 0..4`, `paste hello world`. Returns
    /// [`None`] for unknown names, and for missing or invalid arguments.
    #[must_use]
    pub fn parse_command(command: &str) -> Option<Self> {
        let (name, arg) = match command.trim().split_once(' ') {
            Some((name, arg)) => (name, arg.trim()),
            None => (command.trim(), ""),
        };

        match EditIntent::from_str(name).ok()? {
            EditIntent::InsertText(_) => Some(EditIntent::InsertText(arg.to_string())),
            EditIntent::Paste(_) => Some(EditIntent::Paste(arg.to_string())),
            EditIntent::MoveCaretTo(_) => arg.parse().ok().map(EditIntent::MoveCaretTo),
            EditIntent::Copy(_) => parse_range(arg).map(EditIntent::Copy),
            EditIntent::Cut(_) => parse_range(arg).map(EditIntent::Cut),
            it => Some(it),
        }
    }
}

fn parse_range(arg: &str) -> Option<Range<usize>> {
    let (start, end) = arg.split_once("..")?;
    Some(start.trim().parse().ok()?..end.trim().parse().ok()?)
}

impl LineDiscipline {
    /// Dispatch a single [`EditIntent`].
    ///
    /// # Errors
    ///
    /// Only [`EditIntent::Submit`] can fail, see [`LineDiscipline::submit()`].
    pub fn apply(&self, intent: EditIntent) -> ConsoleResult<IntentOutcome> {
        tracing::trace!(message = "apply edit intent", intent = intent.as_ref());

        match intent {
            EditIntent::InsertText(text) => self.insert_text(&text),
            EditIntent::DeleteBackward => self.delete_backward(),
            EditIntent::DeleteForward => self.delete_forward(),
            EditIntent::MoveCaretHome => self.move_caret_home(),
            EditIntent::MoveCaretEnd => self.move_caret_end(),
            EditIntent::MoveCaretLeft => self.move_caret_left(),
            EditIntent::MoveCaretRight => self.move_caret_right(),
            EditIntent::MoveCaretTo(position) => self.move_caret_to(position),
            EditIntent::HistoryUp => self.history_up(),
            EditIntent::HistoryDown => self.history_down(),
            EditIntent::ClearCurrentLine => self.clear_current_line(),
            EditIntent::Interrupt => self.interrupt(),
            EditIntent::Paste(text) => self.paste(&text),
            EditIntent::Copy(selection) => {
                return Ok(IntentOutcome::Copied(self.copy(selection)));
            }
            EditIntent::Cut(selection) => {
                return Ok(IntentOutcome::Copied(self.cut(selection)));
            }
            EditIntent::Submit => return self.submit().map(IntentOutcome::Submitted),
        }

        Ok(IntentOutcome::Continue)
    }
}

/// Map a crossterm key press to an [`EditIntent`], for surfaces that read keys from a
/// terminal. Key releases, function keys, bare modifiers and unbound control
/// combinations map to [`None`].
#[must_use]
pub fn key_to_edit_intent(key_event: KeyEvent) -> Option<EditIntent> {
    if key_event.kind == KeyEventKind::Release {
        return None;
    }

    match key_event.modifiers {
        KeyModifiers::CONTROL => match key_event.code {
            KeyCode::Char('u') => Some(EditIntent::ClearCurrentLine),
            KeyCode::Char('c') => Some(EditIntent::Interrupt),
            _ => None,
        },
        KeyModifiers::NONE | KeyModifiers::SHIFT => match key_event.code {
            KeyCode::Enter => Some(EditIntent::Submit),
            KeyCode::Up => Some(EditIntent::HistoryUp),
            KeyCode::Down => Some(EditIntent::HistoryDown),
            KeyCode::Backspace => Some(EditIntent::DeleteBackward),
            KeyCode::Delete => Some(EditIntent::DeleteForward),
            KeyCode::Left => Some(EditIntent::MoveCaretLeft),
            KeyCode::Right => Some(EditIntent::MoveCaretRight),
            KeyCode::Home => Some(EditIntent::MoveCaretHome),
            KeyCode::End => Some(EditIntent::MoveCaretEnd),
            KeyCode::Char(character) => Some(EditIntent::InsertText(character.to_string())),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::{ConsoleState, DisplaySurfaceMock, pipe};

    #[test_case(KeyCode::Enter, KeyModifiers::NONE, Some(EditIntent::Submit); "enter")]
    #[test_case(KeyCode::Up, KeyModifiers::NONE, Some(EditIntent::HistoryUp); "up")]
    #[test_case(KeyCode::Down, KeyModifiers::NONE, Some(EditIntent::HistoryDown); "down")]
    #[test_case(KeyCode::Backspace, KeyModifiers::NONE, Some(EditIntent::DeleteBackward); "backspace")]
    #[test_case(KeyCode::Delete, KeyModifiers::NONE, Some(EditIntent::DeleteForward); "delete")]
    #[test_case(KeyCode::Left, KeyModifiers::NONE, Some(EditIntent::MoveCaretLeft); "left")]
    #[test_case(KeyCode::Right, KeyModifiers::NONE, Some(EditIntent::MoveCaretRight); "right")]
    #[test_case(KeyCode::Home, KeyModifiers::NONE, Some(EditIntent::MoveCaretHome); "home")]
    #[test_case(KeyCode::End, KeyModifiers::NONE, Some(EditIntent::MoveCaretEnd); "end")]
    #[test_case(KeyCode::Char('u'), KeyModifiers::CONTROL, Some(EditIntent::ClearCurrentLine); "ctrl u")]
    #[test_case(KeyCode::Char('x'), KeyModifiers::NONE, Some(EditIntent::InsertText("x".into())); "char")]
    #[test_case(KeyCode::Char('X'), KeyModifiers::SHIFT, Some(EditIntent::InsertText("X".into())); "shifted char")]
    #[test_case(KeyCode::Char('c'), KeyModifiers::CONTROL, Some(EditIntent::Interrupt); "ctrl c")]
    #[test_case(KeyCode::Char('z'), KeyModifiers::CONTROL, None; "unbound ctrl")]
    #[test_case(KeyCode::F(5), KeyModifiers::NONE, None; "function key")]
    #[test_case(KeyCode::Char('a'), KeyModifiers::ALT, None; "alt char")]
    fn test_key_to_edit_intent(
        code: KeyCode,
        modifiers: KeyModifiers,
        expected: Option<EditIntent>,
    ) {
        assert_eq!(key_to_edit_intent(KeyEvent::new(code, modifiers)), expected);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut key_event = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        key_event.kind = KeyEventKind::Release;
        assert_eq!(key_to_edit_intent(key_event), None);
    }

    #[test_case("up", Some(EditIntent::HistoryUp); "short name")]
    #[test_case("history_down", Some(EditIntent::HistoryDown); "snake case name")]
    #[test_case("to 3", Some(EditIntent::MoveCaretTo(3)); "position")]
    #[test_case("to x", None; "bad position")]
    #[test_case("cut 1..4", Some(EditIntent::Cut(1..4)); "range")]
    #[test_case("paste a b", Some(EditIntent::Paste("a b".into())); "text with spaces")]
    #[test_case("interrupt", Some(EditIntent::Interrupt); "interrupt")]
    #[test_case("frobnicate", None; "unknown")]
    fn test_parse_command(command: &str, expected: Option<EditIntent>) {
        assert_eq!(EditIntent::parse_command(command), expected);
    }

    #[test]
    fn test_apply_dispatches_intents() {
        let (command_writer, command_reader) = pipe(Duration::from_millis(10));
        let line_discipline = LineDiscipline::new(
            ConsoleState::new_safe(),
            Arc::new(DisplaySurfaceMock::new()),
            command_writer,
            ";",
        );

        for character in "2*3".chars() {
            let intent = key_to_edit_intent(KeyEvent::new(
                KeyCode::Char(character),
                KeyModifiers::NONE,
            ))
            .unwrap();
            assert_eq!(line_discipline.apply(intent).unwrap(), IntentOutcome::Continue);
        }

        assert_eq!(
            line_discipline.apply(EditIntent::Copy(0..1)).unwrap(),
            IntentOutcome::Copied("2".into())
        );
        assert_eq!(
            line_discipline.apply(EditIntent::Submit).unwrap(),
            IntentOutcome::Submitted("2*3".into())
        );
        assert_eq!(command_reader.read(256).unwrap(), b"2*3\n");
    }
}
