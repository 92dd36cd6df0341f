// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::{Display, Formatter},
          sync::Arc,
          thread::JoinHandle};

use crate::{ConsoleConfig, ConsoleResult, ConsoleState, DisplaySurface, LINE_TERMINATOR,
            LineDiscipline, OutputRelay, PipeReader, PipeWriter, RelayExit,
            ResilientPipe, SafeConsoleState, SafeDisplaySurface, StyleHint, lock_state,
            pipe};

/// Pipe ends to connect a [`Session`] to an interpreter that already has its own pipes.
/// Any end left as [`None`] is created by [`Session::try_new()`], and its opposite end
/// is handed out by [`Session::take_command_source()`] or [`Session::output_sink()`].
#[derive(Debug, Default)]
pub struct SessionPipes {
    /// Where submitted lines are written.
    pub maybe_command_writer: Option<PipeWriter>,
    /// Where interpreter output is read from.
    pub maybe_output_reader: Option<PipeReader>,
}

/// Owns everything a console needs: the shared state, the [`LineDiscipline`], both
/// pipes, and the [`OutputRelay`] thread.
///
/// Dropping a session closes both pipes and joins the relay thread. Call
/// [`Self::shutdown()`] to do that explicitly and get the [`RelayExit`].
#[derive(Debug)]
pub struct Session {
    config: ConsoleConfig,
    state: SafeConsoleState,
    surface: SafeDisplaySurface,
    line_discipline: LineDiscipline,
    maybe_command_source: Option<PipeReader>,
    maybe_output_sink: Option<PipeWriter>,
    output_pipe: Arc<ResilientPipe>,
    maybe_relay_handle: Option<JoinHandle<RelayExit>>,
}

impl Session {
    /// Create the session and start its [`OutputRelay`] thread.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsoleError::ThreadSpawn`] if the relay thread can't be started.
    pub fn try_new(
        config: ConsoleConfig,
        surface: impl DisplaySurface + 'static,
        pipes: SessionPipes,
    ) -> ConsoleResult<Self> {
        let config = config.normalized();
        let surface: SafeDisplaySurface = Arc::new(surface);
        let state = ConsoleState::new_safe();

        let (command_writer, maybe_command_source) = match pipes.maybe_command_writer {
            Some(command_writer) => (command_writer, None),
            None => {
                let (command_writer, command_source) = pipe(config.poll_interval());
                (command_writer, Some(command_source))
            }
        };

        let (output_reader, maybe_output_sink) = match pipes.maybe_output_reader {
            Some(output_reader) => (output_reader, None),
            None => {
                let (output_sink, output_reader) = pipe(config.poll_interval());
                (output_reader, Some(output_sink))
            }
        };

        let output_pipe = output_reader.shared_pipe();

        let line_discipline = LineDiscipline::new(
            Arc::clone(&state),
            Arc::clone(&surface),
            command_writer,
            config.empty_line_sentinel.clone(),
        );

        let relay_handle =
            OutputRelay::new(output_reader, Arc::clone(&state), Arc::clone(&surface), &config)
                .spawn(&config.relay_thread_name)?;

        tracing::debug!(
            message = "session created",
            owns_command_source = maybe_command_source.is_some(),
            owns_output_sink = maybe_output_sink.is_some()
        );

        Ok(Self {
            config,
            state,
            surface,
            line_discipline,
            maybe_command_source,
            maybe_output_sink,
            output_pipe,
            maybe_relay_handle: Some(relay_handle),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig { &self.config }

    #[must_use]
    pub fn state(&self) -> &SafeConsoleState { &self.state }

    /// Apply edit intents through this.
    #[must_use]
    pub fn line_discipline(&self) -> &LineDiscipline { &self.line_discipline }

    /// The readable end of the command pipe, for the interpreter. Only available once,
    /// and only if the session created the command pipe.
    pub fn take_command_source(&mut self) -> Option<PipeReader> {
        self.maybe_command_source.take()
    }

    /// A writable end of the output pipe, for the interpreter. Clone it freely, eg: one
    /// per task. Only available if the session created the output pipe.
    #[must_use]
    pub fn output_sink(&self) -> Option<PipeWriter> { self.maybe_output_sink.clone() }

    #[must_use]
    pub fn is_relay_running(&self) -> bool {
        self.maybe_relay_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Print `text` above the editable line, exactly like interpreter output.
    pub fn print(&self, text: &str) { self.print_styled(text, StyleHint::Plain); }

    pub fn println(&self, text: &str) {
        self.print_styled(&format!("{text}{LINE_TERMINATOR}"), StyleHint::Plain);
    }

    pub fn print_styled(&self, text: &str, style: StyleHint) {
        let mut state = lock_state(&self.state);
        state.insert_output(text, style, self.surface.as_ref());
    }

    /// Print `text` styled as an error. This is not reported through
    /// [`DisplaySurface::notify_error()`], it is part of the transcript.
    pub fn error(&self, text: &str) { self.print_styled(text, StyleHint::Error); }

    /// Close both pipes and wait for the relay thread to finish. Anything already written
    /// to the output pipe is still relayed. Returns [`None`] if already shut down, or if
    /// the relay thread panicked.
    pub fn shutdown(&mut self) -> Option<RelayExit> {
        let relay_handle = self.maybe_relay_handle.take()?;

        self.line_discipline.command_writer().close();
        self.output_pipe.close();

        let result = relay_handle.join();
        match &result {
            Ok(exit) => tracing::debug!(message = "session shut down", relay_exit = ?exit),
            Err(_) => tracing::warn!(message = "output relay thread panicked"),
        }
        result.ok()
    }
}

impl Drop for Session {
    fn drop(&mut self) { let _unused = self.shutdown(); }
}

impl Display for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = lock_state(&self.state);
        write!(
            f,
            "r3bl_console::Session[transcript: {} bytes, edit_start: {}, history: {} lines, relay: {}]",
            state.transcript.len(),
            state.transcript.edit_start(),
            state.history.len(),
            if self.is_relay_running() { "running" } else { "stopped" }
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{DisplaySurfaceMock, SurfaceEvent};

    fn fast_config() -> ConsoleConfig {
        ConsoleConfig::default().with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_manufactured_pipes_are_handed_out() {
        let mut session =
            Session::try_new(fast_config(), DisplaySurfaceMock::new(), SessionPipes::default())
                .unwrap();

        assert!(session.take_command_source().is_some());
        assert!(session.take_command_source().is_none());
        assert!(session.output_sink().is_some());
        assert!(session.is_relay_running());
    }

    #[test]
    fn test_external_pipes_are_not_handed_out() {
        let (command_writer, command_reader) = pipe(Duration::from_millis(10));
        let (output_writer, output_reader) = pipe(Duration::from_millis(10));
        let surface = DisplaySurfaceMock::new();
        let mut session = Session::try_new(fast_config(), surface.clone(), SessionPipes {
            maybe_command_writer: Some(command_writer),
            maybe_output_reader: Some(output_reader),
        })
        .unwrap();

        assert!(session.take_command_source().is_none());
        assert!(session.output_sink().is_none());

        session.line_discipline().insert_text("x");
        session.line_discipline().submit().unwrap();
        assert_eq!(command_reader.read(16).unwrap(), b"x\n");

        output_writer.write_text("y\n").unwrap();
        assert!(surface.wait_for(|mirror| mirror == "x\ny\n", Duration::from_secs(5)));

        assert!(session.shutdown().unwrap().is_end_of_stream());
        assert!(output_writer.is_closed());
    }

    #[test]
    fn test_print_api_lands_before_editable_line() {
        let surface = DisplaySurfaceMock::new();
        let mut session =
            Session::try_new(fast_config(), surface.clone(), SessionPipes::default())
                .unwrap();
        session.line_discipline().insert_text("typing");

        session.print("a");
        session.println("b");
        session.error("oops\n");
        session.print_styled("", StyleHint::Notice);

        assert_eq!(surface.mirror_text(), "ab\noops\ntyping");
        assert!(surface.events().contains(&SurfaceEvent::AppendText {
            at: 3,
            text: "oops\n".into(),
            style: StyleHint::Error,
        }));
        assert_eq!(session.line_discipline().current_line(), "typing");

        session.shutdown();
    }

    #[test]
    fn test_shutdown_prints_notice_once_and_is_idempotent() {
        let surface = DisplaySurfaceMock::new();
        let mut session =
            Session::try_new(fast_config(), surface.clone(), SessionPipes::default())
                .unwrap();
        let output_sink = session.output_sink().unwrap();
        output_sink.write_text("bye\n").unwrap();

        assert!(session.shutdown().unwrap().is_end_of_stream());
        assert!(session.shutdown().is_none());
        assert!(!session.is_relay_running());
        assert_eq!(surface.mirror_text(), "bye\nConsole: Input closed...\n");
        assert!(session.line_discipline().submit().is_err());
    }

    #[test]
    fn test_config_is_normalized() {
        let config = ConsoleConfig {
            empty_line_sentinel: String::new(),
            ..fast_config()
        };
        let mut session =
            Session::try_new(config, DisplaySurfaceMock::new(), SessionPipes::default())
                .unwrap();
        let command_source = session.take_command_source().unwrap();

        assert_eq!(session.config().empty_line_sentinel, ";");
        session.line_discipline().submit().unwrap();
        assert_eq!(command_source.read(256).unwrap(), b";\n");
    }

    #[test]
    fn test_display() {
        let session =
            Session::try_new(fast_config(), DisplaySurfaceMock::new(), SessionPipes::default())
                .unwrap();
        session.println("hi");
        let display = session.to_string();
        assert!(display.starts_with("r3bl_console::Session[transcript: 3 bytes"));
    }
}
