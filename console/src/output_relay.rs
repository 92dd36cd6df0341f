// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The loop that moves interpreter output from the output pipe into the transcript.
//!
//! ```text
//! output pipe ──read(chunk)──► utf-8 decode ──► insert at edit_start ──► append_text
//!     │                          (carry an incomplete tail to the next chunk)
//!     └── end of stream ──► end of stream notice, then exit
//! ```

use std::thread::JoinHandle;

use crate::{ConsoleConfig, ConsoleError, ConsoleResult, PipeReader, SafeConsoleState,
            SafeDisplaySurface, StyleHint, lock_state};

/// How the relay loop ended. Returned from the relay thread's [`JoinHandle`].
#[derive(Debug)]
pub enum RelayExit {
    /// The output pipe was closed and drained. The end of stream notice was printed.
    EndOfStream,
    /// The loop stopped on an error, which was also sent to
    /// [`crate::DisplaySurface::notify_error()`].
    Failed(ConsoleError),
}

impl RelayExit {
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool { matches!(self, RelayExit::EndOfStream) }
}

#[derive(Debug)]
pub struct OutputRelay {
    reader: PipeReader,
    state: SafeConsoleState,
    surface: SafeDisplaySurface,
    read_chunk_size: usize,
    end_of_stream_notice: String,
    /// Bytes of a UTF-8 sequence that was split across reads.
    pending: Vec<u8>,
}

impl OutputRelay {
    #[must_use]
    pub fn new(
        reader: PipeReader,
        state: SafeConsoleState,
        surface: SafeDisplaySurface,
        config: &ConsoleConfig,
    ) -> Self {
        Self {
            reader,
            state,
            surface,
            read_chunk_size: config.read_chunk_size.max(1),
            end_of_stream_notice: config.end_of_stream_notice.clone(),
            pending: vec![],
        }
    }

    /// Run [`Self::run()`] on a new OS thread called `thread_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::ThreadSpawn`] if the OS refuses to create the thread.
    pub fn spawn(self, thread_name: &str) -> ConsoleResult<JoinHandle<RelayExit>> {
        let handle = std::thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || self.run())
            .map_err(ConsoleError::ThreadSpawn)?;
        tracing::debug!(message = "output relay started", thread_name);
        Ok(handle)
    }

    /// Relay until the output pipe reaches end of stream, or until an error.
    pub fn run(mut self) -> RelayExit {
        loop {
            match self.reader.read(self.read_chunk_size) {
                Ok(chunk) if chunk.is_empty() => return self.finish(),
                Ok(chunk) => {
                    if let Err(error) = self.relay_chunk(&chunk) {
                        return self.fail(error);
                    }
                }
                Err(ConsoleError::PipeClosed) => return self.finish(),
                Err(error) => return self.fail(error),
            }
        }
    }

    /// Text before a malformed sequence is relayed before the error is returned.
    fn relay_chunk(&mut self, chunk: &[u8]) -> ConsoleResult<()> {
        self.pending.extend_from_slice(chunk);
        let text = decode_complete_prefix(&mut self.pending);
        if !text.is_empty() {
            let mut state = lock_state(&self.state);
            state.insert_output(&text, StyleHint::Plain, self.surface.as_ref());
        }
        check_decodable(&self.pending)
    }

    fn finish(self) -> RelayExit {
        if !self.pending.is_empty() {
            // Stream ended in the middle of a UTF-8 sequence.
            let error = std::str::from_utf8(&self.pending)
                .err()
                .map_or(ConsoleError::PipeClosed, ConsoleError::from);
            return self.fail(error);
        }

        let mut state = lock_state(&self.state);
        state.insert_output(
            &self.end_of_stream_notice,
            StyleHint::Notice,
            self.surface.as_ref(),
        );
        tracing::debug!(message = "output relay reached end of stream");
        RelayExit::EndOfStream
    }

    fn fail(self, error: ConsoleError) -> RelayExit {
        tracing::warn!(message = "output relay stopped", error = %error);
        {
            let _state = lock_state(&self.state);
            self.surface.notify_error(&error.to_string());
        }
        RelayExit::Failed(error)
    }
}

/// Remove and return the longest prefix of `pending` that is valid UTF-8. Whatever
/// follows it (an incomplete sequence, or malformed bytes) stays in `pending`.
pub fn decode_complete_prefix(pending: &mut Vec<u8>) -> String {
    let valid_up_to = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(error) => error.valid_up_to(),
    };
    let tail = pending.split_off(valid_up_to);
    let complete = std::mem::replace(pending, tail);
    // Valid by construction.
    String::from_utf8(complete).unwrap_or_default()
}

/// Check the bytes left over by [`decode_complete_prefix()`]. An incomplete trailing
/// sequence is fine, the next chunk may finish it.
///
/// # Errors
///
/// Returns [`ConsoleError::MalformedDecode`] if `pending` contains bytes that can never
/// be valid UTF-8. `valid_up_to` counts from the start of `pending`.
pub fn check_decodable(pending: &[u8]) -> ConsoleResult<()> {
    match std::str::from_utf8(pending) {
        Err(error) if error.error_len().is_some() => Err(error.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{ConsoleState, DisplaySurfaceMock, SurfaceEvent, pipe};

    fn spawn_relay(
        chunk_size: usize,
    ) -> (crate::PipeWriter, SafeConsoleState, DisplaySurfaceMock, JoinHandle<RelayExit>)
    {
        let (output_writer, output_reader) = pipe(Duration::from_millis(10));
        let state = ConsoleState::new_safe();
        let surface = DisplaySurfaceMock::new();
        let config = ConsoleConfig {
            read_chunk_size: chunk_size,
            ..ConsoleConfig::default()
        };
        let handle = OutputRelay::new(
            output_reader,
            Arc::clone(&state),
            Arc::new(surface.clone()),
            &config,
        )
        .spawn("test-output-relay")
        .unwrap();
        (output_writer, state, surface, handle)
    }

    #[test]
    fn test_decode_keeps_incomplete_tail() {
        let bytes = "né".as_bytes();
        let mut pending = bytes[..2].to_vec();
        assert_eq!(decode_complete_prefix(&mut pending), "n");
        assert_eq!(pending, vec![bytes[1]]);
        assert!(check_decodable(&pending).is_ok());

        pending.push(bytes[2]);
        assert_eq!(decode_complete_prefix(&mut pending), "é");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_decode_stops_at_invalid_bytes() {
        let mut pending = vec![b'o', b'k', 0xff, b'!'];
        assert_eq!(decode_complete_prefix(&mut pending), "ok");
        assert_eq!(pending, vec![0xff, b'!']);
        assert!(matches!(
            check_decodable(&pending),
            Err(ConsoleError::MalformedDecode { valid_up_to: 0, .. })
        ));
    }

    #[test]
    fn test_split_multibyte_sequences_are_relayed_intact() {
        // Chunks of 1 byte split every multibyte character.
        let (output_writer, state, surface, handle) = spawn_relay(1);
        output_writer.write_text("¡héllo 🙏!\n").unwrap();
        output_writer.close();

        assert!(handle.join().unwrap().is_end_of_stream());
        assert_eq!(
            lock_state(&state).transcript.as_str(),
            "¡héllo 🙏!\nConsole: Input closed...\n"
        );
        assert_eq!(surface.mirror_text(), lock_state(&state).transcript.as_str());
    }

    #[test]
    fn test_invalid_output_is_reported_and_stops_relay() {
        let (output_writer, state, surface, handle) = spawn_relay(256);
        output_writer.write_bytes(&[b'a', 0xff]).unwrap();

        let exit = handle.join().unwrap();

        assert!(matches!(
            exit,
            RelayExit::Failed(ConsoleError::MalformedDecode { .. })
        ));
        assert_eq!(surface.errors().len(), 1);
        // Text before the malformed byte still made it.
        assert_eq!(surface.appended_text(), "a");
        assert_eq!(lock_state(&state).transcript.as_str(), "a");
    }

    #[test]
    fn test_stopped_relay_rejects_further_output() {
        let (output_writer, _state, surface, handle) = spawn_relay(256);
        output_writer.write_bytes(&[0xff]).unwrap();
        assert!(!handle.join().unwrap().is_end_of_stream());

        assert!(output_writer.is_closed());
        assert!(matches!(
            output_writer.write_bytes(&[b'x'; 1024]),
            Err(ConsoleError::PipeClosed)
        ));
        assert_eq!(surface.errors().len(), 1);
    }

    #[test]
    fn test_end_of_stream_notice() {
        let (output_writer, _state, surface, handle) = spawn_relay(256);
        output_writer.close();

        assert!(handle.join().unwrap().is_end_of_stream());
        assert_eq!(
            surface.events(),
            vec![SurfaceEvent::AppendText {
                at: 0,
                text: "Console: Input closed...\n".into(),
                style: StyleHint::Notice,
            }]
        );
    }

    #[test]
    fn test_output_mid_edit_lands_before_edit_start() {
        let (output_writer, state, surface, handle) = spawn_relay(256);
        {
            let mut state = lock_state(&state);
            state.transcript.insert_at_caret("partial");
        }

        output_writer.write_text("2\n").unwrap();
        surface.wait_for(|mirror| mirror.contains("2\n"), Duration::from_secs(5));

        {
            let state = lock_state(&state);
            assert_eq!(state.transcript.as_str(), "2\npartial");
            assert_eq!(state.transcript.edit_start(), 2);
            assert_eq!(state.transcript.editable_text(), "partial");
            assert_eq!(state.transcript.caret(), 9);
        }

        output_writer.close();
        handle.join().unwrap();
    }
}
