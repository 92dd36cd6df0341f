// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Error types for the console. See [`ConsoleError`].
//!
//! Edit boundary violations (deleting into the history region, moving the caret past
//! either end) and history navigation at its boundaries are **not** errors. They are
//! defined no-ops. A caret or `edit_start` outside the transcript is a programming
//! defect, and is asserted (see [`crate::Transcript`]) rather than reported here.

use std::{io, str::Utf8Error};

/// Convenience alias used throughout this crate.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Errors surfaced by the console core.
///
/// | Variant             | Raised by                                               | Retried? |
/// | :------------------ | :------------------------------------------------------ | :------- |
/// | [`PipeClosed`]      | read / write on a closed [`crate::ResilientPipe`]       | Never    |
/// | [`MalformedDecode`] | [`crate::OutputRelay`] when bytes are not UTF-8         | Never    |
/// | [`ThreadSpawn`]     | [`crate::Session::try_new()`] spawning the relay thread | Never    |
/// | [`ConfigParse`]     | [`crate::ConsoleConfig::try_load()`]                    | Never    |
/// | [`IO`]              | everything else                                         | Never    |
///
/// [`PipeClosed`]: Self::PipeClosed
/// [`MalformedDecode`]: Self::MalformedDecode
/// [`ThreadSpawn`]: Self::ThreadSpawn
/// [`ConfigParse`]: Self::ConfigParse
/// [`IO`]: Self::IO
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConsoleError {
    /// Attempted read or write after the pipe was closed.
    #[error("pipe closed")]
    #[diagnostic(
        code(r3bl_console::pipe_closed),
        help("The other end of the console pipe was shut down. Create a new session.")
    )]
    PipeClosed,

    /// Bytes on the output pipe could not be decoded as UTF-8 text.
    #[error("malformed text on output pipe (valid up to byte {valid_up_to})")]
    #[diagnostic(
        code(r3bl_console::malformed_decode),
        help("The interpreter must write UTF-8 encoded text to the output sink")
    )]
    MalformedDecode {
        valid_up_to: usize,
        #[source]
        source: Utf8Error,
    },

    /// [`std::thread::Builder::spawn()`] failed for the output relay thread.
    #[error("failed to spawn output relay thread")]
    #[diagnostic(
        code(r3bl_console::thread_spawn),
        help("The system may have reached its thread limit - check `ulimit -u`")
    )]
    ThreadSpawn(#[source] io::Error),

    /// The console configuration file is not valid JSON for [`crate::ConsoleConfig`].
    #[error("invalid console configuration")]
    #[diagnostic(code(r3bl_console::config_parse))]
    ConfigParse(#[from] serde_json::Error),

    /// An internal I/O error occurred.
    #[error(transparent)]
    #[diagnostic(code(r3bl_console::io))]
    IO(#[from] io::Error),
}

impl ConsoleError {
    #[must_use]
    pub fn is_pipe_closed(&self) -> bool { matches!(self, ConsoleError::PipeClosed) }
}

impl From<Utf8Error> for ConsoleError {
    fn from(source: Utf8Error) -> Self {
        ConsoleError::MalformedDecode {
            valid_up_to: source.valid_up_to(),
            source,
        }
    }
}

/// Lets [`crate::PipeWriter`] and [`crate::PipeReader`] implement the [`std::io`] traits.
impl From<ConsoleError> for io::Error {
    fn from(error: ConsoleError) -> Self {
        match error {
            ConsoleError::PipeClosed => io::Error::new(io::ErrorKind::BrokenPipe, error),
            ConsoleError::IO(inner) => inner,
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_closed_maps_to_broken_pipe() {
        let io_error: io::Error = ConsoleError::PipeClosed.into();
        assert_eq!(io_error.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    #[allow(invalid_from_utf8)]
    fn test_utf8_error_keeps_offset() {
        let bytes = [b'o', b'k', 0xff, b'!'];
        let utf8_error = std::str::from_utf8(&bytes).unwrap_err();
        let error = ConsoleError::from(utf8_error);
        assert!(matches!(
            error,
            ConsoleError::MalformedDecode { valid_up_to: 2, .. }
        ));
        assert!(!error.is_pipe_closed());
    }
}
