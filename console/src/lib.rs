// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_console
//!
//! An interactive, line oriented console that sits between a human editing a line of
//! text and an "interpreter" that runs on its own thread(s).
//!
//! ```text
//!  Display Surface ──EditIntent──► LineDiscipline ──"cmd\n"──► command pipe ──► Interpreter
//!        ▲                              │                                            │
//!        │                              ▼                                            │
//!        └──── append_text ◄──── OutputRelay ◄──── output pipe ◄──── any bytes ◄─────┘
//! ```
//!
//! The console never renders anything. All it does is:
//!
//! 1. Keep a [`Transcript`], split at `edit_start` into an immutable history region and
//!    an editable current line.
//! 2. Turn [`EditIntent`]s into transcript mutations (see [`LineDiscipline`]), including
//!    [`HistoryBuffer`] recall and submitting completed lines to the interpreter.
//! 3. Relay whatever the interpreter writes back into the transcript, *above* the line
//!    that is being edited (see [`OutputRelay`]).
//!
//! Rendering is delegated to a [`DisplaySurface`] implementation, which is told about
//! every mutation in the order it happened.
//!
//! # Pipes
//!
//! The interpreter is connected using two [`ResilientPipe`]s. They differ from an OS
//! pipe in one important way: their liveness is never tied to the thread that last
//! wrote to them. Any number of short lived writers (threads, tokio tasks) can write to
//! the output sink, and the reader never sees a "broken pipe" until someone explicitly
//! calls close.
//!
//! # Example
//!
//! ```no_run
//! use std::io::{BufRead as _, BufReader};
//! use r3bl_console::{ConsoleConfig, DisplaySurfaceMock, Session, SessionPipes};
//!
//! # fn main() -> miette::Result<()> {
//! let surface = DisplaySurfaceMock::new();
//! let mut session =
//!     Session::try_new(ConsoleConfig::default(), surface.clone(), SessionPipes::default())?;
//!
//! let command_source = session.take_command_source().unwrap();
//! let output_sink = session.output_sink().unwrap();
//!
//! std::thread::spawn(move || {
//!     for line in BufReader::new(command_source).lines().map_while(Result::ok) {
//!         let _ = output_sink.write_text(&format!("you said: {line}\n"));
//!     }
//! });
//!
//! session.line_discipline().insert_text("hello");
//! session.line_discipline().submit()?;
//! session.shutdown();
//! # Ok(())
//! # }
//! ```

// https://github.com/rust-lang/rust-clippy
// https://rust-lang.github.io/rust-clippy/master/index.html
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach sources.
pub mod config;
pub mod display_surface;
pub mod error;
pub mod history;
pub mod line_discipline;
pub mod log;
pub mod output_relay;
pub mod pipe;
pub mod session;
pub mod test_fixtures;

// Re-export.
pub use config::*;
pub use display_surface::*;
pub use error::*;
pub use history::*;
pub use line_discipline::*;
pub use log::*;
pub use output_relay::*;
pub use pipe::*;
pub use session::*;
pub use test_fixtures::*;

// Type aliases.
use std::sync::Arc;

pub type StdMutex<T> = std::sync::Mutex<T>;

/// Transcript, caret, `edit_start` and history live behind this one lock. It is shared by
/// the [`LineDiscipline`], the [`OutputRelay`] thread and the [`Session`] print API.
pub type SafeConsoleState = Arc<StdMutex<ConsoleState>>;

pub type SafeDisplaySurface = Arc<dyn DisplaySurface>;

// Constants.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 750;
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;
pub const DEFAULT_EMPTY_LINE_SENTINEL: &str = ";";
pub const DEFAULT_END_OF_STREAM_NOTICE: &str = "Console: Input closed...\n";
pub const DEFAULT_RELAY_THREAD_NAME: &str = "console-output-relay";
pub const LINE_TERMINATOR: &str = "\n";
pub const INTERRUPT_ECHO: &str = "^C";
