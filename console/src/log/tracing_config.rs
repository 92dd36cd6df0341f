// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::fmt::Debug;

use tracing_core::LevelFilter;

use crate::PipeWriter;

pub const DEFAULT_LOG_FILE_NAME: &str = "pipe_console.log";

/// Configure where tracing output goes, and at what level. Install it with
/// [`crate::init()`] (global) or [`TracingConfig::install_thread_local()`] (tests).
///
/// Fields:
/// - `writer_config`: [`WriterConfig`] to choose where to write the logs.
/// - `level_filter`: [`LevelFilter`] to use. [`LevelFilter::OFF`] disables logging.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
}

/// - `String` is the log file path, eg: `/tmp/pipe_console.log`.
/// - [`DisplayPreference`] is where display output goes.
#[derive(Debug, Clone)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    File(String),
    DisplayAndFile(DisplayPreference, String),
}

/// `TRACE` events from these targets are emitted for every chunk that moves through the
/// output pipe (or lands in the transcript), so [`DisplayPreference::OutputSink`] never
/// writes them. Otherwise every relayed log line would log another one.
pub const OUTPUT_SINK_EXCLUDED_TARGETS: [&str; 3] = [
    "r3bl_console::pipe",
    "r3bl_console::output_relay",
    "r3bl_console::line_discipline::console_state",
];

/// [`DisplayPreference::OutputSink`] routes log lines into a console's own output pipe,
/// so they show up in the transcript above the editable line. `TRACE` events from
/// [`OUTPUT_SINK_EXCLUDED_TARGETS`] are left out.
#[derive(Clone)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
    OutputSink(PipeWriter),
}

impl Debug for DisplayPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayPreference::Stdout => write!(f, "Stdout"),
            DisplayPreference::Stderr => write!(f, "Stderr"),
            DisplayPreference::OutputSink(writer) => write!(f, "OutputSink({})", writer.id),
        }
    }
}

impl TracingConfig {
    pub fn new_display(preferred_display: DisplayPreference, level_filter: LevelFilter) -> Self {
        Self {
            writer_config: WriterConfig::Display(preferred_display),
            level_filter,
        }
    }

    /// Log to `maybe_file_path` (or [`DEFAULT_LOG_FILE_NAME`]) only.
    pub fn new_file(maybe_file_path: Option<String>, level_filter: LevelFilter) -> Self {
        Self {
            writer_config: WriterConfig::File(
                maybe_file_path.unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_string()),
            ),
            level_filter,
        }
    }

    pub fn new_file_and_display(
        maybe_file_path: Option<String>,
        preferred_display: DisplayPreference,
        level_filter: LevelFilter,
    ) -> Self {
        Self {
            writer_config: WriterConfig::DisplayAndFile(
                preferred_display,
                maybe_file_path.unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_string()),
            ),
            level_filter,
        }
    }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.level_filter == LevelFilter::OFF || matches!(self.writer_config, WriterConfig::None)
    }
}
