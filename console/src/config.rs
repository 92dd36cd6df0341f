// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{ConsoleResult, DEFAULT_EMPTY_LINE_SENTINEL, DEFAULT_END_OF_STREAM_NOTICE,
            DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_CHUNK_SIZE,
            DEFAULT_RELAY_THREAD_NAME, LINE_TERMINATOR};

/// Tunables for a [`crate::Session`]. Every field has a default, so a JSON file only
/// needs to contain the fields you want to change, eg:
///
/// ```json
/// { "poll_interval_ms": 100, "empty_line_sentinel": "pass" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// How often a blocked [`crate::PipeReader::read()`] re-checks the buffer, even if
    /// no wakeup arrived.
    pub poll_interval_ms: u64,

    /// Maximum number of bytes the [`crate::OutputRelay`] pulls per read.
    pub read_chunk_size: usize,

    /// Statement sent to the interpreter when an empty line is submitted. The line
    /// terminator is appended to it.
    pub empty_line_sentinel: String,

    /// Printed to the transcript when the output pipe reaches end of stream.
    pub end_of_stream_notice: String,

    /// Name given to the [`crate::OutputRelay`] OS thread.
    pub relay_thread_name: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            empty_line_sentinel: DEFAULT_EMPTY_LINE_SENTINEL.to_string(),
            end_of_stream_notice: DEFAULT_END_OF_STREAM_NOTICE.to_string(),
            relay_thread_name: DEFAULT_RELAY_THREAD_NAME.to_string(),
        }
    }
}

impl ConsoleConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        // A zero interval would turn the blocking read into a busy loop.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// An empty sentinel, or one containing the line terminator, falls back to
    /// [`DEFAULT_EMPTY_LINE_SENTINEL`].
    #[must_use]
    pub fn with_empty_line_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.empty_line_sentinel = normalize_empty_line_sentinel(sentinel.into());
        self
    }

    /// Parse a config from a JSON string. Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsoleError::ConfigParse`] if the JSON is invalid.
    pub fn try_parse(json: &str) -> ConsoleResult<Self> {
        let config: ConsoleConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Load a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsoleError::IO`] if the file can't be read, and
    /// [`crate::ConsoleError::ConfigParse`] if it isn't valid.
    pub fn try_load(path: impl AsRef<Path>) -> ConsoleResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::try_parse(&json)
    }

    /// Replace values that can't work with their defaults. The interpreter must always
    /// get exactly one non-empty line per submission.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.empty_line_sentinel = normalize_empty_line_sentinel(self.empty_line_sentinel);
        if self.read_chunk_size == 0 {
            self.read_chunk_size = DEFAULT_READ_CHUNK_SIZE;
        }
        self
    }
}

/// Returns `sentinel`, or [`DEFAULT_EMPTY_LINE_SENTINEL`] if it is empty or spans more
/// than one line.
#[must_use]
pub fn normalize_empty_line_sentinel(sentinel: String) -> String {
    if sentinel.is_empty() || sentinel.contains(LINE_TERMINATOR) {
        DEFAULT_EMPTY_LINE_SENTINEL.to_string()
    } else {
        sentinel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(750));
        assert_eq!(config.read_chunk_size, 256);
        assert_eq!(config.empty_line_sentinel, ";");
        assert_eq!(config.end_of_stream_notice, "Console: Input closed...\n");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            ConsoleConfig::try_parse(r#"{ "poll_interval_ms": 20, "empty_line_sentinel": "" }"#)
                .unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.empty_line_sentinel, ";");
        assert_eq!(config.read_chunk_size, 256);
    }

    #[test]
    fn test_invalid_json() {
        let result = ConsoleConfig::try_parse("{ not json");
        assert!(matches!(result, Err(crate::ConsoleError::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "read_chunk_size": 16 }}"#).unwrap();
        let config = ConsoleConfig::try_load(file.path()).unwrap();
        assert_eq!(config.read_chunk_size, 16);
    }

    #[test]
    fn test_unusable_sentinels_fall_back_to_default() {
        let config = ConsoleConfig::default().with_empty_line_sentinel("");
        assert_eq!(config.empty_line_sentinel, ";");

        let config = ConsoleConfig::default().with_empty_line_sentinel("a\nb");
        assert_eq!(config.empty_line_sentinel, ";");

        let config = ConsoleConfig::default().with_empty_line_sentinel("pass");
        assert_eq!(config.empty_line_sentinel, "pass");

        let config = ConsoleConfig {
            empty_line_sentinel: String::new(),
            read_chunk_size: 0,
            ..ConsoleConfig::default()
        }
        .normalized();
        assert_eq!(config.empty_line_sentinel, ";");
        assert_eq!(config.read_chunk_size, 256);
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = ConsoleConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
