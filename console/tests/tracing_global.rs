// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use r3bl_console::{DisplayPreference, TracingConfig, init};
use serial_test::serial;
use tracing_core::LevelFilter;

/// The global subscriber can only be set once per process, which is why this lives in
/// its own test binary.
#[test]
#[serial]
fn test_init_global_once() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("global.log");
    let log_file = log_file.to_str().unwrap().to_string();

    // Disabled configs are a no-op, and don't claim the global slot.
    init(TracingConfig::new_display(DisplayPreference::Stderr, LevelFilter::OFF)).unwrap();

    init(TracingConfig::new_file(Some(log_file.clone()), LevelFilter::DEBUG)).unwrap();
    tracing::debug!(message = "written to the global log file");

    assert!(init(TracingConfig::new_file(Some(log_file.clone()), LevelFilter::DEBUG)).is_err());

    let contents = std::fs::read_to_string(&log_file).unwrap();
    assert!(contents.contains("written to the global log file"));
}
