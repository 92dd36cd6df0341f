// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::Path;

/// Create a file appender for `path_str` that never rotates. Relative paths are resolved
/// against the current directory.
///
/// # Errors
///
/// Returns an error if the path has no file name.
pub fn try_create(
    path_str: &str,
) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let path = Path::new(path_str);

    let file_name = path.file_name().ok_or_else(|| {
        miette::miette!(
            help = "Pass a path that ends in a file name, eg: /tmp/pipe_console.log",
            "Log file path {} has no file name",
            path.display()
        )
    })?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    Ok(tracing_appender::rolling::never(parent, file_name))
}
