// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::IntoDiagnostic;
use tracing::subscriber::DefaultGuard;
use tracing_core::{Level, LevelFilter};
use tracing_subscriber::{Layer, filter::filter_fn, layer::SubscriberExt,
                         registry::LookupSpan, util::SubscriberInitExt};

use super::{DisplayPreference, OUTPUT_SINK_EXCLUDED_TARGETS, TracingConfig, WriterConfig,
            rolling_file_appender_impl};

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer.
#[macro_export]
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_thread_names(true)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true)
    };
}

/// Type alias for a boxed layer.
pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Install `tracing_config` as the global default subscriber. This can only happen once
/// per process, so it is meant for binaries. Does nothing if logging is disabled.
///
/// # Errors
///
/// Returns an error if the log file can't be created, or a global subscriber is already
/// installed.
pub fn init(tracing_config: TracingConfig) -> miette::Result<()> {
    if tracing_config.is_disabled() {
        return Ok(());
    }
    let layers = try_create_layers(&tracing_config)?;
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .into_diagnostic()
}

impl TracingConfig {
    /// Install this config for the current thread only, until the returned guard is
    /// dropped. Meant for tests. Returns [`None`] if logging is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file can't be created.
    pub fn install_thread_local(&self) -> miette::Result<Option<DefaultGuard>> {
        if self.is_disabled() {
            return Ok(None);
        }
        let layers = try_create_layers(self)?;
        let subscriber = tracing_subscriber::registry().with(layers);
        Ok(Some(tracing::subscriber::set_default(subscriber)))
    }
}

/// Returns the layers. This does not initialize the tracing system.
///
/// # Errors
///
/// Returns an error if the log file can't be created.
pub fn try_create_layers(
    tracing_config: &TracingConfig,
) -> miette::Result<Vec<Box<DynLayer<tracing_subscriber::Registry>>>> {
    let level_filter = tracing_config.get_level_filter();
    let mut return_it: Vec<Box<DynLayer<tracing_subscriber::Registry>>> = vec![];

    // Applies to every layer that follows.
    return_it.push(Box::new(level_filter));

    if let Some(layer) =
        try_create_display_layer(level_filter, tracing_config.get_writer_config())?
    {
        return_it.push(layer);
    }

    if let Some(layer) =
        try_create_file_layer(level_filter, tracing_config.get_writer_config())?
    {
        return_it.push(layer);
    }

    Ok(return_it)
}

/// This erases the concrete type of the writer, and returns a boxed layer.
///
/// # Errors
///
/// Never fails today. Returns a [`miette::Result`] to match [`try_create_file_layer`].
pub fn try_create_display_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();

    Ok(match writer_config {
        WriterConfig::DisplayAndFile(display_pref, _)
        | WriterConfig::Display(display_pref) => match display_pref {
            DisplayPreference::Stdout => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stdout)
                    .with_filter(level_filter),
            )),
            DisplayPreference::Stderr => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stderr)
                    .with_filter(level_filter),
            )),
            DisplayPreference::OutputSink(output_sink) => {
                // Each event is formatted into one buffer and written with a single
                // call, so log lines never interleave with other output.
                let tracing_writer = move || -> Box<dyn std::io::Write> {
                    Box::new(output_sink.clone())
                };
                Some(Box::new(
                    fmt_layer
                        .with_ansi(false)
                        .with_writer(tracing_writer)
                        .with_filter(filter_fn(move |metadata| {
                            *metadata.level() <= level_filter
                                && is_output_sink_event(*metadata.level(), metadata.target())
                        })),
                ))
            }
        },
        _ => None,
    })
}

fn is_output_sink_event(level: Level, target: &str) -> bool {
    level != Level::TRACE
        || !OUTPUT_SINK_EXCLUDED_TARGETS
            .iter()
            .any(|excluded| target.starts_with(excluded))
}

/// This erases the concrete type of the writer, and returns a boxed layer.
///
/// # Errors
///
/// Returns an error if the log file path is not usable.
pub fn try_create_file_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();

    Ok(match writer_config {
        WriterConfig::DisplayAndFile(_, log_file_path)
        | WriterConfig::File(log_file_path) => {
            let file = rolling_file_appender_impl::try_create(log_file_path.as_str())?;
            Some(Box::new(
                fmt_layer
                    .with_ansi(false)
                    .with_writer(file)
                    .with_filter(level_filter),
            ))
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serial_test::serial;

    use super::*;
    use crate::pipe;

    #[test]
    fn test_try_create_display_layer() {
        let writer_config = WriterConfig::Display(DisplayPreference::Stderr);
        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_display_layer(LevelFilter::DEBUG, writer_config).unwrap();
        assert!(layer.is_some());

        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_display_layer(LevelFilter::DEBUG, WriterConfig::None).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn test_try_create_both_layers() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("my_temp_log_file.log");
        let file_path = file_path.to_str().unwrap().to_string();

        let tracing_config = TracingConfig::new_file_and_display(
            Some(file_path.clone()),
            DisplayPreference::Stdout,
            LevelFilter::DEBUG,
        );

        let layers = try_create_layers(&tracing_config).unwrap();
        assert_eq!(layers.len(), 3);
        assert!(std::path::Path::new(&file_path).exists());
    }

    #[test]
    fn test_disabled_config_installs_nothing() {
        let tracing_config =
            TracingConfig::new_display(DisplayPreference::Stdout, LevelFilter::OFF);
        assert!(tracing_config.install_thread_local().unwrap().is_none());
    }

    #[test]
    fn test_output_sink_skips_per_chunk_trace_events() {
        use Level as L;
        assert!(is_output_sink_event(L::TRACE, "r3bl_console::session"));
        assert!(is_output_sink_event(
            L::TRACE,
            "r3bl_console::line_discipline::line_discipline_impl"
        ));
        assert!(is_output_sink_event(L::TRACE, "pipe_console"));
        assert!(is_output_sink_event(L::DEBUG, "r3bl_console::output_relay"));
        assert!(!is_output_sink_event(L::TRACE, "r3bl_console::pipe::resilient_pipe"));
        assert!(!is_output_sink_event(L::TRACE, "r3bl_console::output_relay"));
        assert!(!is_output_sink_event(
            L::TRACE,
            "r3bl_console::line_discipline::console_state"
        ));
    }

    #[test]
    #[serial]
    fn test_logs_routed_into_output_sink() {
        let (output_sink, output_reader) = pipe(Duration::from_millis(10));
        let guard = TracingConfig::new_display(
            DisplayPreference::OutputSink(output_sink),
            LevelFilter::INFO,
        )
        .install_thread_local()
        .unwrap();

        tracing::info!(message = "relayed log line", answer = 42);
        tracing::debug!("filtered out");
        drop(guard);

        let chunk = output_reader
            .read_timeout(4096, Duration::from_secs(1))
            .unwrap()
            .unwrap();
        let output = String::from_utf8(chunk).unwrap();
        assert!(output.contains("relayed log line"));
        assert!(output.contains("answer=42"));
        assert!(!output.contains("filtered out"));
        assert!(!output.contains('\x1b'));
    }
}
