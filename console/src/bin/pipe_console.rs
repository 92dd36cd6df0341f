// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Drive a [`Session`] from stdin, with a tiny integer calculator as the interpreter.
//!
//! - Every stdin line is typed into the console and submitted.
//! - A line starting with `\` is an edit intent instead, eg: `\up`, `\clear`, `\to 3`,
//!   `\cut 0..2`.
//! - Each reply is written from its own short lived tokio task.
//!
//! ```text
//! echo -e "1+1\n2*(3)\n\\up\n" | cargo run --bin pipe_console -- --log-level debug
//! ```

use std::{io::{BufRead as _, BufReader, Write as _},
          ops::Range,
          path::PathBuf};

use clap::Parser;
use crossterm::style::{Color, Stylize};
use miette::IntoDiagnostic;
use r3bl_console::{ConsoleConfig, DisplayPreference, DisplaySurface, EditIntent,
                   IntentOutcome, PipeReader, PipeWriter, Session, SessionPipes,
                   StyleHint, TracingConfig, pipe};
use tokio::{io::AsyncBufReadExt as _, runtime::Handle, task::JoinHandle};
use tracing_core::LevelFilter;

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "pipe_console")]
#[command(about = "Type arithmetic on stdin, and watch replies arrive through a console")]
#[command(version)]
#[command(next_line_help = true)]
pub struct CLIArg {
    #[arg(long, short = 'c', help = "JSON file with console settings")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        short = 'f',
        help = "Write logs to this file. Otherwise logs are printed through the console"
    )]
    pub log_file: Option<String>,

    #[arg(
        long,
        short = 'l',
        default_value = "off",
        help = "off, error, warn, info, debug or trace"
    )]
    pub log_level: LevelFilter,

    #[arg(long, short = 'p', help = "Overrides poll_interval_ms from the config file")]
    pub poll_interval_ms: Option<u64>,
}

/// Prints transcript output to stdout. The terminal already echoes what is typed, so
/// edits of the editable line are not drawn.
#[derive(Debug, Default)]
struct StdoutSurface;

impl DisplaySurface for StdoutSurface {
    fn append_text(&self, _at: usize, text: &str, style: StyleHint) {
        let styled = match style {
            StyleHint::Plain => text.to_string(),
            StyleHint::Error => text.red().to_string(),
            StyleHint::Notice => text.dark_grey().italic().to_string(),
            StyleHint::Fg(r, g, b) => text.with(Color::Rgb { r, g, b }).to_string(),
        };
        let mut stdout = std::io::stdout().lock();
        let _unused = stdout.write_all(styled.as_bytes());
        let _unused = stdout.flush();
    }

    fn replace_range(&self, _range: Range<usize>, _text: &str) {}

    fn notify_caret_moved(&self, _caret: usize) {}

    fn notify_error(&self, message: &str) { eprintln!("{}", message.red()); }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli_arg = CLIArg::parse();

    let config = match &cli_arg.config {
        Some(path) => ConsoleConfig::try_load(path)?,
        None => ConsoleConfig::default(),
    };
    let config = match cli_arg.poll_interval_ms {
        Some(poll_interval_ms) => ConsoleConfig {
            poll_interval_ms,
            ..config
        },
        None => config,
    };

    // The output pipe is created up front, so tracing can route into it before the
    // session (and its relay thread) start logging.
    let (output_sink, output_reader) = pipe(config.poll_interval());

    r3bl_console::init(match cli_arg.log_file {
        Some(log_file) => TracingConfig::new_file(Some(log_file), cli_arg.log_level),
        None => TracingConfig::new_display(
            DisplayPreference::OutputSink(output_sink.clone()),
            cli_arg.log_level,
        ),
    })?;

    let mut session = Session::try_new(config, StdoutSurface, SessionPipes {
        maybe_output_reader: Some(output_reader),
        ..SessionPipes::default()
    })?;
    let command_source = session
        .take_command_source()
        .ok_or_else(|| miette::miette!("Session did not create a command pipe"))?;

    let runtime = Handle::current();
    let interpreter = tokio::task::spawn_blocking(move || {
        run_interpreter(command_source, &output_sink, &runtime)
    });

    let mut stdin_lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = stdin_lines.next_line().await.into_diagnostic()? {
        handle_stdin_line(&session, &line)?;
    }

    // Let in-flight replies land before the output pipe is closed.
    session.line_discipline().command_writer().close();
    for reply_task in interpreter.await.into_diagnostic()? {
        let _unused = reply_task.await;
    }

    session.println(&session.to_string());
    session.shutdown();

    Ok(())
}

fn handle_stdin_line(session: &Session, line: &str) -> miette::Result<()> {
    let line_discipline = session.line_discipline();

    let Some(command) = line.strip_prefix('\\') else {
        line_discipline.insert_text(line);
        line_discipline.submit()?;
        return Ok(());
    };

    match EditIntent::parse_command(command) {
        Some(intent) => match line_discipline.apply(intent)? {
            IntentOutcome::Copied(text) => session.print_styled(
                &format!("[clipboard] {text}\n"),
                StyleHint::Fg(100, 180, 255),
            ),
            IntentOutcome::Submitted(_) | IntentOutcome::Continue => {
                session.print_styled(
                    &format!("[line] {}\n", line_discipline.current_line()),
                    StyleHint::Notice,
                );
            }
        },
        None => session.error(&format!("Unknown edit intent: {command}\n")),
    }

    Ok(())
}

/// Read commands until the command pipe closes. Each reply is written from a new tokio
/// task that exits right after, so the output pipe sees a different writer every time.
fn run_interpreter(
    command_source: PipeReader,
    output_sink: &PipeWriter,
    runtime: &Handle,
) -> Vec<JoinHandle<()>> {
    let mut reply_tasks = vec![];

    for line in BufReader::new(command_source).lines() {
        let Ok(line) = line else { break };
        let statement = line.trim().to_string();
        let output_sink = output_sink.clone();

        reply_tasks.push(runtime.spawn(async move {
            let reply = match statement.as_str() {
                ";" | "" => return,
                it => match evaluate(it) {
                    Ok(value) => format!("{value}\n"),
                    Err(message) => format!("error: {message}\n"),
                },
            };
            if let Err(error) = output_sink.write_text(&reply) {
                tracing::warn!(message = "reply dropped", error = %error);
            }
        }));
    }

    reply_tasks
}

/// Integer arithmetic with `+ - * /`, parentheses and the usual precedence.
fn evaluate(expression: &str) -> Result<i64, String> {
    let tokens: Vec<char> = expression.chars().filter(|it| !it.is_whitespace()).collect();
    let mut position = 0;
    let value = parse_sum(&tokens, &mut position)?;
    match tokens.get(position) {
        None => Ok(value),
        Some(unexpected) => Err(format!("unexpected '{unexpected}'")),
    }
}

fn parse_sum(tokens: &[char], position: &mut usize) -> Result<i64, String> {
    let mut value = parse_product(tokens, position)?;
    while let Some(operator @ ('+' | '-')) = tokens.get(*position).copied() {
        *position += 1;
        let rhs = parse_product(tokens, position)?;
        value = match operator {
            '+' => value.checked_add(rhs),
            _ => value.checked_sub(rhs),
        }
        .ok_or("overflow")?;
    }
    Ok(value)
}

fn parse_product(tokens: &[char], position: &mut usize) -> Result<i64, String> {
    let mut value = parse_atom(tokens, position)?;
    while let Some(operator @ ('*' | '/')) = tokens.get(*position).copied() {
        *position += 1;
        let rhs = parse_atom(tokens, position)?;
        value = match operator {
            '*' => value.checked_mul(rhs).ok_or("overflow")?,
            _ => value.checked_div(rhs).ok_or("division by zero")?,
        };
    }
    Ok(value)
}

fn parse_atom(tokens: &[char], position: &mut usize) -> Result<i64, String> {
    match tokens.get(*position) {
        Some('(') => {
            *position += 1;
            let value = parse_sum(tokens, position)?;
            if tokens.get(*position) != Some(&')') {
                return Err("missing ')'".into());
            }
            *position += 1;
            Ok(value)
        }
        Some('-') => {
            *position += 1;
            parse_atom(tokens, position)?
                .checked_neg()
                .ok_or_else(|| "overflow".to_string())
        }
        Some(digit) if digit.is_ascii_digit() => {
            let start = *position;
            while tokens.get(*position).is_some_and(char::is_ascii_digit) {
                *position += 1;
            }
            let digits: String = tokens[start..*position].iter().collect();
            digits.parse().map_err(|_| format!("number too large: {digits}"))
        }
        Some(unexpected) => Err(format!("unexpected '{unexpected}'")),
        None => Err("unexpected end of input".into()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case("1+1", Ok(2); "sum")]
    #[test_case("2 * (3 + 4) - 1", Ok(13); "precedence and parens")]
    #[test_case("-3*-3", Ok(9); "unary minus")]
    #[test_case("7/0", Err("division by zero".to_string()); "div by zero")]
    #[test_case("1+", Err("unexpected end of input".to_string()); "truncated")]
    #[test_case("(1", Err("missing ')'".to_string()); "unbalanced")]
    fn test_evaluate(expression: &str, expected: Result<i64, String>) {
        assert_eq!(evaluate(expression), expected);
    }
}
