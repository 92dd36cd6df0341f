// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{collections::VecDeque,
          io,
          sync::{Arc, Condvar, MutexGuard, PoisonError},
          time::{Duration, Instant}};

use crate::{ConsoleError, ConsoleResult, StdMutex};

/// Whether a [`ResilientPipe`] still accepts writes. `Closed` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PipeLiveness {
    #[default]
    Open,
    Closed,
}

impl PipeLiveness {
    #[must_use]
    pub fn is_closed(&self) -> bool { matches!(self, PipeLiveness::Closed) }
}

#[derive(Debug, Default)]
struct PipeBuffer {
    bytes: VecDeque<u8>,
    liveness: PipeLiveness,
}

/// Byte queue with one logical reader and any number of writers, on any threads.
///
/// # Mental model
///
/// A classic piped stream ties its liveness to "the thread that last wrote to it". That
/// breaks as soon as writers are short-lived: the writer thread exits, and the reader
/// either errors out with a broken pipe or waits on a wakeup that already happened.
/// This pipe never looks at thread identity. It only knows two things:
///
/// 1. Is there buffered data?
/// 2. Has someone called [`Self::close()`]?
///
/// ```text
/// writer A (ephemeral) ──┐
/// writer B (ephemeral) ──┼──► [ bytes ... ] ──► reader (blocks in read)
/// writer C (long-lived) ─┘        ▲
///                                 └── close() ─► Closed (terminal)
/// ```
///
/// # Blocking read
///
/// [`Self::read()`] waits on a [`Condvar`] that every write notifies, **and** re-checks
/// the buffer every `poll_interval` even if no notification arrived. So a read never
/// depends on a writer being alive to deliver its wakeup.
///
/// # Close semantics
///
/// - Writes after close fail with [`ConsoleError::PipeClosed`].
/// - Bytes written before close are still delivered.
/// - A reader that was blocked when the pipe closed gets an empty chunk (end of stream).
/// - A read that starts on a closed, drained pipe fails with
///   [`ConsoleError::PipeClosed`].
#[derive(Debug)]
pub struct ResilientPipe {
    buffer: StdMutex<PipeBuffer>,
    data_available: Condvar,
    poll_interval: Duration,
}

impl ResilientPipe {
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            buffer: StdMutex::new(PipeBuffer::default()),
            data_available: Condvar::new(),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration { self.poll_interval }

    /// The buffer is only ever mutated by single `extend` / `drain` calls, so its
    /// contents are consistent even if a holder of the lock panicked.
    fn lock_buffer(&self) -> MutexGuard<'_, PipeBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `bytes` as one contiguous record and wake the reader.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PipeClosed`] if the pipe has been closed.
    pub fn write(&self, bytes: &[u8]) -> ConsoleResult<()> {
        {
            let mut buffer = self.lock_buffer();
            if buffer.liveness.is_closed() {
                return Err(ConsoleError::PipeClosed);
            }
            buffer.bytes.extend(bytes);
        }
        self.data_available.notify_all();
        Ok(())
    }

    /// Block until at least one byte is available (returns up to `max_bytes` of them),
    /// or until the pipe closes while waiting (returns an empty chunk).
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PipeClosed`] if the pipe is already closed and drained.
    pub fn read(&self, max_bytes: usize) -> ConsoleResult<Vec<u8>> {
        self.read_until(max_bytes, None)
            .map(|maybe_chunk| maybe_chunk.unwrap_or_default())
    }

    /// Same as [`Self::read()`] but gives up after `timeout`, returning [`None`].
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PipeClosed`] if the pipe is already closed and drained.
    pub fn read_timeout(
        &self,
        max_bytes: usize,
        timeout: Duration,
    ) -> ConsoleResult<Option<Vec<u8>>> {
        self.read_until(max_bytes, Some(Instant::now() + timeout))
    }

    fn read_until(
        &self,
        max_bytes: usize,
        maybe_deadline: Option<Instant>,
    ) -> ConsoleResult<Option<Vec<u8>>> {
        // A zero sized read could never be told apart from end of stream.
        let max_bytes = max_bytes.max(1);
        let mut buffer = self.lock_buffer();
        let mut has_waited = false;

        loop {
            if !buffer.bytes.is_empty() {
                let count = max_bytes.min(buffer.bytes.len());
                let chunk: Vec<u8> = buffer.bytes.drain(..count).collect();
                return Ok(Some(chunk));
            }

            match (buffer.liveness, has_waited) {
                (PipeLiveness::Closed, true) => return Ok(Some(vec![])),
                (PipeLiveness::Closed, false) => return Err(ConsoleError::PipeClosed),
                (PipeLiveness::Open, _) => {}
            }

            let wait_for = match maybe_deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(None);
                    }
                    remaining.min(self.poll_interval)
                }
                None => self.poll_interval,
            };

            has_waited = true;
            let (next_buffer, _timeout_result) = self
                .data_available
                .wait_timeout(buffer, wait_for)
                .unwrap_or_else(PoisonError::into_inner);
            buffer = next_buffer;
        }
    }

    /// Transition to [`PipeLiveness::Closed`] and release any blocked reader. Returns
    /// `true` only for the call that actually closed the pipe.
    pub fn close(&self) -> bool {
        let did_close = {
            let mut buffer = self.lock_buffer();
            let was_open = !buffer.liveness.is_closed();
            buffer.liveness = PipeLiveness::Closed;
            was_open
        };
        self.data_available.notify_all();
        did_close
    }

    #[must_use]
    pub fn liveness(&self) -> PipeLiveness { self.lock_buffer().liveness }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.liveness().is_closed() }

    /// Number of buffered bytes not yet read.
    #[must_use]
    pub fn available(&self) -> usize { self.lock_buffer().bytes.len() }
}

/// Create a new [`ResilientPipe`] and return its two ends.
#[must_use]
pub fn pipe(poll_interval: Duration) -> (PipeWriter, PipeReader) {
    let shared = Arc::new(ResilientPipe::new(poll_interval));
    (
        PipeWriter::new(Arc::clone(&shared)),
        PipeReader { pipe: shared },
    )
}

/// Writing end of a [`ResilientPipe`]. Cheap to clone; every clone gets its own `id`
/// (used in log events) but they all feed the same pipe.
///
/// Use [`Self::write_bytes()`] or [`Self::write_text()`] when the record must arrive
/// contiguously. The [`io::Write`] impl is there so this can be used as a
/// [`tracing_subscriber`] writer, but `write!` may split one call into several writes.
#[derive(Debug)]
pub struct PipeWriter {
    pipe: Arc<ResilientPipe>,
    pub id: uuid::Uuid,
}

impl PipeWriter {
    fn new(pipe: Arc<ResilientPipe>) -> Self {
        Self {
            pipe,
            id: uuid::Uuid::new_v4(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConsoleError::PipeClosed`] if the pipe has been closed.
    pub fn write_bytes(&self, bytes: &[u8]) -> ConsoleResult<()> {
        let result = self.pipe.write(bytes);
        tracing::trace!(
            message = "pipe write",
            writer_id = %self.id,
            bytes = bytes.len(),
            ok = result.is_ok()
        );
        result
    }

    /// # Errors
    ///
    /// Returns [`ConsoleError::PipeClosed`] if the pipe has been closed.
    pub fn write_text(&self, text: &str) -> ConsoleResult<()> {
        self.write_bytes(text.as_bytes())
    }

    pub fn close(&self) {
        if self.pipe.close() {
            tracing::debug!(message = "pipe closed by writer", writer_id = %self.id);
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.pipe.is_closed() }
}

impl Clone for PipeWriter {
    fn clone(&self) -> Self { Self::new(Arc::clone(&self.pipe)) }
}

/// Does not emit tracing events, since this is the writer used when logs are routed
/// into the output pipe.
impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pipe.write(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Reading end of a [`ResilientPipe`]. There is one logical reader per pipe, so this
/// is not [`Clone`]. Dropping it closes the pipe, so writers get
/// [`ConsoleError::PipeClosed`] instead of filling a buffer nobody drains.
#[derive(Debug)]
pub struct PipeReader {
    pipe: Arc<ResilientPipe>,
}

impl PipeReader {
    /// See [`ResilientPipe::read()`].
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PipeClosed`] if the pipe is already closed and drained.
    pub fn read(&self, max_bytes: usize) -> ConsoleResult<Vec<u8>> {
        let result = self.pipe.read(max_bytes);
        if let Ok(chunk) = &result {
            tracing::trace!(message = "pipe read", bytes = chunk.len());
        }
        result
    }

    /// See [`ResilientPipe::read_timeout()`].
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PipeClosed`] if the pipe is already closed and drained.
    pub fn read_timeout(
        &self,
        max_bytes: usize,
        timeout: Duration,
    ) -> ConsoleResult<Option<Vec<u8>>> {
        self.pipe.read_timeout(max_bytes, timeout)
    }

    pub fn close(&self) {
        if self.pipe.close() {
            tracing::debug!(message = "pipe closed by reader");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.pipe.is_closed() }

    #[must_use]
    pub fn available(&self) -> usize { self.pipe.available() }

    /// The underlying pipe, so the owner of a reader that was moved to another thread
    /// can still close it.
    #[must_use]
    pub fn shared_pipe(&self) -> Arc<ResilientPipe> { Arc::clone(&self.pipe) }
}

impl Drop for PipeReader {
    fn drop(&mut self) { self.close(); }
}

/// End of stream and [`ConsoleError::PipeClosed`] both read as `Ok(0)`.
impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.pipe.read(buf.len()) {
            Ok(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            Err(ConsoleError::PipeClosed) => Ok(0),
            Err(other) => Err(other.into()),
        }
    }
}
