//! Preemptible reader.
//!
//! Wraps a blocking byte source so that a consumer blocked in `read` can be
//! released by cancellation, even while the source itself is still blocked.
//!
//! Two threads are started per reader:
//! - the pump performs blocking reads and forwards each chunk through a
//!   single-slot handoff;
//! - the watcher waits for the token to fire, records the terminal outcome
//!   and closes the handoff.
//!
//! A pump blocked in the source cannot be interrupted. It notices the closed
//! handoff after its read returns and exits without delivering the chunk.

use std::io::{self, Read};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::trace;

use crate::cancel::{CancelCause, CancelToken};
use crate::handoff::Handoff;

/// Size of the pump's read buffer, and so the largest chunk `read` delivers.
pub const CHUNK_SIZE: usize = 1024;

/// Terminal and misuse outcomes of a preemptible read.
///
/// A clean end of stream is not an error: it is reported as `Ok(0)`.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("short buffer: {copied} of {chunk} bytes copied")]
    ShortBuffer { copied: usize, chunk: usize },

    #[error("no progress before deadline")]
    NoProgress,

    #[error("read on closed pipe")]
    ClosedPipe,

    #[error("source read failed: {0}")]
    Source(Arc<io::Error>),
}

impl ReadError {
    /// The `io::ErrorKind` this outcome surfaces as through `io::Read`.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            ReadError::ShortBuffer { .. } => io::ErrorKind::InvalidInput,
            ReadError::NoProgress => io::ErrorKind::TimedOut,
            ReadError::ClosedPipe => io::ErrorKind::BrokenPipe,
            ReadError::Source(err) => err.kind(),
        }
    }
}

impl From<ReadError> for io::Error {
    fn from(err: ReadError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

/// Outcome recorded by the watcher once the token fires.
#[derive(Debug, Clone)]
enum Terminal {
    EndOfStream,
    Failed(ReadError),
}

impl From<CancelCause> for Terminal {
    fn from(cause: CancelCause) -> Self {
        match cause {
            CancelCause::Cancelled | CancelCause::EndOfStream => Terminal::EndOfStream,
            CancelCause::DeadlineExceeded => Terminal::Failed(ReadError::NoProgress),
            CancelCause::Closed => Terminal::Failed(ReadError::ClosedPipe),
            CancelCause::Source(err) => Terminal::Failed(ReadError::Source(err)),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    chunks: Handoff<Vec<u8>>,
    terminal: OnceLock<Terminal>,
}

/// A reader whose blocking reads can be abandoned through a [`CancelToken`].
#[derive(Debug)]
pub struct PreemptibleReader {
    shared: Arc<Shared>,
    token: CancelToken,
    watcher: Option<JoinHandle<()>>,
}

impl PreemptibleReader {
    /// Start reading `source` until `cancel` fires or the source ends.
    ///
    /// The reader derives its own child token, so closing the reader does
    /// not cancel `cancel`.
    pub fn new<R>(cancel: &CancelToken, source: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let token = cancel.child();

        {
            let shared = shared.clone();
            let token = token.clone();
            thread::spawn(move || pump(source, &shared, &token));
        }

        let watcher = {
            let shared = shared.clone();
            let token = token.clone();
            thread::spawn(move || {
                let cause = token.wait();
                trace!(?cause, "preemptible reader stopping");
                let _ = shared.terminal.set(Terminal::from(cause));
                shared.chunks.close();
            })
        };

        Self {
            shared,
            token,
            watcher: Some(watcher),
        }
    }

    /// Deliver the next chunk into `buf`.
    ///
    /// Returns `Ok(0)` at end of stream. If `buf` is shorter than the chunk,
    /// the prefix that fits is copied, the rest is discarded and
    /// `ReadError::ShortBuffer` is returned. Callers should pass buffers of
    /// at least [`CHUNK_SIZE`] bytes.
    pub fn read_chunk(&self, buf: &mut [u8]) -> Result<usize, ReadError> {
        match self.shared.chunks.take() {
            Some(chunk) => {
                let copied = chunk.len().min(buf.len());
                buf[..copied].copy_from_slice(&chunk[..copied]);
                if copied < chunk.len() {
                    return Err(ReadError::ShortBuffer {
                        copied,
                        chunk: chunk.len(),
                    });
                }
                Ok(copied)
            }
            None => match self.shared.terminal.get() {
                Some(Terminal::Failed(err)) => Err(err.clone()),
                Some(Terminal::EndOfStream) | None => Ok(0),
            },
        }
    }

    /// Stop reading. Chunks already handed off are still delivered, then
    /// reads fail with `ReadError::ClosedPipe`.
    pub fn close(&self) {
        self.token.cancel_with(CancelCause::Closed);
    }
}

impl Read for PreemptibleReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_chunk(buf).map_err(io::Error::from)
    }
}

impl Drop for PreemptibleReader {
    fn drop(&mut self) {
        self.close();
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

fn pump<R: Read>(mut source: R, shared: &Shared, token: &CancelToken) {
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        if token.is_cancelled() {
            return;
        }

        match source.read(&mut buffer) {
            Ok(0) => {
                token.cancel_with(CancelCause::EndOfStream);
                return;
            }
            Ok(n) => {
                if !shared.chunks.put(buffer[..n].to_vec()) {
                    trace!(bytes = n, "handoff closed, abandoning chunk");
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                token.cancel_with(CancelCause::Source(Arc::new(err)));
                return;
            }
        }
    }
}
