//! In-process blocking pipe.
//!
//! Used as a stand-in for standard input in tests: reads block until the
//! writer sends data, and the writer controls how the stream terminates.

use std::io::{self, Read};
use std::sync::mpsc::{channel, Receiver, Sender};

enum Message {
    Data(Vec<u8>),
    Error(io::Error),
}

/// Writing half of a [`pipe`].
///
/// Dropping the writer ends the stream cleanly.
#[derive(Debug, Clone)]
pub struct PipeWriter {
    tx: Sender<Message>,
}

impl PipeWriter {
    /// Queue bytes for the reader. Fails if the reader is gone.
    pub fn send(&self, data: &[u8]) -> io::Result<()> {
        self.tx
            .send(Message::Data(data.to_vec()))
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }

    /// Make the reader's next read fail with `err` once queued data is consumed.
    pub fn close_with_error(self, err: io::Error) {
        let _ = self.tx.send(Message::Error(err));
    }
}

/// Reading half of a [`pipe`].
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Message>,
    pending: Vec<u8>,
    failed: bool,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() && !self.failed {
            match self.rx.recv() {
                Ok(Message::Data(data)) => self.pending = data,
                Ok(Message::Error(err)) => {
                    self.failed = true;
                    return Err(err);
                }
                Err(_) => return Ok(0),
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Create a connected writer/reader pair.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = channel();
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            pending: Vec::new(),
            failed: false,
        },
    )
}
