//! Stream plumbing for rotlog.
//!
//! This crate provides:
//! - `CancelToken`, a one-shot cancellation signal with a recorded cause
//! - `Handoff`, a single-slot blocking queue
//! - `PreemptibleReader`, a reader whose blocking reads can be abandoned
//! - `pipe`, an in-process blocking pipe for driving readers in tests

pub mod cancel;
pub mod handoff;
pub mod pipe;
pub mod reader;

pub use cancel::{CancelCause, CancelToken};
pub use handoff::Handoff;
pub use pipe::{pipe, PipeReader, PipeWriter};
pub use reader::{PreemptibleReader, ReadError, CHUNK_SIZE};
