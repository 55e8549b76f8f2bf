//! Command orchestration for CLI modes.
//!
//! Provides execute functions for:
//! - pipe mode, copying a stream into a rotating file
//! - `rotate`, a one-shot rotation

pub mod pipe;
pub mod rotate;

pub use pipe::execute_pipe;
pub use rotate::execute_rotate;

use crate::cli::CliError;
use rotlog_fs::FsError;
use rotlog_rotator::{PolicyError, RotateError};
use rotlog_stream::ReadError;
use thiserror::Error;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("invalid rotation policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] FsError),

    #[error("stream error: {0}")]
    Stream(#[from] ReadError),
}

impl From<RotateError> for CommandError {
    fn from(err: RotateError) -> Self {
        match err {
            RotateError::Policy(err) => CommandError::Policy(err),
            RotateError::Fs(err) => CommandError::Filesystem(err),
            RotateError::Read(err) => CommandError::Stream(err),
        }
    }
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;
