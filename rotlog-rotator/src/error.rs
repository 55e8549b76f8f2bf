//! Errors from rotation operations.

use rotlog_fs::FsError;
use rotlog_stream::ReadError;
use thiserror::Error;

use crate::policy::PolicyError;

/// Errors that abort an engine operation.
///
/// Cleanup failures are not represented here: they are logged and never
/// fail a write or a rotation.
#[derive(Debug, Error)]
pub enum RotateError {
    #[error("invalid rotation policy: {0}")]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("input stream failed: {0}")]
    Read(#[from] ReadError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_policy_error_message() {
        let err = RotateError::from(PolicyError::InvalidRetained(-5));
        assert_eq!(
            err.to_string(),
            "invalid rotation policy: retained count must be -1 or greater, got -5"
        );
    }

    #[test]
    fn test_fs_error_is_transparent() {
        let err = RotateError::from(FsError::Closed(PathBuf::from("log")));
        assert_eq!(err.to_string(), "output file log is closed");
    }

    #[test]
    fn test_read_error_message() {
        let err = RotateError::from(ReadError::NoProgress);
        assert_eq!(err.to_string(), "input stream failed: no progress before deadline");
    }
}
