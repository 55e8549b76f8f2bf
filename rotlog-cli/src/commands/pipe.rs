//! Pipe mode: copy a stream into a rotating file.

use std::io::Read;
use std::path::Path;

use tracing::info;

use super::CommandResult;
use crate::cli::PolicyArgs;
use crate::signal::ShutdownFlag;

/// Result of a pipe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeResult {
    /// Bytes copied into the output file.
    pub copied: u64,
    /// Whether the run ended because shutdown was requested.
    pub interrupted: bool,
}

/// Copy `source` into `logfile` until it ends or `shutdown` fires.
///
/// Shutdown is a clean end, not an error.
pub fn execute_pipe<R>(
    logfile: &Path,
    args: &PolicyArgs,
    source: R,
    shutdown: &ShutdownFlag,
) -> CommandResult<PipeResult>
where
    R: Read + Send + 'static,
{
    let policy = args.to_policy()?;
    let copied = rotlog_rotator::run(shutdown.token(), source, logfile, policy)?;

    let result = PipeResult {
        copied,
        interrupted: shutdown.should_stop(),
    };
    info!(
        path = %logfile.display(),
        copied = result.copied,
        interrupted = result.interrupted,
        "pipe finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse_from;
    use crate::commands::CommandError;
    use crate::exit::{codes, exit_code};
    use rotlog_fs::list_versions;
    use rotlog_stream::{pipe, ReadError};
    use std::fs;
    use std::io;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    fn policy_args(extra: &[&str]) -> PolicyArgs {
        let mut args = vec!["rotlog"];
        args.extend_from_slice(extra);
        args.push("unused.log");
        parse_from(args).expect("parse").policy
    }

    #[test]
    fn test_pipe_copies_source() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.log");

        let result = execute_pipe(
            &path,
            &policy_args(&[]),
            &b"first\nsecond\n"[..],
            &ShutdownFlag::manual(),
        )
        .expect("pipe");

        assert_eq!(
            result,
            PipeResult {
                copied: 13,
                interrupted: false
            }
        );
        assert_eq!(fs::read(&path).expect("read"), b"first\nsecond\n");
    }

    #[test]
    fn test_pipe_rotates_by_size() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.log");

        execute_pipe(
            &path,
            &policy_args(&["--max-size", "8B", "--count", "-1"]),
            io::Cursor::new(b"0123456789".to_vec()),
            &ShutdownFlag::manual(),
        )
        .expect("pipe");

        let versions = list_versions(&path).expect("list");
        assert_eq!(versions.len(), 1);
        assert_eq!(fs::read(&versions[0]).expect("read"), b"0123456789");
    }

    #[test]
    fn test_pipe_shutdown_is_clean() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.log");
        let shutdown = ShutdownFlag::manual();
        let (writer, source) = pipe();

        writer.send(b"kept\n").expect("send");
        let trigger = {
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                shutdown.trigger();
            })
        };

        let result = execute_pipe(&path, &policy_args(&[]), source, &shutdown).expect("pipe");
        trigger.join().expect("trigger");

        assert!(result.interrupted);
        assert_eq!(result.copied, 5);
        assert_eq!(fs::read(&path).expect("read"), b"kept\n");
        drop(writer);
    }

    #[test]
    fn test_pipe_invalid_policy() {
        let dir = tempdir().expect("tempdir");
        let err = execute_pipe(
            &dir.path().join("out.log"),
            &policy_args(&["--count", "-3"]),
            &b""[..],
            &ShutdownFlag::manual(),
        )
        .expect_err("invalid count");

        assert!(matches!(err, CommandError::InvalidArgument(_)));
        assert_eq!(exit_code(&err), codes::INVALID_ARGS);
        assert!(!dir.path().join("out.log").exists());
    }

    #[test]
    fn test_pipe_stream_error() {
        let dir = tempdir().expect("tempdir");
        let (writer, source) = pipe();
        writer.close_with_error(io::Error::from(io::ErrorKind::ConnectionAborted));

        let err = execute_pipe(
            &dir.path().join("out.log"),
            &policy_args(&[]),
            source,
            &ShutdownFlag::manual(),
        )
        .expect_err("stream error");

        assert!(matches!(err, CommandError::Stream(ReadError::Source(_))));
        assert_eq!(exit_code(&err), codes::STREAM_ERROR);
    }

    #[test]
    fn test_pipe_unwritable_target() {
        let dir = tempdir().expect("tempdir");
        let err = execute_pipe(
            &dir.path().join("missing/out.log"),
            &policy_args(&[]),
            &b"data"[..],
            &ShutdownFlag::manual(),
        )
        .expect_err("parent directory missing");

        assert!(matches!(err, CommandError::Filesystem(_)));
        assert_eq!(exit_code(&err), codes::IO_ERROR);
    }
}
