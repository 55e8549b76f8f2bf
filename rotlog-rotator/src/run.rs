//! One-call entry points over `RotationEngine`.

use std::io::Read;
use std::path::PathBuf;

use rotlog_stream::CancelToken;
use tracing::warn;

use crate::engine::RotationEngine;
use crate::error::RotateError;
use crate::policy::RotationPolicy;

/// Copy `source` into the file at `path` under `policy` until the source
/// ends or `cancel` fires.
///
/// The output file is always closed. A close failure is reported only when
/// the copy itself succeeded; otherwise the copy error wins.
pub fn run<R>(
    cancel: &CancelToken,
    source: R,
    path: impl Into<PathBuf>,
    policy: RotationPolicy,
) -> Result<u64, RotateError>
where
    R: Read + Send + 'static,
{
    let engine = RotationEngine::open(path, policy)?;
    let copied = engine.pipe(cancel, source);

    match (copied, engine.close()) {
        (Ok(copied), Ok(())) => Ok(copied),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(%close_err, "failed to close output file after stream error");
            Err(err)
        }
    }
}

/// Rotate the file at `path` once if `policy` says it is due.
///
/// A missing file is created empty. Returns whether a rotation happened.
pub fn rotate_once(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<bool, RotateError> {
    let engine = RotationEngine::open(path, policy)?;
    let rotated = engine.rotate();

    match (rotated, engine.close()) {
        (Ok(rotated), Ok(())) => Ok(rotated),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), close) => {
            if let Err(close_err) = close {
                warn!(%close_err, "failed to close output file after rotation error");
            }
            Err(err)
        }
    }
}
