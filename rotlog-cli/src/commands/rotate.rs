//! One-shot rotation of an existing file.

use tracing::info;

use super::CommandResult;
use crate::cli::{PolicyArgs, RotateArgs};

/// Rotate `args.logfile` once if its policy says it is due.
///
/// Returns whether a rotation happened.
pub fn execute_rotate(args: &RotateArgs, policy: &PolicyArgs) -> CommandResult<bool> {
    let policy = policy.to_policy()?;
    let rotated = rotlog_rotator::rotate_once(&args.logfile, policy)?;

    info!(path = %args.logfile.display(), rotated, "rotate finished");
    Ok(rotated)
}
