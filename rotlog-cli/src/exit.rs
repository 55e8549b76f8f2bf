//! Exit codes for the rotlog CLI.
//!
//! Following Unix conventions for exit codes.

use clap::error::ErrorKind;

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution, including a pipe ended by Ctrl+C.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments or rotation policy.
    pub const INVALID_ARGS: i32 = 1;
    /// Output file or version error.
    pub const IO_ERROR: i32 = 2;
    /// Input stream error.
    pub const STREAM_ERROR: i32 = 3;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) | CommandError::Policy(_) => codes::INVALID_ARGS,
        CommandError::Filesystem(_) => codes::IO_ERROR,
        CommandError::Stream(_) => codes::STREAM_ERROR,
    }
}

/// Map an argument parsing outcome to an exit code.
///
/// `--help` and `--version` surface as clap errors but are successful runs.
/// Every other parse failure is an argument error, never clap's default 2,
/// which would read as a filesystem error.
pub fn parse_exit_code(error: &clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => codes::SUCCESS,
        _ => codes::INVALID_ARGS,
    }
}
