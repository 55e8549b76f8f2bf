//! rotlog CLI.
//!
//! This crate provides the command-line interface for rotlog. It handles
//! argument parsing, validation, signal handling and log setup, and maps
//! failures to exit codes.

pub mod cli;
pub mod commands;
pub mod exit;
pub mod logger;
pub mod signal;

pub use cli::{
    parse_duration, parse_from, parse_mode, parse_size, Cli, CliError, Command, PolicyArgs,
    RotateArgs, DEFAULT_COUNT, DEFAULT_MAX_AGE, DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE, DEFAULT_MODE,
    DEFAULT_PATTERN,
};
pub use commands::pipe::PipeResult;
pub use commands::{execute_pipe, execute_rotate, CommandError, CommandResult};
pub use logger::{init_tracing, Verbosity};
pub use signal::ShutdownFlag;
