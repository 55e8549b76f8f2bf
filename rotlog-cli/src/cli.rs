//! CLI argument parsing for rotlog.
//!
//! `rotlog [FLAGS] LOGFILE` copies standard input into LOGFILE, rotating it
//! as it grows. `rotlog rotate [FLAGS] LOGFILE` rotates LOGFILE once if it is
//! due and exits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use rotlog_rotator::{PolicyError, RotationPolicy};
use thiserror::Error;

/// Default maximum size of the active file.
pub const DEFAULT_MAX_SIZE: &str = "32MiB";

/// Default minimum size before age-based rotation applies.
pub const DEFAULT_MIN_SIZE: &str = "512KiB";

/// Default maximum age of the active file.
pub const DEFAULT_MAX_AGE: &str = "7d";

/// Default number of rotated versions to keep.
pub const DEFAULT_COUNT: i64 = rotlog_rotator::DEFAULT_RETAINED;

/// Default strftime pattern for version suffixes.
pub const DEFAULT_PATTERN: &str = rotlog_rotator::DEFAULT_PATTERN;

/// Default permission bits for created files.
pub const DEFAULT_MODE: &str = "0644";

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("a LOGFILE argument is required")]
    MissingLogfile,

    #[error("max-size must be at least 1 byte")]
    ZeroMaxSize,

    #[error("mode must be at most 0o7777, got {0:#o}")]
    InvalidMode(u32),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// rotlog - copy a stream into a self-rotating log file.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "rotlog")]
#[command(version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// File that receives standard input.
    #[arg(required = true)]
    pub logfile: Option<PathBuf>,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rotate LOGFILE once if the policy says it is due.
    Rotate(RotateArgs),
}

/// Arguments for the rotate command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RotateArgs {
    /// File to rotate.
    pub logfile: PathBuf,
}

/// Rotation flags shared by every mode.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PolicyArgs {
    /// Enable rotation.
    #[arg(long, default_value_t = true, action = ArgAction::Set, global = true)]
    pub rotate: bool,

    /// Rotate once the file reaches this size (e.g. 10MB, 32MiB, 4096).
    #[arg(long, default_value = DEFAULT_MAX_SIZE, value_parser = parse_size, global = true)]
    pub max_size: u64,

    /// Rotate once the file is older than this (e.g. 1h, 7d).
    #[arg(long, default_value = DEFAULT_MAX_AGE, value_parser = parse_duration, global = true)]
    pub max_age: Duration,

    /// Hold back age-based rotation until the file reaches this size.
    #[arg(long, default_value = DEFAULT_MIN_SIZE, value_parser = parse_size, global = true)]
    pub min_size: u64,

    /// Rotated versions to keep: -1 keeps all, 0 truncates in place.
    #[arg(long, default_value_t = DEFAULT_COUNT, allow_negative_numbers = true, global = true)]
    pub count: i64,

    /// strftime pattern for rotated file suffixes.
    #[arg(long, default_value = DEFAULT_PATTERN, global = true)]
    pub pattern: String,

    /// Permission bits for created files (0644, 0o644, 0x1a4 or 420).
    #[arg(long, default_value = DEFAULT_MODE, value_parser = parse_mode, global = true)]
    pub mode: u32,
}

impl PolicyArgs {
    /// Validate the flags and build the rotation policy they describe.
    pub fn to_policy(&self) -> Result<RotationPolicy, CliError> {
        if self.max_size == 0 {
            return Err(CliError::ZeroMaxSize);
        }
        if self.mode > 0o7777 {
            return Err(CliError::InvalidMode(self.mode));
        }

        let policy = RotationPolicy {
            enabled: self.rotate,
            max_size: self.max_size,
            min_size: self.min_size,
            max_age: self.max_age,
            retained: self.count,
            pattern: self.pattern.clone(),
            create_mode: self.mode,
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl Cli {
    /// The file standard input is copied into.
    pub fn pipe_target(&self) -> Result<&Path, CliError> {
        self.logfile.as_deref().ok_or(CliError::MissingLogfile)
    }
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}

/// Parse a byte size such as `4096`, `10KB` or `32MiB`.
///
/// Decimal units multiply by 1000, binary units by 1024. Units are
/// case-insensitive.
pub fn parse_size(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    if digits.is_empty() {
        return Err(format!("invalid size {:?}: expected a number", value));
    }
    let number: u64 = digits
        .parse()
        .map_err(|err| format!("invalid size {:?}: {}", value, err))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "kib" => 1 << 10,
        "mb" => 1_000_000,
        "mib" => 1 << 20,
        "gb" => 1_000_000_000,
        "gib" => 1 << 30,
        "tb" => 1_000_000_000_000,
        "tib" => 1 << 40,
        other => return Err(format!("invalid size {:?}: unknown unit {:?}", value, other)),
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("invalid size {:?}: too large", value))
}

/// Parse a human-readable duration such as `90s`, `1h 30m` or `7d`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| format!("invalid duration {:?}: {}", value, err))
}

/// Parse permission bits: octal with a leading `0` or `0o`, hex with `0x`,
/// otherwise decimal.
pub fn parse_mode(value: &str) -> Result<u32, String> {
    let value = value.trim();
    let parsed = if let Some(octal) = value.strip_prefix("0o") {
        u32::from_str_radix(octal, 8)
    } else if let Some(hex) = value.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else if value.len() > 1 && value.starts_with('0') {
        u32::from_str_radix(&value[1..], 8)
    } else {
        value.parse()
    };
    parsed.map_err(|err| format!("invalid mode {:?}: {}", value, err))
}
