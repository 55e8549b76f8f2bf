//! Rotation policy.
//!
//! A plain configuration value: thresholds, retention and naming. It is
//! fixed for the lifetime of an engine.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Default maximum size of the active file (32 MiB).
pub const DEFAULT_MAX_SIZE: u64 = 32 * 1024 * 1024;

/// Default minimum size before age-based rotation applies (512 KiB).
pub const DEFAULT_MIN_SIZE: u64 = 512 * 1024;

/// Default maximum age of the active file (7 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default number of rotated versions to keep.
pub const DEFAULT_RETAINED: i64 = 4;

/// Default strftime pattern for version suffixes.
pub const DEFAULT_PATTERN: &str = "%Y-%m-%dT%H%M%S";

/// Default permission bits for created files.
pub const DEFAULT_CREATE_MODE: u32 = 0o644;

/// Errors from policy validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("timestamp pattern must not be empty")]
    EmptyPattern,

    #[error("invalid timestamp pattern: {0:?}")]
    InvalidPattern(String),

    #[error("timestamp pattern {0:?} produces a path separator")]
    PatternHasSeparator(String),

    #[error("retained count must be -1 or greater, got {0}")]
    InvalidRetained(i64),
}

/// Rotation thresholds and retention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// When false, the output file is never rotated.
    pub enabled: bool,

    /// Rotate once the active file reaches this many bytes.
    pub max_size: u64,

    /// Age-based rotation is held back until the file reaches this many bytes.
    pub min_size: u64,

    /// Rotate once the active file is older than this.
    pub max_age: Duration,

    /// Versions to keep: -1 keeps all, 0 truncates in place instead of
    /// renaming, N keeps the newest N.
    pub retained: i64,

    /// strftime pattern for version suffixes. Must sort chronologically.
    pub pattern: String,

    /// Permission bits for newly created output files.
    pub create_mode: u32,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: DEFAULT_MAX_SIZE,
            min_size: DEFAULT_MIN_SIZE,
            max_age: DEFAULT_MAX_AGE,
            retained: DEFAULT_RETAINED,
            pattern: DEFAULT_PATTERN.to_string(),
            create_mode: DEFAULT_CREATE_MODE,
        }
    }
}

impl RotationPolicy {
    /// Validate the policy.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.retained < -1 {
            return Err(PolicyError::InvalidRetained(self.retained));
        }
        if self.pattern.is_empty() {
            return Err(PolicyError::EmptyPattern);
        }
        if StrftimeItems::new(&self.pattern).any(|item| matches!(item, Item::Error)) {
            return Err(PolicyError::InvalidPattern(self.pattern.clone()));
        }

        let sample = self.suffix(DateTime::<Utc>::default())?;
        if sample.chars().any(std::path::is_separator) {
            return Err(PolicyError::PatternHasSeparator(self.pattern.clone()));
        }
        Ok(())
    }

    /// Whether a file of `size` bytes and age `age` is due for rotation.
    pub fn needs_rotation(&self, size: u64, age: Duration) -> bool {
        if !self.enabled {
            return false;
        }

        if size >= self.max_size {
            return true;
        }

        age > self.max_age && size >= self.min_size
    }

    /// Version suffix for a rotation at `now`.
    pub fn suffix(&self, now: DateTime<Utc>) -> Result<String, PolicyError> {
        let mut suffix = String::new();
        write!(suffix, "{}", now.format(&self.pattern))
            .map_err(|_| PolicyError::InvalidPattern(self.pattern.clone()))?;
        Ok(suffix)
    }
}
