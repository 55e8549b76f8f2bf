//! Self-rotating output file.
//!
//! A `RotationEngine` appends to one output file and, after every write,
//! decides from its `RotationPolicy` whether the file should be retired.
//! Retired files are renamed to `<path>.<timestamp>` (or truncated in place
//! when no versions are kept) and a background cleanup prunes old versions.
//!
//! `run` and `rotate_once` wrap the engine for the common cases of piping a
//! stream into a file and rotating a file from the outside.

pub mod engine;
pub mod error;
pub mod policy;
pub mod run;

pub use engine::RotationEngine;
pub use error::RotateError;
pub use policy::{
    PolicyError, RotationPolicy, DEFAULT_CREATE_MODE, DEFAULT_MAX_AGE, DEFAULT_MAX_SIZE,
    DEFAULT_MIN_SIZE, DEFAULT_PATTERN, DEFAULT_RETAINED,
};
pub use run::{rotate_once, run};
