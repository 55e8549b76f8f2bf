//! Filesystem layer for rotlog.
//!
//! This crate provides:
//! - `SizedFileHandle`, a thread-safe output file that tracks its size and
//!   creation time and supports rename-aside and truncate rotation
//! - Version naming, listing and retention cleanup

pub mod error;
pub mod handle;
pub mod versions;

pub use error::{CleanupError, FsError, RemoveFailure};
pub use handle::{creation_time, SizedFileHandle};
pub use versions::{cleanup_versions, list_versions, version_path, CleanupReport};
