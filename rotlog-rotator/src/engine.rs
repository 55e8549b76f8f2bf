//! Rotation engine.
//!
//! Couples one `SizedFileHandle` with one `RotationPolicy`. Every write is
//! followed by a rotation check; a rotation either renames the active file
//! aside with a timestamp suffix or truncates it in place, then starts a
//! background cleanup of stale versions.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use rotlog_clock::{Clock, SystemClock};
use rotlog_fs::{
    cleanup_versions, list_versions, version_path, CleanupError, CleanupReport, FsError,
    SizedFileHandle,
};
use rotlog_stream::{CancelToken, PreemptibleReader, CHUNK_SIZE};
use tracing::{debug, info, warn};

use crate::error::RotateError;
use crate::policy::RotationPolicy;

/// Output file with a rotation policy applied to every write.
#[derive(Debug)]
pub struct RotationEngine<C: Clock = SystemClock> {
    policy: RotationPolicy,
    handle: SizedFileHandle<C>,
    cleanups: Mutex<Vec<JoinHandle<()>>>,
}

impl RotationEngine<SystemClock> {
    /// Validate `policy` and open the output file at `path`.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self, RotateError> {
        Self::open_with_clock(path, policy, SystemClock)
    }
}

impl<C: Clock> RotationEngine<C> {
    /// Validate `policy` and open the output file at `path`, taking "now"
    /// from `clock`.
    pub fn open_with_clock(
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
        clock: C,
    ) -> Result<Self, RotateError> {
        policy.validate()?;
        let handle = SizedFileHandle::open_with_clock(path, policy.create_mode, clock)?;

        Ok(Self {
            policy,
            handle,
            cleanups: Mutex::new(Vec::new()),
        })
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    pub fn handle(&self) -> &SizedFileHandle<C> {
        &self.handle
    }

    /// Path of the active output file.
    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    /// Whether the active file is due for rotation right now.
    pub fn needs_rotation(&self) -> bool {
        // Size and age are sampled separately; a single producer keeps them consistent.
        self.policy
            .needs_rotation(self.handle.size(), self.handle.age())
    }

    /// Rotate the active file if the policy says it is due.
    ///
    /// Returns `Ok(false)` when no rotation was needed. On success a
    /// cleanup of stale versions is started in the background; a failed
    /// rotation starts no cleanup.
    pub fn rotate(&self) -> Result<bool, RotateError> {
        if !self.needs_rotation() {
            return Ok(false);
        }

        let size = self.handle.size();
        debug!(size, age = ?self.handle.age(), "rotation due");
        if self.policy.retained == 0 {
            self.handle.truncate()?;
            info!(path = %self.path().display(), size, "truncated output file");
        } else {
            let suffix = self.policy.suffix(self.handle.clock().now())?;
            let version = version_path(self.path(), &suffix);
            self.handle.reopen(&version, self.policy.create_mode)?;
            info!(
                path = %self.path().display(),
                version = %version.display(),
                size,
                "rotated output file"
            );
        }

        self.spawn_cleanup();
        Ok(true)
    }

    /// Rotated versions of the output file, oldest first.
    pub fn versions(&self) -> Result<Vec<PathBuf>, FsError> {
        list_versions(self.path())
    }

    /// Remove versions beyond the retained count.
    pub fn cleanup(&self) -> Result<CleanupReport, CleanupError> {
        cleanup_versions(self.path(), self.policy.retained)
    }

    fn spawn_cleanup(&self) {
        let path = self.path().to_path_buf();
        let retained = self.policy.retained;

        let spawned = thread::Builder::new()
            .name("rotlog-cleanup".to_string())
            .spawn(move || match cleanup_versions(&path, retained) {
                Ok(report) if !report.removed.is_empty() => {
                    debug!(removed = ?report.removed, "removed stale versions");
                }
                Ok(_) => {}
                Err(err) => warn!(path = %path.display(), %err, "version cleanup failed"),
            });

        match spawned {
            Ok(cleanup) => {
                let mut cleanups = self
                    .cleanups
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                cleanups.retain(|c| !c.is_finished());
                cleanups.push(cleanup);
            }
            Err(err) => warn!(%err, "could not start version cleanup"),
        }
    }

    /// Block until every background cleanup started so far has finished.
    pub fn wait_for_cleanup(&self) {
        let pending = std::mem::take(
            &mut *self
                .cleanups
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for cleanup in pending {
            let _ = cleanup.join();
        }
    }

    /// Write to the active file, then rotate if due.
    ///
    /// A failed write returns before the rotation check.
    pub fn write(&self, buf: &[u8]) -> Result<usize, RotateError> {
        let n = self.handle.write(buf)?;
        self.rotate()?;
        Ok(n)
    }

    /// Write all of `buf`, rotating between partial writes as needed.
    pub fn write_all(&self, mut buf: &[u8]) -> Result<(), RotateError> {
        while !buf.is_empty() {
            let n = self.write(buf)?;
            if n == 0 {
                return Err(FsError::Write {
                    path: self.path().to_path_buf(),
                    source: io::Error::from(io::ErrorKind::WriteZero),
                }
                .into());
            }
            buf = &buf[n..];
        }
        Ok(())
    }

    /// Copy `source` into the output file until it ends or `cancel` fires.
    ///
    /// Returns the number of bytes copied. A clean end of stream, including
    /// one caused by cancellation, is success; every other terminal outcome
    /// is returned as an error. Cancellation is observed between chunks.
    pub fn pipe<R>(&self, cancel: &CancelToken, source: R) -> Result<u64, RotateError>
    where
        R: Read + Send + 'static,
    {
        let reader = PreemptibleReader::new(cancel, source);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut copied = 0u64;

        loop {
            let n = reader.read_chunk(&mut buf)?;
            if n == 0 {
                debug!(path = %self.path().display(), copied, "input stream ended");
                return Ok(copied);
            }
            self.write_all(&buf[..n])?;
            copied += n as u64;
        }
    }

    /// Wait for background cleanups, then flush and close the output file.
    pub fn close(self) -> Result<(), RotateError> {
        self.wait_for_cleanup();
        self.handle.close()?;
        Ok(())
    }
}

impl<C: Clock> Write for &RotationEngine<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotationEngine::<C>::write(*self, buf).map_err(|err| match err {
            RotateError::Fs(FsError::Write { source, .. }) => source,
            other => io::Error::new(io::ErrorKind::Other, other),
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
