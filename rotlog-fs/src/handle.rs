//! Sized output file handle.
//!
//! `SizedFileHandle` owns the open output file together with the number of
//! bytes written to it and the instant it was created. The three are kept
//! under one lock because `reopen` and `truncate` replace them together.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rotlog_clock::{elapsed_since, Clock, SystemClock};
use tracing::debug;

use crate::error::FsError;

#[derive(Debug)]
struct HandleState {
    file: Option<File>,
    size: u64,
    created: DateTime<Utc>,
}

/// Thread-safe output file that counts the bytes written to it.
#[derive(Debug)]
pub struct SizedFileHandle<C: Clock = SystemClock> {
    path: PathBuf,
    clock: C,
    state: RwLock<HandleState>,
}

impl SizedFileHandle<SystemClock> {
    /// Create or append to the output file at `path`.
    pub fn open(path: impl Into<PathBuf>, mode: u32) -> Result<Self, FsError> {
        Self::open_with_clock(path, mode, SystemClock)
    }
}

impl<C: Clock> SizedFileHandle<C> {
    /// Create or append to the output file at `path`, taking "now" from `clock`.
    ///
    /// A missing file is created empty with permission bits `mode`. An
    /// existing file is opened for appending; its size and creation time are
    /// recovered from filesystem metadata.
    pub fn open_with_clock(path: impl Into<PathBuf>, mode: u32, clock: C) -> Result<Self, FsError> {
        let path = path.into();

        let state = match fs::metadata(&path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "creating output file");
                create(&path, mode, &clock)?
            }
            Err(source) => return Err(FsError::Stat { path, source }),
            Ok(meta) => {
                let file = OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .map_err(|source| FsError::Open {
                        path: path.clone(),
                        source,
                    })?;
                let created = creation_time(&meta).unwrap_or_else(|| clock.now());
                debug!(
                    path = %path.display(),
                    size = meta.len(),
                    %created,
                    "appending to existing output file"
                );
                HandleState {
                    file: Some(file),
                    size: meta.len(),
                    created,
                }
            }
        };

        Ok(Self {
            path,
            clock,
            state: RwLock::new(state),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, HandleState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> RwLockWriteGuard<'_, HandleState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append bytes to the output file.
    ///
    /// Returns the number of bytes the OS accepted, which may be fewer than
    /// `buf.len()`; the size counter grows by exactly that amount.
    pub fn write(&self, buf: &[u8]) -> Result<usize, FsError> {
        let mut state = self.lock();
        let file = state
            .file
            .as_mut()
            .ok_or_else(|| FsError::Closed(self.path.clone()))?;

        let n = file.write(buf).map_err(|source| FsError::Write {
            path: self.path.clone(),
            source,
        })?;
        state.size += n as u64;
        Ok(n)
    }

    /// Retire the current file to `rename` and start a fresh one at the
    /// original path.
    ///
    /// Steps run in order (sync, close, rename, create) and the first
    /// failure stops the rest. After a failure the handle stays closed.
    pub fn reopen(&self, rename: &Path, mode: u32) -> Result<(), FsError> {
        let mut state = self.lock();

        if let Some(file) = state.file.take() {
            sync(&self.path, &file)?;
        }

        fs::rename(&self.path, rename).map_err(|source| FsError::Rename {
            from: self.path.clone(),
            to: rename.to_path_buf(),
            source,
        })?;

        *state = create(&self.path, mode, &self.clock)?;
        Ok(())
    }

    /// Discard the file's contents in place.
    ///
    /// The size counter is reset, the creation time is left as it was.
    pub fn truncate(&self) -> Result<(), FsError> {
        let mut state = self.lock();

        if let Some(file) = state.file.take() {
            sync(&self.path, &file)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| FsError::Truncate {
                path: self.path.clone(),
                source,
            })?;

        state.file = Some(file);
        state.size = 0;
        Ok(())
    }

    /// Flush and close the file. Closing twice is a no-op.
    ///
    /// Only the flush (`sync_all`) is reported. The descriptor is released
    /// by dropping the `File`, which discards any error from close(2); once
    /// `sync_all` has succeeded there is no buffered data left for it to lose.
    pub fn close(&self) -> Result<(), FsError> {
        match self.lock().file.take() {
            Some(file) => sync(&self.path, &file),
            None => Ok(()),
        }
    }

    /// Time elapsed since the file was created.
    pub fn age(&self) -> Duration {
        elapsed_since(&self.clock, self.created())
    }

    /// Bytes written since the file was created or last rotated.
    pub fn size(&self) -> u64 {
        self.read().size
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.read().created
    }

    /// Path the handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

fn create<C: Clock>(path: &Path, mode: u32, clock: &C) -> Result<HandleState, FsError> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    set_mode(&mut options, mode);

    let file = options.open(path).map_err(|source| FsError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(HandleState {
        file: Some(file),
        size: 0,
        created: clock.now(),
    })
}

fn sync(path: &Path, file: &File) -> Result<(), FsError> {
    file.sync_all().map_err(|source| FsError::Sync {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn set_mode(options: &mut OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn set_mode(_options: &mut OpenOptions, _mode: u32) {}

/// Creation time as reported by the filesystem.
///
/// Prefers the birth time, then the inode change time on unix, then the
/// modification time.
pub fn creation_time(meta: &Metadata) -> Option<DateTime<Utc>> {
    if let Ok(born) = meta.created() {
        return Some(DateTime::<Utc>::from(born));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Some(ctime) = DateTime::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32) {
            return Some(ctime);
        }
    }

    meta.modified().ok().map(DateTime::<Utc>::from)
}
