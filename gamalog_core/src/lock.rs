//! Single-instance guard for the rotator (advisory `flock` via fs2).
//!
//! The lock is released when the guard drops, on every exit path. The tailer
//! never takes it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("{} is held by another process", path.display())]
    Busy { path: PathBuf },
    #[error("cannot lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct RotationLock {
    path: PathBuf,
}

/// Proof that the rotation lock is held.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl RotationLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock without blocking; `LockError::Busy` when another holder exists.
    pub fn try_acquire(&self) -> Result<LockGuard, LockError> {
        let io = |source| LockError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(io)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(io)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "rotation lock acquired");
                Ok(LockGuard {
                    file,
                    path: self.path.clone(),
                })
            }
            Err(e) if is_contended(&e) => Err(LockError::Busy {
                path: self.path.clone(),
            }),
            Err(e) => Err(io(e)),
        }
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            // Closing the descriptor releases the flock anyway.
            tracing::warn!(path = %self.path.display(), error = %e, "explicit unlock failed");
        } else {
            tracing::debug!(path = %self.path.display(), "rotation lock released");
        }
    }
}
