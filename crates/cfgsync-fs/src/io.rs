//! Atomic I/O, advisory locking, and symlink-aware tree operations
//!
//! Nothing in this module follows a symlink unless the function name says
//! so: links are inspected, copied, and removed as links.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoff;
use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Retry policy for lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// Give up acquiring a lock after this long.
    pub lock_timeout: Duration,
    /// First retry delay; grows exponentially up to `lock_timeout`.
    pub retry_interval: Duration,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            retry_interval: Duration::from_millis(20),
        }
    }
}

impl RobustnessConfig {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.retry_interval,
            current_interval: self.retry_interval,
            max_interval: self.lock_timeout,
            max_elapsed_time: Some(self.lock_timeout),
            ..ExponentialBackoff::default()
        }
    }
}

/// Exclusive advisory lock held for the lifetime of the guard.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

/// Acquire an exclusive advisory lock on `path`, creating the file if needed.
///
/// Contended locks are retried with exponential backoff until
/// `config.lock_timeout` elapses.
pub fn acquire_lock(path: &NormalizedPath, config: RobustnessConfig) -> Result<LockGuard> {
    let native_path = path.to_native();
    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&native_path)
        .map_err(|e| Error::io(&native_path, e))?;

    backoff::retry(config.backoff(), || {
        FileExt::try_lock_exclusive(&file).map_err(backoff::Error::transient)
    })
    .map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    tracing::debug!(path = %native_path.display(), "lock acquired");
    Ok(LockGuard {
        file,
        path: native_path,
    })
}

/// Write content atomically to a file.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// What occupies a path, determined without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Missing,
    File,
    Dir,
    Symlink,
    /// Sockets, fifos, devices
    Other,
}

impl EntryKind {
    pub fn exists(self) -> bool {
        self != EntryKind::Missing
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntryKind::Missing => "nothing",
            EntryKind::File => "file",
            EntryKind::Dir => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "special file",
        };
        f.write_str(label)
    }
}

/// Classify `path` using `symlink_metadata`.
pub fn entry_kind(path: &Path) -> Result<EntryKind> {
    match fs::symlink_metadata(path) {
        Ok(meta) => {
            let ft = meta.file_type();
            Ok(if ft.is_symlink() {
                EntryKind::Symlink
            } else if ft.is_dir() {
                EntryKind::Dir
            } else if ft.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(EntryKind::Missing),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Read a symlink's target, resolving a relative target against the link's
/// parent directory. Exactly one hop is followed.
pub fn read_link_absolute(link: &Path) -> Result<PathBuf> {
    let raw = fs::read_link(link).map_err(|e| Error::io(link, e))?;
    if raw.is_absolute() {
        return Ok(raw);
    }
    let parent = link.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(raw))
}

/// Create a symlink at `link` pointing to `source`.
pub fn symlink(source: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(source, link);

    #[cfg(windows)]
    let result = if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, link)
    } else {
        std::os::windows::fs::symlink_file(source, link)
    };

    result.map_err(|e| Error::io(link, e))
}

/// Remove whatever occupies `path` without following symlinks.
///
/// Returns `false` when nothing was there.
pub fn remove_entry(path: &Path) -> Result<bool> {
    match entry_kind(path)? {
        EntryKind::Missing => Ok(false),
        EntryKind::Dir => {
            fs::remove_dir_all(path).map_err(|e| Error::io(path, e))?;
            Ok(true)
        }
        EntryKind::Symlink => {
            // Windows directory links must be removed as directories
            if let Err(e) = fs::remove_file(path) {
                if cfg!(windows) {
                    fs::remove_dir(path).map_err(|e| Error::io(path, e))?;
                } else {
                    return Err(Error::io(path, e));
                }
            }
            Ok(true)
        }
        EntryKind::File | EntryKind::Other => {
            fs::remove_file(path).map_err(|e| Error::io(path, e))?;
            Ok(true)
        }
    }
}

/// Copy `src` to `dst` recursively. Symlinks anywhere in the tree are
/// recreated as symlinks with the same raw target.
///
/// `dst` must not exist.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    match entry_kind(src)? {
        EntryKind::Symlink => {
            let target = fs::read_link(src).map_err(|e| Error::io(src, e))?;
            symlink(&target, dst)
        }
        EntryKind::File => {
            fs::copy(src, dst).map_err(|e| Error::io(dst, e))?;
            Ok(())
        }
        EntryKind::Dir => {
            fs::create_dir(dst).map_err(|e| Error::io(dst, e))?;
            let entries = fs::read_dir(src).map_err(|e| Error::io(src, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| Error::io(src, e))?;
                copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
            }
            Ok(())
        }
        EntryKind::Missing => Err(Error::io(
            src,
            std::io::Error::new(ErrorKind::NotFound, "source does not exist"),
        )),
        EntryKind::Other => Err(Error::UnsupportedEntry {
            path: src.to_path_buf(),
        }),
    }
}
