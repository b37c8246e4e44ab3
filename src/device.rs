//! Scoped device contexts
//!
//! Some kernels need a device context held for the whole run. The caller of
//! the orchestrator acquires it and wraps it in a [`ContextGuard`], which
//! releases it on every exit path, including panics and early returns.
//! [`DeviceLock`] is the stock context: if the process is killed before the
//! guard runs, the kernel still drops the lock.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A device resource that must be released exactly once.
pub trait DeviceContext {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Release the resource.
    ///
    /// # Errors
    ///
    /// Returns error if the release itself fails
    fn release(&mut self) -> Result<()>;
}

/// Releases the wrapped context when dropped.
#[derive(Debug)]
pub struct ContextGuard<C: DeviceContext> {
    context: Option<C>,
}

impl<C: DeviceContext> ContextGuard<C> {
    /// Take ownership of an acquired context.
    #[must_use]
    pub fn new(context: C) -> Self {
        tracing::info!(context = %context.describe(), "device context acquired");
        Self {
            context: Some(context),
        }
    }

    /// Release now and report the result instead of logging it.
    ///
    /// # Errors
    ///
    /// Returns error if the release fails
    pub fn release(mut self) -> Result<()> {
        self.context.take().map_or(Ok(()), |mut c| {
            let described = c.describe();
            c.release()?;
            tracing::info!(context = %described, "device context released");
            Ok(())
        })
    }
}

impl<C: DeviceContext> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        if let Some(mut context) = self.context.take() {
            let described = context.describe();
            match context.release() {
                Ok(()) => tracing::info!(context = %described, "device context released"),
                Err(e) => tracing::error!(context = %described, error = %e, "device context release failed"),
            }
        }
    }
}

/// Exclusive claim on a device, held as an OS lock on an open lock file.
///
/// The lock lives on the file handle, not on the file's existence: the
/// kernel drops it when the handle closes, including when the holder is
/// killed. A lock file left behind by a dead run is reused, never an
/// obstacle. The file content (the holder's pid) is informational only.
#[derive(Debug)]
pub struct DeviceLock {
    path: PathBuf,
    file: Option<File>,
}

impl DeviceLock {
    /// Open the lock file and take the lock without blocking.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceBusy` if a live process holds the lock, or an IO
    /// error
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
        }
        let mut file = open_lock_file(&path).map_err(|e| {
            if is_contended(&e) {
                Error::DeviceBusy { path: path.clone() }
            } else {
                Error::file(&path, e)
            }
        })?;
        match try_lock(&file) {
            Ok(true) => {}
            Ok(false) => return Err(Error::DeviceBusy { path }),
            Err(e) => return Err(Error::file(path, e)),
        }

        file.set_len(0)
            .and_then(|()| writeln!(file, "{}", std::process::id()))
            .map_err(|e| Error::file(&path, e))?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Lock file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeviceContext for DeviceLock {
    fn describe(&self) -> String {
        format!("device lock {}", self.path.display())
    }

    // The file stays: unlinking it would let a waiter lock a stale inode
    // while a newcomer locks a fresh one.
    fn release(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.set_len(0).map_err(|e| Error::file(&self.path, e))?;
        }
        Ok(())
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(0);
    }
    options.open(path)
}

#[cfg(unix)]
fn try_lock(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    use nix::errno::Errno;
    use nix::fcntl::{flock, FlockArg};

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(true),
        Err(e) if e == Errno::EWOULDBLOCK => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// Without share access the open handle itself is the lock.
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn try_lock(_file: &File) -> std::io::Result<bool> {
    Ok(true)
}

fn is_contended(error: &std::io::Error) -> bool {
    // ERROR_SHARING_VIOLATION
    cfg!(windows) && error.raw_os_error() == Some(32)
}
