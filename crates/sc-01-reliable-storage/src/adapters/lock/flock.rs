//! Advisory lock file implemented with `fs2` (flock on Unix, LockFile on Windows).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::domain::errors::StorageError;

/// How long `acquire` waits for a competing holder to go away.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

const LOCK_FILE: &str = "LOCK";
const MAX_RETRY_DELAY: Duration = Duration::from_millis(500);

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug)]
pub enum LockError {
    /// Lock file could not be opened.
    CreateFailed(io::Error),
    /// Another live process holds the lock.
    AlreadyLocked { pid: Option<u32>, path: PathBuf },
    /// Lock acquired but the owner PID could not be recorded.
    WriteFailed(io::Error),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::CreateFailed(e) => write!(f, "cannot open lock file: {}", e),
            LockError::AlreadyLocked {
                pid: Some(pid),
                path,
            } => write!(f, "{} is held by process {}", path.display(), pid),
            LockError::AlreadyLocked { pid: None, path } => {
                write!(f, "{} is held by another process", path.display())
            }
            LockError::WriteFailed(e) => write!(f, "cannot record lock owner: {}", e),
        }
    }
}

impl std::error::Error for LockError {}

impl From<LockError> for StorageError {
    fn from(err: LockError) -> Self {
        StorageError::Locked(err.to_string())
    }
}

// =============================================================================
// LOCK
// =============================================================================

/// Exclusive lock over a data directory, released on drop.
pub struct DataDirectoryLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DataDirectoryLock {
    /// Acquire with `DEFAULT_LOCK_TIMEOUT`.
    pub fn acquire(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire_with_timeout(data_dir, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire the lock, retrying with backoff until `timeout` elapses.
    ///
    /// A lock file naming a PID that no longer runs is treated as left behind
    /// by a crash and removed.
    pub fn acquire_with_timeout(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let path = data_dir.join(LOCK_FILE);
        let mut retry_delay = Duration::from_millis(20);

        loop {
            // No truncate here: the current holder's PID must stay readable.
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .map_err(LockError::CreateFailed)?;

            if file.try_lock_exclusive().is_ok() {
                let pid = std::process::id();
                let mut file = file;
                file.set_len(0).map_err(LockError::WriteFailed)?;
                writeln!(file, "{}", pid).map_err(LockError::WriteFailed)?;
                file.sync_all().map_err(LockError::WriteFailed)?;
                return Ok(Self { file, path, pid });
            }
            drop(file);

            let holder = read_pid(&path);
            if let Some(pid) = holder {
                if pid != std::process::id() && !is_process_running(pid) {
                    let _ = std::fs::remove_file(&path);
                    continue;
                }
            }

            if Instant::now() >= deadline {
                return Err(LockError::AlreadyLocked { pid: holder, path });
            }
            std::thread::sleep(retry_delay);
            retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirectoryLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Whether a process with this PID exists.
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        Path::new(&format!("/proc/{}", pid)).exists()
    }

    #[cfg(not(unix))]
    {
        // No cheap probe; assume alive.
        let _ = pid;
        true
    }
}
