//! core::ops::lock
//!
//! Exclusive (page, branch) locks for read-modify-write sequences.
//!
//! # Architecture
//!
//! Every write holds the lock for its (page, branch) scope across
//! read-current-blob → write-new-commit → append-to-index. Two writers to the
//! same page on the same branch are therefore serialized, while writers to
//! different pages (or different branches) proceed in parallel.
//!
//! Locks are OS-level file locks (`fs2`), so they serialize threads of one
//! process and separate processes alike. On Linux, `flock` locks belong to
//! the open file description: each acquisition opens its own handle, and a
//! second acquisition of a held scope waits even within one process.
//!
//! # Invariants
//!
//! - A lock is released on drop (RAII), including on error paths
//! - Acquisition waits at most the configured timeout, then fails with
//!   [`LockError::Timeout`]; the caller decides whether to retry
//! - When two scopes are needed (promotion), canonical is locked before
//!   the fork
//!
//! # Example
//!
//! ```ignore
//! use wikifork::core::ops::lock::PageLocks;
//!
//! let locks = PageLocks::new(&paths, Duration::from_secs(5));
//! let lock = locks.acquire(&page, &branch)?;
//! // read, commit, append to index
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::WikiPaths;
use crate::core::types::{BranchName, PageName};

/// Delay between acquisition attempts while a scope is held elsewhere.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The scope stayed locked for the whole bounded wait.
    #[error("timed out after {waited:?} waiting for lock on page '{page}' (branch {branch})")]
    Timeout {
        page: PageName,
        branch: BranchName,
        waited: Duration,
    },

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),

    /// The caller passed a guard for a different scope.
    #[error("lock held for page '{held_page}' on {held_branch}, but '{page}' on {branch} was required")]
    WrongScope {
        held_page: PageName,
        held_branch: BranchName,
        page: PageName,
        branch: BranchName,
    },
}

/// Factory for (page, branch) locks rooted at one repository.
#[derive(Debug, Clone)]
pub struct PageLocks {
    paths: WikiPaths,
    timeout: Duration,
}

impl PageLocks {
    /// Create a lock factory with the given bounded wait.
    pub fn new(paths: &WikiPaths, timeout: Duration) -> Self {
        Self {
            paths: paths.clone(),
            timeout,
        }
    }

    /// The bounded wait applied by [`acquire`](Self::acquire).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the lock for `(page, branch)`, waiting up to the timeout.
    ///
    /// # Errors
    ///
    /// - [`LockError::Timeout`] if the scope stays locked
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(&self, page: &PageName, branch: &BranchName) -> Result<PageLock, LockError> {
        let file = self.open(page, branch)?;
        let started = Instant::now();

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!(page = %page, branch = %branch, "acquired page lock");
                    return Ok(PageLock {
                        page: page.clone(),
                        branch: branch.clone(),
                        path: self.paths.lock_path(page, branch),
                        file: Some(file),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    let waited = started.elapsed();
                    if waited >= self.timeout {
                        tracing::debug!(page = %page, branch = %branch, ?waited, "page lock timed out");
                        return Err(LockError::Timeout {
                            page: page.clone(),
                            branch: branch.clone(),
                            waited,
                        });
                    }
                    thread::sleep(POLL_INTERVAL.min(self.timeout - waited));
                }
                Err(e) => return Err(LockError::AcquireFailed(e.to_string())),
            }
        }
    }

    /// Try once to acquire the lock, returning `None` if it is held.
    pub fn try_acquire(
        &self,
        page: &PageName,
        branch: &BranchName,
    ) -> Result<Option<PageLock>, LockError> {
        let file = self.open(page, branch)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(PageLock {
                page: page.clone(),
                branch: branch.clone(),
                path: self.paths.lock_path(page, branch),
                file: Some(file),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    fn open(&self, page: &PageName, branch: &BranchName) -> Result<File, LockError> {
        let dir = self.paths.lock_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = self.paths.lock_path(page, branch);
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e)))
    }
}

/// An exclusive lock on one (page, branch) scope.
///
/// Holding a `PageLock` is also the proof that lock-requiring operations
/// (index appends, locked reconciliation) ask for.
#[derive(Debug)]
pub struct PageLock {
    page: PageName,
    branch: BranchName,
    path: PathBuf,
    file: Option<File>,
}

impl PageLock {
    /// The page this lock covers.
    pub fn page(&self) -> &PageName {
        &self.page
    }

    /// The branch this lock covers.
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify this guard holds exactly the `(page, branch)` scope.
    pub fn ensure_covers(&self, page: &PageName, branch: &BranchName) -> Result<(), LockError> {
        if self.is_held() && &self.page == page && &self.branch == branch {
            return Ok(());
        }
        Err(LockError::WrongScope {
            held_page: self.page.clone(),
            held_branch: self.branch.clone(),
            page: page.clone(),
            branch: branch.clone(),
        })
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for PageLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
