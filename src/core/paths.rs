//! core::paths
//!
//! Centralized path routing for wikifork storage locations.
//!
//! # Storage Layout
//!
//! All side storage lives under `<git_dir>/wikifork/`, next to the objects
//! it describes, so a repository copy carries its index and config along:
//!
//! - `config.toml` - Repository configuration
//! - `locks/` - One lock file per (page, branch) scope
//! - `index/` - Commit index entries, one JSON file per (branch, page)
//!
//! Lock and index file names are the SHA-256 of the (branch, page) pair, so
//! branch names containing `/` never create nested directories.
//!
//! # Example
//!
//! ```
//! use wikifork::core::paths::WikiPaths;
//! use std::path::PathBuf;
//!
//! let paths = WikiPaths::new(PathBuf::from("/srv/wiki.git"));
//! assert_eq!(
//!     paths.repo_config_path(),
//!     PathBuf::from("/srv/wiki.git/wikifork/config.toml")
//! );
//! ```

use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::core::types::{BranchName, PageName};

/// Centralized path routing for wikifork storage.
///
/// No code outside this module should compute `*.join("wikifork")` paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPaths {
    /// Path to the git directory (the repository itself for bare repos).
    pub git_dir: PathBuf,
}

impl WikiPaths {
    /// Create paths rooted at a git directory.
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }

    /// `<git_dir>/wikifork`
    pub fn wiki_dir(&self) -> PathBuf {
        self.git_dir.join("wikifork")
    }

    /// `<git_dir>/wikifork/config.toml`
    pub fn repo_config_path(&self) -> PathBuf {
        self.wiki_dir().join("config.toml")
    }

    /// `<git_dir>/wikifork/locks`
    pub fn lock_dir(&self) -> PathBuf {
        self.wiki_dir().join("locks")
    }

    /// `<git_dir>/wikifork/index`
    pub fn index_dir(&self) -> PathBuf {
        self.wiki_dir().join("index")
    }

    /// Lock file for one (page, branch) scope.
    pub fn lock_path(&self, page: &PageName, branch: &BranchName) -> PathBuf {
        self.lock_dir()
            .join(format!("{}.lock", scope_key(branch, page)))
    }

    /// Index entry file for one (branch, page) pair.
    pub fn index_entry_path(&self, branch: &BranchName, page: &PageName) -> PathBuf {
        self.index_dir()
            .join(format!("{}.json", scope_key(branch, page)))
    }
}

/// Hex SHA-256 of `branch NUL page`.
///
/// The NUL separator cannot appear in either part, so distinct pairs never
/// share a key.
pub fn scope_key(branch: &BranchName, page: &PageName) -> String {
    let mut hasher = Sha256::new();
    hasher.update(branch.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(page.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
