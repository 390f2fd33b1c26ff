//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and writes
//! flow through this interface. No other module should import `git2`.
//!
//! # Responsibilities
//!
//! - Repository discovery, opening and bare initialization
//! - Ref operations (resolve, list, CAS update)
//! - Object operations (read blob at path, build commits without a worktree)
//! - In-memory tree merges
//! - Ancestry queries and per-path first-parent history
//! - Per-path diffs against the first parent
//!
//! # Invariants
//!
//! - All ref updates use CAS (compare-and-swap) semantics
//! - No other module calls git2 directly
//! - All operations return strong types (Oid, BranchName, RefName)
//!
//! # Example
//!
//! ```ignore
//! use wikifork::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/wiki.git"))?;
//! let head = git.resolve_ref("refs/heads/master")?;
//! let body = git.read_path(&head, "Home.md")?;
//! ```

mod interface;
mod log;

pub use interface::{CommitAuthor, CommitInfo, Git, GitError, PathDiff, RefEntry, TreeMerge};
pub use log::PathLog;
