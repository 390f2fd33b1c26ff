//! wiki::error
//!
//! The error type returned by every wiki entry point.
//!
//! Lower layers keep their own error enums; they are folded into
//! [`WikiError`] here so callers match on one taxonomy. Repository, index
//! and lock failures (lock timeouts included) all surface as
//! [`WikiError::StoreIo`].

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::index::IndexError;
use crate::core::ops::lock::LockError;
use crate::core::page::PageError;
use crate::core::revisions::RevisionError;
use crate::core::types::{PageName, TypeError};
use crate::git::GitError;

use super::diff::DiffParseError;

/// Errors from wiki operations.
#[derive(Debug, Error)]
pub enum WikiError {
    /// The page has no version on the branch or revision.
    #[error("page '{page}' not found on {at}")]
    PageNotFound { page: PageName, at: String },

    /// The branch does not exist.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// The page name is not usable.
    #[error("invalid page name: {0}")]
    InvalidPageName(String),

    /// A fork could not be merged cleanly; no branch moved.
    #[error("changes to '{page}' conflict with the canonical version at: {}", paths.join(", "))]
    MergeConflict { page: PageName, paths: Vec<String> },

    /// A history offset outside the page's revisions.
    #[error("revision {offset} of '{page}' does not exist ({length} revisions)")]
    IndexOutOfRange {
        page: PageName,
        offset: i64,
        length: usize,
    },

    /// A stored diff could not be parsed.
    #[error("cannot parse diff: {0}")]
    DiffParseError(String),

    /// Storage failure: repository, commit index, or page lock.
    #[error("storage error: {0}")]
    StoreIo(String),

    /// The requester's role does not allow the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<GitError> for WikiError {
    fn from(err: GitError) -> Self {
        WikiError::StoreIo(err.to_string())
    }
}

impl From<LockError> for WikiError {
    fn from(err: LockError) -> Self {
        WikiError::StoreIo(err.to_string())
    }
}

impl From<RevisionError> for WikiError {
    fn from(err: RevisionError) -> Self {
        match err {
            RevisionError::PageNotFound { page, at } => WikiError::PageNotFound { page, at },
            RevisionError::BranchNotFound(branch) => WikiError::BranchNotFound(branch.to_string()),
            RevisionError::MergeConflict { page, paths, .. } => {
                WikiError::MergeConflict { page, paths }
            }
            other => WikiError::StoreIo(other.to_string()),
        }
    }
}

impl From<IndexError> for WikiError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::OutOfRange {
                page,
                offset,
                length,
            } => WikiError::IndexOutOfRange {
                page,
                offset,
                length,
            },
            IndexError::Revision(e) => e.into(),
            other => WikiError::StoreIo(other.to_string()),
        }
    }
}

impl From<PageError> for WikiError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Schema(message) => WikiError::Config(ConfigError::InvalidValue(message)),
            other => WikiError::StoreIo(other.to_string()),
        }
    }
}

impl From<TypeError> for WikiError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidPageName(message) => WikiError::InvalidPageName(message),
            TypeError::InvalidIdentity(message) => WikiError::PermissionDenied(message),
            other => WikiError::StoreIo(other.to_string()),
        }
    }
}

impl From<DiffParseError> for WikiError {
    fn from(err: DiffParseError) -> Self {
        WikiError::DiffParseError(err.to_string())
    }
}
