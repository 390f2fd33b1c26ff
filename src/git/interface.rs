//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! wikifork. All repository interactions flow through the [`Git`] struct,
//! which returns strong types and normalizes errors into typed failure
//! categories.
//!
//! The wiki never checks out a working tree. Page writes build trees and
//! commits directly in the object database and then advance a branch ref
//! with compare-and-swap, so the repository is usually bare.
//!
//! # Error Handling
//!
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::ObjectNotFound`]: Commit or blob missing
//!
//! # Example
//!
//! ```ignore
//! use wikifork::git::{CommitAuthor, Git};
//! use std::path::Path;
//!
//! let git = Git::init_bare(Path::new("/srv/wiki.git"))?;
//! let author = CommitAuthor::new("wiki", "wiki@example.org");
//! let root = git.commit_empty_root(&author, "Initialize wiki")?;
//! git.update_ref_cas("refs/heads/master", &root, None, "wikifork: init")?;
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::log::PathLog;
use crate::core::types::{BranchName, Oid, RefName, TypeError};

/// File mode for page blobs.
const BLOB_MODE: i32 = 0o100_644;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    ///
    /// The ref moved between reading it and updating it.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Tree paths must be single top-level file names.
    #[error("invalid tree path: {path}")]
    InvalidPath {
        /// The rejected path
        path: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    pub(super) fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec if context.starts_with("refs/") => {
                GitError::InvalidRefName {
                    message: format!("{}: {}", context, err.message()),
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) | TypeError::InvalidBranchName(msg) => {
                GitError::InvalidRefName { message: msg }
            }
            TypeError::InvalidPageName(msg) | TypeError::InvalidIdentity(msg) => {
                GitError::Internal { message: msg }
            }
        }
    }
}

/// Name and email recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    fn signature(&self) -> Result<git2::Signature<'static>, GitError> {
        git2::Signature::now(&self.name, &self.email).map_err(|e| GitError::Internal {
            message: format!("invalid signature for {}: {}", self.email, e.message()),
        })
    }
}

/// A ref with its name and target OID.
#[derive(Debug, Clone)]
pub struct RefEntry {
    /// The full ref name
    pub name: RefName,
    /// The OID the ref points to
    pub oid: Oid,
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_time: chrono::DateTime<chrono::Utc>,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_time: chrono::DateTime<chrono::Utc>,
    /// Parent OIDs, first parent first
    pub parents: Vec<Oid>,
}

/// The change one commit made to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDiff {
    /// Unified diff text against the first parent, limited to the path.
    pub patch: String,
    /// True when the first parent had no version of the path.
    pub introduces_path: bool,
}

/// Result of merging two commits' trees in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeMerge {
    /// The merge succeeded; the merged tree has been written.
    Clean(Oid),
    /// The merge produced conflicts at these paths; nothing was written.
    Conflicted(Vec<String>),
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// imports `git2` directly.
///
/// A `Git` handle is not shared between threads: every thread or process
/// opens its own handle on the same repository.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository. Bare repositories are supported.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// Create (or reopen) a bare repository at `path`.
    pub fn init_bare(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::init_bare(path).map_err(|e| GitError::AccessError {
            message: format!("cannot initialize {}: {}", path.display(), e.message()),
        })?;
        Ok(Self { repo })
    }

    /// Path of the git directory (the repository itself when bare).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a ref to the commit it points at.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        let oid = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List all refs matching a prefix.
    pub fn list_refs_by_prefix(&self, prefix: &str) -> Result<Vec<RefEntry>, GitError> {
        let pattern = format!("{}*", prefix);
        let refs = self.repo.references_glob(&pattern)?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference?;

            let Some(name) = reference.name() else {
                continue;
            };
            let Ok(ref_name) = RefName::new(name) else {
                continue;
            };
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            let Ok(oid) = Oid::new(commit.id().to_string()) else {
                continue;
            };

            entries.push(RefEntry {
                name: ref_name,
                oid,
            });
        }

        Ok(entries)
    }

    /// List local branches under a name prefix (e.g. `fork/`).
    pub fn list_branches_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(BranchName, Oid)>, GitError> {
        let full = format!("{}{}", RefName::HEADS_PREFIX, prefix);
        let mut branches = Vec::new();
        for entry in self.list_refs_by_prefix(&full)? {
            if let Some(name) = entry.name.strip_prefix(RefName::HEADS_PREFIX) {
                if let Ok(branch) = BranchName::new(name) {
                    branches.push((branch, entry.oid));
                }
            }
        }
        Ok(branches)
    }

    // =========================================================================
    // CAS Ref Operations
    // =========================================================================

    /// Update a ref with compare-and-swap semantics.
    ///
    /// The update only succeeds if the ref's current value matches
    /// `expected_old`. If `expected_old` is `None`, the ref must not exist.
    /// The check and the update are a single libgit2 operation, so two
    /// racing updaters cannot both succeed.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    pub fn update_ref_cas(
        &self,
        refname: &str,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        let new = to_git2(new_oid)?;

        let result = match expected_old {
            Some(expected) => {
                let current = to_git2(expected)?;
                self.repo
                    .reference_matching(refname, new, true, current, message)
                    .map(|_| ())
            }
            None => self.repo.reference(refname, new, false, message).map(|_| ()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::Modified | git2::ErrorCode::Exists | git2::ErrorCode::NotFound
                ) =>
            {
                let actual = self
                    .try_resolve_ref_raw(refname)?
                    .unwrap_or_else(|| "<none>".to_string());
                Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected_old
                        .map(|o| o.to_string())
                        .unwrap_or_else(|| "<none>".to_string()),
                    actual,
                })
            }
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// Try to resolve a ref to its raw OID string (without validation).
    fn try_resolve_ref_raw(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let resolved = reference.resolve().unwrap_or(reference);
                let oid = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {} has no target", refname),
                })?;
                Ok(Some(oid.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// Returns true if ancestor == descendant (a commit is its own ancestor).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }

        self.repo
            .graph_descendant_of(to_git2(descendant)?, to_git2(ancestor)?)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })
    }

    /// Walk the first-parent history of `start`, yielding the commits that
    /// changed `path`, newest first.
    pub fn path_log(
        &self,
        start: &Oid,
        path: &str,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<PathLog<'_>, GitError> {
        PathLog::new(&self.repo, to_git2(start)?, path, limit, skip)
    }

    // =========================================================================
    // Blob and Tree Operations
    // =========================================================================

    /// Read a blob by OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the blob doesn't exist
    pub fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let blob = self
            .repo
            .find_blob(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        Ok(blob.content().to_vec())
    }

    /// Read the blob stored at `path` in a commit's tree.
    ///
    /// Returns `Ok(None)` when the tree has no such path.
    pub fn read_path(&self, commit: &Oid, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        match self.path_entry(commit, path)? {
            Some(blob) => Ok(Some(self.read_blob(&blob)?)),
            None => Ok(None),
        }
    }

    /// The blob OID stored at `path` in a commit's tree, if any.
    pub fn path_entry(&self, commit: &Oid, path: &str) -> Result<Option<Oid>, GitError> {
        let tree = self.find_commit(commit)?.tree()?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) => Ok(Some(Oid::new(entry.id().to_string())?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, path)),
        }
    }

    /// Names of the blobs at the top level of a commit's tree.
    pub fn list_paths(&self, commit: &Oid) -> Result<Vec<String>, GitError> {
        let tree = self.find_commit(commit)?.tree()?;
        Ok(tree
            .iter()
            .filter(|entry| entry.kind() == Some(git2::ObjectType::Blob))
            .filter_map(|entry| entry.name().map(str::to_string))
            .collect())
    }

    // =========================================================================
    // Commit Creation
    // =========================================================================

    /// Create a commit whose tree is `base`'s tree with `path` set to
    /// `content`. The commit is written to the object database only; no ref
    /// moves.
    ///
    /// `base` is usually the first of `parents`; `None` starts from an empty
    /// tree.
    pub fn commit_with_path(
        &self,
        base: Option<&Oid>,
        parents: &[Oid],
        path: &str,
        content: &[u8],
        author: &CommitAuthor,
        message: &str,
    ) -> Result<Oid, GitError> {
        if path.is_empty() || path.contains('/') {
            return Err(GitError::InvalidPath {
                path: path.to_string(),
            });
        }

        let base_tree = match base {
            Some(oid) => Some(self.find_commit(oid)?.tree()?),
            None => None,
        };
        let blob = self.repo.blob(content)?;
        let mut builder = self.repo.treebuilder(base_tree.as_ref())?;
        builder.insert(path, blob, BLOB_MODE)?;
        let tree = builder.write()?;

        self.commit_tree(&Oid::new(tree.to_string())?, parents, author, message)
    }

    /// Create a parentless commit with an empty tree.
    pub fn commit_empty_root(&self, author: &CommitAuthor, message: &str) -> Result<Oid, GitError> {
        let tree = self.repo.treebuilder(None)?.write()?;
        self.commit_tree(&Oid::new(tree.to_string())?, &[], author, message)
    }

    /// Create a commit for an existing tree. No ref moves.
    pub fn commit_tree(
        &self,
        tree: &Oid,
        parents: &[Oid],
        author: &CommitAuthor,
        message: &str,
    ) -> Result<Oid, GitError> {
        let tree = self
            .repo
            .find_tree(to_git2(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;
        let parents = parents
            .iter()
            .map(|p| self.find_commit(p))
            .collect::<Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        let signature = author.signature()?;

        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parent_refs)?;
        Ok(Oid::new(oid.to_string())?)
    }

    /// Merge two commits' trees in memory.
    ///
    /// On success the merged tree is written and returned; on conflict the
    /// conflicting paths are reported and nothing is written.
    pub fn merge_trees(&self, ours: &Oid, theirs: &Oid) -> Result<TreeMerge, GitError> {
        let ours = self.find_commit(ours)?;
        let theirs = self.find_commit(theirs)?;
        let mut index = self.repo.merge_commits(&ours, &theirs, None)?;

        if index.has_conflicts() {
            let mut paths = Vec::new();
            for conflict in index.conflicts()? {
                let conflict = conflict?;
                let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
                if let Some(entry) = entry {
                    paths.push(String::from_utf8_lossy(&entry.path).into_owned());
                }
            }
            paths.sort();
            paths.dedup();
            return Ok(TreeMerge::Conflicted(paths));
        }

        let tree = index.write_tree_to(&self.repo)?;
        Ok(TreeMerge::Clean(Oid::new(tree.to_string())?))
    }

    // =========================================================================
    // Commit Information
    // =========================================================================

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(oid)?;
        let author = commit.author();
        let committer = commit.committer();

        let mut parents = Vec::new();
        for parent in commit.parent_ids() {
            parents.push(Oid::new(parent.to_string())?);
        }

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time: to_utc(author.when()),
            committer_name: committer.name().unwrap_or("").to_string(),
            committer_email: committer.email().unwrap_or("").to_string(),
            committer_time: to_utc(committer.when()),
            parents,
        })
    }

    /// Diff a commit against its first parent, limited to `path`.
    pub fn diff_path(&self, oid: &Oid, path: &str) -> Result<PathDiff, GitError> {
        let commit = self.find_commit(oid)?;
        let new_tree = commit.tree()?;
        let old_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let introduces_path = match &old_tree {
            None => true,
            Some(tree) => match tree.get_path(Path::new(path)) {
                Ok(_) => false,
                Err(e) if e.code() == git2::ErrorCode::NotFound => true,
                Err(e) => return Err(GitError::from_git2(e, path)),
            },
        };

        let mut opts = git2::DiffOptions::new();
        opts.pathspec(path).disable_pathspec_match(true);
        let diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), Some(&mut opts))?;

        let mut patch = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            let content = String::from_utf8_lossy(line.content());
            match line.origin() {
                origin @ ('+' | '-' | ' ') => {
                    patch.push(origin);
                    patch.push_str(&content);
                }
                // End-of-file newline markers: end the unterminated line,
                // then one `\ No newline at end of file` line.
                '=' | '>' | '<' => {
                    if !patch.is_empty() && !patch.ends_with('\n') {
                        patch.push('\n');
                    }
                    patch.push_str(content.trim_start_matches(['\r', '\n']));
                    if !patch.ends_with('\n') {
                        patch.push('\n');
                    }
                }
                _ => patch.push_str(&content),
            }
            true
        })?;

        Ok(PathDiff {
            patch,
            introduces_path,
        })
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn to_utc(time: git2::Time) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(time.seconds(), 0).unwrap_or(chrono::DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn author() -> CommitAuthor {
        CommitAuthor::new("Tester", "tester@example.org")
    }

    fn repo() -> (TempDir, Git) {
        let dir = TempDir::new().expect("create temp dir");
        let git = Git::init_bare(dir.path()).expect("init");
        (dir, git)
    }

    mod git_error {
        use super::*;

        #[test]
        fn error_display_formatting() {
            let err = GitError::CasFailed {
                refname: "refs/heads/master".to_string(),
                expected: "abc".to_string(),
                actual: "def".to_string(),
            };
            assert!(err.to_string().contains("CAS failed"));
            assert!(err.to_string().contains("refs/heads/master"));

            let err = GitError::InvalidPath {
                path: "a/b".to_string(),
            };
            assert!(err.to_string().contains("a/b"));
        }

        #[test]
        fn invalid_spec_on_refs_is_ref_name_error() {
            let err = git2::Error::new(
                git2::ErrorCode::InvalidSpec,
                git2::ErrorClass::Reference,
                "not a valid reference name",
            );
            assert!(matches!(
                GitError::from_git2(err, "refs/heads/a."),
                GitError::InvalidRefName { .. }
            ));

            let err = git2::Error::new(
                git2::ErrorCode::InvalidSpec,
                git2::ErrorClass::Object,
                "bad spec",
            );
            assert!(matches!(
                GitError::from_git2(err, "abc"),
                GitError::InvalidOid { .. }
            ));
        }

        #[test]
        fn type_errors_convert() {
            let err: GitError = TypeError::InvalidBranchName("bad".into()).into();
            assert!(matches!(err, GitError::InvalidRefName { .. }));
        }
    }

    mod objects {
        use super::*;

        #[test]
        fn commit_and_read_path() {
            let (_dir, git) = repo();
            let root = git.commit_empty_root(&author(), "root").unwrap();
            let c1 = git
                .commit_with_path(Some(&root), &[root.clone()], "Home.md", b"hello\n", &author(), "Home")
                .unwrap();

            assert_eq!(git.read_path(&c1, "Home.md").unwrap(), Some(b"hello\n".to_vec()));
            assert_eq!(git.read_path(&root, "Home.md").unwrap(), None);
            assert_eq!(git.list_paths(&c1).unwrap(), vec!["Home.md".to_string()]);

            let info = git.commit_info(&c1).unwrap();
            assert_eq!(info.summary, "Home");
            assert_eq!(info.parents, vec![root]);
            assert_eq!(info.author_email, "tester@example.org");
        }

        #[test]
        fn nested_paths_rejected() {
            let (_dir, git) = repo();
            let err = git
                .commit_with_path(None, &[], "a/b.md", b"x", &author(), "x")
                .unwrap_err();
            assert!(matches!(err, GitError::InvalidPath { .. }));
        }

        #[test]
        fn diff_marks_introduction() {
            let (_dir, git) = repo();
            let root = git.commit_empty_root(&author(), "root").unwrap();
            let c1 = git
                .commit_with_path(Some(&root), &[root.clone()], "Home.md", b"one\n", &author(), "Home")
                .unwrap();
            let c2 = git
                .commit_with_path(Some(&c1), &[c1.clone()], "Home.md", b"two\n", &author(), "Home")
                .unwrap();

            let first = git.diff_path(&c1, "Home.md").unwrap();
            assert!(first.introduces_path);
            assert!(first.patch.contains("+one"));

            let second = git.diff_path(&c2, "Home.md").unwrap();
            assert!(!second.introduces_path);
            assert!(second.patch.contains("@@"));
            assert!(second.patch.contains("-one"));
            assert!(second.patch.contains("+two"));
        }

        #[test]
        fn missing_newline_marker_is_one_line() {
            let (_dir, git) = repo();
            let root = git.commit_empty_root(&author(), "root").unwrap();
            let c1 = git
                .commit_with_path(Some(&root), &[root.clone()], "Home.md", b"a\n", &author(), "Home")
                .unwrap();
            let c2 = git
                .commit_with_path(Some(&c1), &[c1.clone()], "Home.md", b"a\nb", &author(), "Home")
                .unwrap();

            let patch = git.diff_path(&c2, "Home.md").unwrap().patch;
            assert!(patch.ends_with("+b\n\\ No newline at end of file\n"), "{patch}");
            assert!(!patch.contains("\n\n"));
        }
    }

    mod refs {
        use super::*;

        #[test]
        fn cas_create_and_update() {
            let (_dir, git) = repo();
            let root = git.commit_empty_root(&author(), "root").unwrap();
            let next = git
                .commit_with_path(Some(&root), &[root.clone()], "A.md", b"a", &author(), "A")
                .unwrap();

            git.update_ref_cas("refs/heads/master", &root, None, "create").unwrap();
            assert!(matches!(
                git.update_ref_cas("refs/heads/master", &root, None, "again"),
                Err(GitError::CasFailed { .. })
            ));

            git.update_ref_cas("refs/heads/master", &next, Some(&root), "advance")
                .unwrap();
            assert!(matches!(
                git.update_ref_cas("refs/heads/master", &root, Some(&root), "stale"),
                Err(GitError::CasFailed { .. })
            ));
            assert_eq!(git.resolve_ref("refs/heads/master").unwrap(), next);
        }

        #[test]
        fn missing_ref_resolves_to_none() {
            let (_dir, git) = repo();
            assert_eq!(git.try_resolve_ref("refs/heads/nope").unwrap(), None);
        }

        #[test]
        fn ancestry() {
            let (_dir, git) = repo();
            let root = git.commit_empty_root(&author(), "root").unwrap();
            let child = git
                .commit_with_path(Some(&root), &[root.clone()], "A.md", b"a", &author(), "A")
                .unwrap();
            assert!(git.is_ancestor(&root, &child).unwrap());
            assert!(!git.is_ancestor(&child, &root).unwrap());
            assert!(git.is_ancestor(&child, &child).unwrap());
        }
    }
}
