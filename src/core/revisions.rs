//! core::revisions
//!
//! Page revisions stored as commits on branches.
//!
//! # Architecture
//!
//! A page lives at `<name>.<extension>` in the root tree of every branch
//! that has it. [`RevisionStore`] reads and writes those blobs through the
//! [`Git`] doorway; it never touches a working tree. Every write creates a
//! commit whose tree differs from its first parent only at the page path,
//! then advances the branch with compare-and-swap.
//!
//! # CAS Semantics
//!
//! The (page, branch) lock serializes writers of one page, but writers of
//! different pages on the same branch race on the branch ref. When the CAS
//! loses, the store rebuilds the commit on the new head and tries again, up
//! to [`MAX_APPLY_ATTEMPTS`] times, so neither edit is dropped.
//!
//! # Example
//!
//! ```ignore
//! let store = RevisionStore::new(&git, "md");
//! let rev = store.write(&branch, &page, b"# Home\n", &author, "Home")?;
//! assert_eq!(store.read(&branch, &page)?, b"# Home\n");
//! ```

use thiserror::Error;

use crate::core::types::{BranchName, Oid, PageName, RefName};
use crate::git::{CommitAuthor, CommitInfo, Git, GitError, PathDiff, TreeMerge};

/// How many times a write is rebuilt on a moved branch head.
pub const MAX_APPLY_ATTEMPTS: usize = 8;

/// Errors from revision storage.
#[derive(Debug, Error)]
pub enum RevisionError {
    /// The page has no blob at the given branch or revision.
    #[error("page '{page}' not found at {at}")]
    PageNotFound { page: PageName, at: String },

    /// The branch does not exist.
    #[error("branch not found: {0}")]
    BranchNotFound(BranchName),

    /// The branch already exists.
    #[error("branch already exists: {0}")]
    BranchExists(BranchName),

    /// A merge produced conflicts; nothing was written.
    #[error("merge of {source_branch} into {target} conflicts at: {}", paths.join(", "))]
    MergeConflict {
        page: PageName,
        source_branch: BranchName,
        target: BranchName,
        paths: Vec<String>,
    },

    /// The branch kept moving for every attempt.
    #[error("branch {branch} moved during {attempts} consecutive update attempts")]
    Contended { branch: BranchName, attempts: usize },

    /// Git operation failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),
}

/// Result of merging one branch into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The source head was already reachable from the target.
    AlreadyMerged { head: Oid },
    /// The target ref moved forward to the source head.
    FastForward { head: Oid },
    /// A two-parent merge commit was created on the target.
    Merged { head: Oid },
}

impl MergeOutcome {
    /// The target head after the merge.
    pub fn head(&self) -> &Oid {
        match self {
            MergeOutcome::AlreadyMerged { head }
            | MergeOutcome::FastForward { head }
            | MergeOutcome::Merged { head } => head,
        }
    }
}

/// Revision storage backed by a git repository.
pub struct RevisionStore<'a> {
    git: &'a Git,
    extension: &'a str,
}

impl<'a> RevisionStore<'a> {
    /// Create a store that keeps pages as `<name>.<extension>`.
    pub fn new(git: &'a Git, extension: &'a str) -> Self {
        Self { git, extension }
    }

    /// Storage path of a page.
    pub fn path_of(&self, page: &PageName) -> String {
        page.storage_path(self.extension)
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Current head of a branch, or `None` if it doesn't exist.
    pub fn head(&self, branch: &BranchName) -> Result<Option<Oid>, RevisionError> {
        Ok(self
            .git
            .try_resolve_ref(RefName::for_branch(branch).as_str())?)
    }

    fn require_head(&self, branch: &BranchName) -> Result<Oid, RevisionError> {
        self.head(branch)?
            .ok_or_else(|| RevisionError::BranchNotFound(branch.clone()))
    }

    /// Create `branch` pointing at `from`.
    pub fn create_branch(&self, branch: &BranchName, from: &Oid) -> Result<(), RevisionError> {
        let refname = RefName::for_branch(branch);
        match self
            .git
            .update_ref_cas(refname.as_str(), from, None, "wikifork: create branch")
        {
            Ok(()) => {
                tracing::info!(branch = %branch, from = %from.short(8), "created branch");
                Ok(())
            }
            Err(GitError::CasFailed { .. }) => Err(RevisionError::BranchExists(branch.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Create `branch` at the current head of `from`.
    pub fn create_branch_from(
        &self,
        branch: &BranchName,
        from: &BranchName,
    ) -> Result<Oid, RevisionError> {
        let head = self.require_head(from)?;
        self.create_branch(branch, &head)?;
        Ok(head)
    }

    /// Create `branch` with an empty root commit if it does not exist yet.
    ///
    /// Returns the branch head either way.
    pub fn ensure_root(
        &self,
        branch: &BranchName,
        author: &CommitAuthor,
    ) -> Result<Oid, RevisionError> {
        if let Some(head) = self.head(branch)? {
            return Ok(head);
        }
        let root = self.git.commit_empty_root(author, "Initialize wiki")?;
        match self.create_branch(branch, &root) {
            Ok(()) => Ok(root),
            // Someone else initialized it first.
            Err(RevisionError::BranchExists(_)) => self.require_head(branch),
            Err(e) => Err(e),
        }
    }

    /// Move `branch` from `expected` to `to`.
    pub fn fast_forward(
        &self,
        branch: &BranchName,
        expected: &Oid,
        to: &Oid,
    ) -> Result<(), RevisionError> {
        let refname = RefName::for_branch(branch);
        self.git
            .update_ref_cas(refname.as_str(), to, Some(expected), "wikifork: fast-forward")?;
        Ok(())
    }

    /// Local branches whose names start with `prefix`, with their heads.
    pub fn list_branches(&self, prefix: &str) -> Result<Vec<(BranchName, Oid)>, RevisionError> {
        Ok(self.git.list_branches_with_prefix(prefix)?)
    }

    /// True when `fork`'s head is reachable from `canonical`'s head.
    pub fn is_merged(
        &self,
        fork: &BranchName,
        canonical: &BranchName,
    ) -> Result<bool, RevisionError> {
        let fork_head = self.require_head(fork)?;
        let canonical_head = self.require_head(canonical)?;
        Ok(self.git.is_ancestor(&fork_head, &canonical_head)?)
    }

    /// True when `ancestor` is reachable from `descendant`.
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, RevisionError> {
        Ok(self.git.is_ancestor(ancestor, descendant)?)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// The page blob at the head of `branch`.
    ///
    /// # Errors
    ///
    /// - [`RevisionError::BranchNotFound`] if the branch doesn't exist
    /// - [`RevisionError::PageNotFound`] if the branch has no such page
    pub fn read(&self, branch: &BranchName, page: &PageName) -> Result<Vec<u8>, RevisionError> {
        let head = self.require_head(branch)?;
        self.git
            .read_path(&head, &self.path_of(page))?
            .ok_or_else(|| RevisionError::PageNotFound {
                page: page.clone(),
                at: branch.to_string(),
            })
    }

    /// The page blob as of a specific revision.
    pub fn read_at(&self, revision: &Oid, page: &PageName) -> Result<Vec<u8>, RevisionError> {
        self.git
            .read_path(revision, &self.path_of(page))?
            .ok_or_else(|| RevisionError::PageNotFound {
                page: page.clone(),
                at: revision.short(8).to_string(),
            })
    }

    /// Pages present at the head of `branch`, sorted by name.
    pub fn list_pages(&self, branch: &BranchName) -> Result<Vec<PageName>, RevisionError> {
        let head = self.require_head(branch)?;
        let mut pages: Vec<PageName> = self
            .git
            .list_paths(&head)?
            .iter()
            .filter_map(|path| PageName::from_storage_path(path, self.extension))
            .collect();
        pages.sort();
        Ok(pages)
    }

    /// Revisions of `page` on `branch`, newest first.
    ///
    /// Follows first parents only. A revision is a commit that changed the
    /// page's blob or whose message ends with the page name, so writes of
    /// unchanged content are revisions too. A missing branch yields an empty
    /// list.
    pub fn log(
        &self,
        branch: &BranchName,
        page: &PageName,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<Oid>, RevisionError> {
        let Some(head) = self.head(branch)? else {
            return Ok(Vec::new());
        };
        self.log_from(&head, page, limit, skip)
    }

    /// Like [`log`](Self::log), walking back from the commit `start`.
    pub fn log_from(
        &self,
        start: &Oid,
        page: &PageName,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<Oid>, RevisionError> {
        let walk = self
            .git
            .path_log(start, &self.path_of(page), limit, skip)?
            .marked_by(page.as_str());
        Ok(walk.collect::<Result<Vec<_>, _>>()?)
    }

    /// The newest revision on `branch` that touched `page`.
    pub fn path_head(
        &self,
        branch: &BranchName,
        page: &PageName,
    ) -> Result<Option<Oid>, RevisionError> {
        Ok(self.log(branch, page, Some(1), 0)?.into_iter().next())
    }

    /// The newest revision of `page` reachable from the commit `start`.
    pub fn path_head_from(
        &self,
        start: &Oid,
        page: &PageName,
    ) -> Result<Option<Oid>, RevisionError> {
        Ok(self.log_from(start, page, Some(1), 0)?.into_iter().next())
    }

    /// Diff of one revision against its first parent, limited to `page`.
    pub fn diff(&self, revision: &Oid, page: &PageName) -> Result<PathDiff, RevisionError> {
        Ok(self.git.diff_path(revision, &self.path_of(page))?)
    }

    /// Raw commit information for a revision.
    pub fn commit_info(&self, revision: &Oid) -> Result<CommitInfo, RevisionError> {
        Ok(self.git.commit_info(revision)?)
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Commit `content` as the new version of `page` on `branch`.
    ///
    /// Writing unchanged content still creates a commit.
    pub fn write(
        &self,
        branch: &BranchName,
        page: &PageName,
        content: &[u8],
        author: &CommitAuthor,
        message: &str,
    ) -> Result<Oid, RevisionError> {
        self.write_with_extra_parent(branch, page, content, author, message, None)
    }

    /// Like [`write`](Self::write), with `extra_parent` recorded as a second
    /// parent. Used when an editor's write approves a fork.
    pub fn write_with_extra_parent(
        &self,
        branch: &BranchName,
        page: &PageName,
        content: &[u8],
        author: &CommitAuthor,
        message: &str,
        extra_parent: Option<&Oid>,
    ) -> Result<Oid, RevisionError> {
        let path = self.path_of(page);
        let refname = RefName::for_branch(branch);

        for attempt in 1..=MAX_APPLY_ATTEMPTS {
            let head = self.require_head(branch)?;
            let mut parents = vec![head.clone()];
            if let Some(extra) = extra_parent {
                parents.push(extra.clone());
            }

            let commit =
                self.git
                    .commit_with_path(Some(&head), &parents, &path, content, author, message)?;

            match self.git.update_ref_cas(
                refname.as_str(),
                &commit,
                Some(&head),
                &format!("wikifork: {}", page),
            ) {
                Ok(()) => {
                    tracing::info!(page = %page, branch = %branch, rev = %commit.short(8), "committed page");
                    return Ok(commit);
                }
                Err(GitError::CasFailed { .. }) => {
                    tracing::debug!(page = %page, branch = %branch, attempt, "branch moved, re-applying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RevisionError::Contended {
            branch: branch.clone(),
            attempts: MAX_APPLY_ATTEMPTS,
        })
    }

    /// Merge `source` into `target`.
    ///
    /// The merge commit's message ends with the page name. On conflict
    /// neither branch moves.
    pub fn merge(
        &self,
        source: &BranchName,
        target: &BranchName,
        page: &PageName,
        author: &CommitAuthor,
        message: &str,
    ) -> Result<MergeOutcome, RevisionError> {
        let target_ref = RefName::for_branch(target);

        for attempt in 1..=MAX_APPLY_ATTEMPTS {
            let source_head = self.require_head(source)?;
            let target_head = self.require_head(target)?;

            if self.git.is_ancestor(&source_head, &target_head)? {
                return Ok(MergeOutcome::AlreadyMerged { head: target_head });
            }

            let (head, outcome) = if self.git.is_ancestor(&target_head, &source_head)? {
                (source_head.clone(), MergeOutcome::FastForward { head: source_head })
            } else {
                let tree = match self.git.merge_trees(&target_head, &source_head)? {
                    TreeMerge::Clean(tree) => tree,
                    TreeMerge::Conflicted(paths) => {
                        tracing::info!(page = %page, source = %source, target = %target, ?paths, "merge conflict");
                        return Err(RevisionError::MergeConflict {
                            page: page.clone(),
                            source_branch: source.clone(),
                            target: target.clone(),
                            paths,
                        });
                    }
                };
                let commit = self.git.commit_tree(
                    &tree,
                    &[target_head.clone(), source_head],
                    author,
                    message,
                )?;
                (commit.clone(), MergeOutcome::Merged { head: commit })
            };

            match self.git.update_ref_cas(
                target_ref.as_str(),
                &head,
                Some(&target_head),
                &format!("wikifork: merge {}", source),
            ) {
                Ok(()) => {
                    tracing::info!(page = %page, source = %source, target = %target, head = %head.short(8), "merged branch");
                    return Ok(outcome);
                }
                Err(GitError::CasFailed { .. }) => {
                    tracing::debug!(page = %page, target = %target, attempt, "target moved, re-merging");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RevisionError::Contended {
            branch: target.clone(),
            attempts: MAX_APPLY_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        git: Git,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("temp dir");
        let git = Git::init_bare(dir.path()).expect("init");
        Fixture { _dir: dir, git }
    }

    fn author() -> CommitAuthor {
        CommitAuthor::new("Tester", "tester@example.org")
    }

    fn master() -> BranchName {
        BranchName::new("master").unwrap()
    }

    fn page(name: &str) -> PageName {
        PageName::new(name).unwrap()
    }

    mod read_write {
        use super::*;

        #[test]
        fn write_then_read() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            store.ensure_root(&master(), &author()).unwrap();

            let rev = store
                .write(&master(), &page("Home"), b"hello", &author(), "Home")
                .unwrap();
            assert_eq!(store.read(&master(), &page("Home")).unwrap(), b"hello");
            assert_eq!(store.read_at(&rev, &page("Home")).unwrap(), b"hello");
            assert_eq!(store.list_pages(&master()).unwrap(), vec![page("Home")]);
        }

        #[test]
        fn missing_page_and_branch() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            assert!(matches!(
                store.read(&master(), &page("Home")),
                Err(RevisionError::BranchNotFound(_))
            ));
            store.ensure_root(&master(), &author()).unwrap();
            assert!(matches!(
                store.read(&master(), &page("Home")),
                Err(RevisionError::PageNotFound { .. })
            ));
        }

        #[test]
        fn unchanged_content_still_commits() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            store.ensure_root(&master(), &author()).unwrap();
            let a = store.write(&master(), &page("Home"), b"x", &author(), "Home").unwrap();
            let b = store.write(&master(), &page("Home"), b"x", &author(), "Home").unwrap();
            assert_ne!(a, b);
            assert_eq!(store.log(&master(), &page("Home"), None, 0).unwrap(), vec![b.clone(), a]);
            assert_eq!(store.path_head_from(&b, &page("Home")).unwrap(), Some(b));
        }

        #[test]
        fn writes_to_other_pages_keep_each_other() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            store.ensure_root(&master(), &author()).unwrap();
            store.write(&master(), &page("A"), b"a", &author(), "A").unwrap();
            store.write(&master(), &page("B"), b"b", &author(), "B").unwrap();
            assert_eq!(store.read(&master(), &page("A")).unwrap(), b"a");
            assert_eq!(store.read(&master(), &page("B")).unwrap(), b"b");
        }

        #[test]
        fn log_and_path_head() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            store.ensure_root(&master(), &author()).unwrap();
            let a1 = store.write(&master(), &page("A"), b"1", &author(), "A").unwrap();
            store.write(&master(), &page("B"), b"1", &author(), "B").unwrap();
            let a2 = store.write(&master(), &page("A"), b"2", &author(), "A").unwrap();

            assert_eq!(store.log(&master(), &page("A"), None, 0).unwrap(), vec![a2.clone(), a1]);
            assert_eq!(store.path_head(&master(), &page("A")).unwrap(), Some(a2));
            assert_eq!(store.path_head(&master(), &page("C")).unwrap(), None);
        }
    }

    mod branches {
        use super::*;

        #[test]
        fn create_twice_fails() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            let root = store.ensure_root(&master(), &author()).unwrap();
            let fork = BranchName::new("fork/a-00000000/Home").unwrap();
            store.create_branch(&fork, &root).unwrap();
            assert!(matches!(
                store.create_branch(&fork, &root),
                Err(RevisionError::BranchExists(_))
            ));
        }

        #[test]
        fn merge_fast_forward_then_already_merged() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            store.ensure_root(&master(), &author()).unwrap();
            let fork = BranchName::new("fork/a-00000000/Home").unwrap();
            store.create_branch_from(&fork, &master()).unwrap();
            store.write(&fork, &page("Home"), b"forked", &author(), "Home").unwrap();
            assert!(!store.is_merged(&fork, &master()).unwrap());

            let outcome = store
                .merge(&fork, &master(), &page("Home"), &author(), "Approve\n\nHome")
                .unwrap();
            assert!(matches!(outcome, MergeOutcome::FastForward { .. }));
            assert!(store.is_merged(&fork, &master()).unwrap());

            let again = store
                .merge(&fork, &master(), &page("Home"), &author(), "Approve\n\nHome")
                .unwrap();
            assert!(matches!(again, MergeOutcome::AlreadyMerged { .. }));
        }

        #[test]
        fn merge_conflict_moves_nothing() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            store.ensure_root(&master(), &author()).unwrap();
            store.write(&master(), &page("Home"), b"base\n", &author(), "Home").unwrap();
            let fork = BranchName::new("fork/a-00000000/Home").unwrap();
            store.create_branch_from(&fork, &master()).unwrap();
            store.write(&fork, &page("Home"), b"fork\n", &author(), "Home").unwrap();
            store.write(&master(), &page("Home"), b"canon\n", &author(), "Home").unwrap();

            let before_master = store.head(&master()).unwrap();
            let before_fork = store.head(&fork).unwrap();
            let err = store
                .merge(&fork, &master(), &page("Home"), &author(), "Approve\n\nHome")
                .unwrap_err();
            assert!(matches!(err, RevisionError::MergeConflict { .. }));
            assert_eq!(store.head(&master()).unwrap(), before_master);
            assert_eq!(store.head(&fork).unwrap(), before_fork);
        }

        #[test]
        fn merge_commit_when_diverged() {
            let f = fixture();
            let store = RevisionStore::new(&f.git, "md");
            store.ensure_root(&master(), &author()).unwrap();
            let fork = BranchName::new("fork/a-00000000/Home").unwrap();
            store.create_branch_from(&fork, &master()).unwrap();
            store.write(&fork, &page("Home"), b"fork", &author(), "Home").unwrap();
            store.write(&master(), &page("About"), b"about", &author(), "About").unwrap();

            let outcome = store
                .merge(&fork, &master(), &page("Home"), &author(), "Approve\n\nHome")
                .unwrap();
            let MergeOutcome::Merged { head } = outcome else {
                panic!("expected merge commit");
            };
            assert_eq!(store.commit_info(&head).unwrap().parents.len(), 2);
            assert_eq!(store.read(&master(), &page("Home")).unwrap(), b"fork");
            assert_eq!(store.read(&master(), &page("About")).unwrap(), b"about");
        }
    }
}
