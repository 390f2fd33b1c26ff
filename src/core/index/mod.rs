//! core::index
//!
//! Commit index: a per-(branch, page) cache of the revisions that touched a
//! page, oldest first.
//!
//! # Architecture
//!
//! The index exists so that history pages can address a revision by offset
//! without walking the branch log on every request. It is a cache: the
//! commit graph is authoritative and any entry can be rebuilt from
//! [`RevisionStore::log`].
//!
//! # Invariants
//!
//! - Offsets are oldest-first: offset 0 is the revision that introduced the
//!   page on this branch
//! - An entry holds exactly the first-parent revisions of the page (every
//!   write, unchanged content included), with no gaps and no duplicates
//! - Appends happen under the (page, branch) lock of the write they record;
//!   callers prove it by passing the [`PageLock`]
//! - Entries are sealed with a checksum over their tip and revisions; an
//!   entry that is unreadable, fails its checksum or holds duplicates is
//!   rebuilt before it is served
//! - Reads reconcile first: an entry whose tip is not the branch head is
//!   checked against the page log from that head, and rebuilt when its
//!   newest revision differs
//!
//! # Example
//!
//! ```ignore
//! let index = CommitIndex::new(revisions, &store, &locks, canonical.clone());
//! let newest = index.lookup(&page, index.length(&page)? as i64 - 1)?;
//! ```

pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use store::{IndexRecord, IndexStore};

use crate::core::ops::lock::{LockError, PageLock, PageLocks};
use crate::core::revisions::{RevisionError, RevisionStore};
use crate::core::types::{BranchName, Oid, PageName};

/// Errors from commit index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Offset outside `0..length`.
    #[error("revision offset {offset} out of range for page '{page}' ({length} revisions)")]
    OutOfRange {
        page: PageName,
        offset: i64,
        length: usize,
    },

    /// An entry file exists but cannot be used.
    #[error("corrupt index entry {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// Filesystem failure.
    #[error("index I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// Lock failure (including timeouts and scope mismatches).
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Failure reading the commit graph.
    #[error(transparent)]
    Revision(#[from] RevisionError),
}

/// The commit index for one branch.
pub struct CommitIndex<'a> {
    revisions: RevisionStore<'a>,
    store: &'a IndexStore,
    locks: &'a PageLocks,
    branch: BranchName,
}

impl<'a> CommitIndex<'a> {
    pub fn new(
        revisions: RevisionStore<'a>,
        store: &'a IndexStore,
        locks: &'a PageLocks,
        branch: BranchName,
    ) -> Self {
        Self {
            revisions,
            store,
            locks,
            branch,
        }
    }

    /// The branch this index covers.
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Record `revision` as the newest revision of `page`.
    ///
    /// `lock` must be the (page, branch) lock held for the write that
    /// created `revision`. Every write is a revision, so the entry grows by
    /// exactly one. When the cached entry does not end at the page's
    /// previous revision, the entry is rebuilt instead.
    pub fn append(
        &self,
        lock: &PageLock,
        page: &PageName,
        revision: &Oid,
    ) -> Result<(), IndexError> {
        lock.ensure_covers(page, &self.branch)?;

        let recent = self.revisions.log_from(revision, page, Some(2), 0)?;
        if recent.first() != Some(revision) {
            tracing::warn!(page = %page, branch = %self.branch, rev = %revision.short(8), "appended commit is not a page revision, rebuilding");
            self.rebuild(page)?;
            return Ok(());
        }
        let previous = recent.get(1);

        let revisions = match self.load_tolerant(page)? {
            Some(record)
                if record.is_intact()
                    && record.newest() == previous
                    && !record.revisions.contains(revision) =>
            {
                let mut revisions = record.revisions;
                revisions.push(revision.clone());
                revisions
            }
            None if previous.is_none() => vec![revision.clone()],
            _ => {
                tracing::warn!(page = %page, branch = %self.branch, "index entry out of step, rebuilding");
                self.rebuild(page)?;
                return Ok(());
            }
        };

        // Complete as of the new revision itself; later commits to other
        // pages move the branch past it without touching this entry.
        let record = IndexRecord::new(&self.branch, page, revisions, Some(revision.clone()));
        self.store.save(&record)?;
        tracing::debug!(page = %page, branch = %self.branch, length = record.revisions.len(), "appended to index");
        Ok(())
    }

    /// The revision at `offset` (0 = oldest).
    ///
    /// # Errors
    ///
    /// - [`IndexError::OutOfRange`] if `offset` is negative or not below the
    ///   length
    pub fn lookup(&self, page: &PageName, offset: i64) -> Result<Oid, IndexError> {
        let record = self.reconcile_if_stale(page)?;
        usize::try_from(offset)
            .ok()
            .and_then(|i| record.revisions.get(i))
            .cloned()
            .ok_or_else(|| IndexError::OutOfRange {
                page: page.clone(),
                offset,
                length: record.revisions.len(),
            })
    }

    /// Number of revisions of `page` on this branch.
    pub fn length(&self, page: &PageName) -> Result<usize, IndexError> {
        Ok(self.reconcile_if_stale(page)?.revisions.len())
    }

    /// All revisions of `page`, oldest first.
    pub fn entries(&self, page: &PageName) -> Result<Vec<Oid>, IndexError> {
        Ok(self.reconcile_if_stale(page)?.revisions)
    }

    /// Return a fresh entry for `page`, rebuilding it under the page lock if
    /// the cached one is stale.
    ///
    /// Callers that already hold the lock use
    /// [`reconcile_locked`](Self::reconcile_locked) instead.
    pub fn reconcile_if_stale(&self, page: &PageName) -> Result<IndexRecord, IndexError> {
        if let Some(record) = self.fresh_record(page)? {
            return Ok(record);
        }

        let _lock = self.locks.acquire(page, &self.branch)?;
        // Another reader may have rebuilt it while we waited.
        if let Some(record) = self.fresh_record(page)? {
            return Ok(record);
        }
        tracing::warn!(page = %page, branch = %self.branch, "stale index entry, rebuilding");
        self.rebuild(page)
    }

    /// Like [`reconcile_if_stale`](Self::reconcile_if_stale) for a caller
    /// already holding the (page, branch) lock.
    pub fn reconcile_locked(
        &self,
        lock: &PageLock,
        page: &PageName,
    ) -> Result<IndexRecord, IndexError> {
        lock.ensure_covers(page, &self.branch)?;
        if let Some(record) = self.fresh_record(page)? {
            return Ok(record);
        }
        tracing::warn!(page = %page, branch = %self.branch, "stale index entry, rebuilding");
        self.rebuild(page)
    }

    /// The cached record if it matches the branch, `None` if it needs a
    /// rebuild.
    ///
    /// A record whose tip is the current branch head is served as is. When
    /// the branch has moved, the page log is walked once from the new head;
    /// if the page gained no revision the record is re-sealed at that head.
    fn fresh_record(&self, page: &PageName) -> Result<Option<IndexRecord>, IndexError> {
        let cached = self.load_tolerant(page)?;
        let head = self.revisions.head(&self.branch)?;

        let record = match cached {
            Some(record) if record.is_intact() => record,
            Some(_) => {
                tracing::warn!(page = %page, branch = %self.branch, "index entry fails its checksum");
                return Ok(None);
            }
            None => {
                let path_head = self.path_head_at(head.as_ref(), page)?;
                return Ok(path_head
                    .is_none()
                    .then(|| IndexRecord::empty(&self.branch, page)));
            }
        };

        if record.tip == head {
            return Ok(Some(record));
        }
        if record.newest() != self.path_head_at(head.as_ref(), page)?.as_ref() {
            return Ok(None);
        }

        let refreshed = IndexRecord::new(&self.branch, page, record.revisions, head);
        self.store.save(&refreshed)?;
        tracing::debug!(page = %page, branch = %self.branch, "index entry current at new branch head");
        Ok(Some(refreshed))
    }

    fn path_head_at(&self, head: Option<&Oid>, page: &PageName) -> Result<Option<Oid>, IndexError> {
        match head {
            Some(head) => Ok(self.revisions.path_head_from(head, page)?),
            None => Ok(None),
        }
    }

    /// Load an entry, treating a corrupt one as missing.
    fn load_tolerant(&self, page: &PageName) -> Result<Option<IndexRecord>, IndexError> {
        match self.store.load(&self.branch, page) {
            Ok(record) => Ok(record),
            Err(IndexError::Corrupt { path, message }) => {
                tracing::warn!(page = %page, branch = %self.branch, path = %path.display(), %message, "ignoring corrupt index entry");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Rebuild the entry for `page` from the branch log.
    fn rebuild(&self, page: &PageName) -> Result<IndexRecord, IndexError> {
        let head = self.revisions.head(&self.branch)?;
        let mut revisions = match &head {
            Some(head) => self.revisions.log_from(head, page, None, 0)?,
            None => Vec::new(),
        };
        revisions.reverse();
        let record = IndexRecord::new(&self.branch, page, revisions, head);
        self.store.save(&record)?;
        tracing::debug!(page = %page, branch = %self.branch, length = record.revisions.len(), "rebuilt index entry");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::WikiPaths;
    use crate::git::{CommitAuthor, Git};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        git: Git,
        store: IndexStore,
        locks: PageLocks,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let git = Git::init_bare(dir.path()).unwrap();
            let paths = WikiPaths::new(git.git_dir().to_path_buf());
            let store = IndexStore::new(&paths);
            let locks = PageLocks::new(&paths, Duration::from_millis(200));
            RevisionStore::new(&git, "md")
                .ensure_root(&master(), &author())
                .unwrap();
            Self {
                _dir: dir,
                git,
                store,
                locks,
            }
        }

        fn revisions(&self) -> RevisionStore<'_> {
            RevisionStore::new(&self.git, "md")
        }

        fn index(&self) -> CommitIndex<'_> {
            CommitIndex::new(self.revisions(), &self.store, &self.locks, master())
        }

        /// A locked write followed by an append, as the fork manager does it.
        fn write(&self, page: &PageName, body: &str) -> Oid {
            let lock = self.locks.acquire(page, &master()).unwrap();
            let rev = self
                .revisions()
                .write(&master(), page, body.as_bytes(), &author(), page.as_str())
                .unwrap();
            self.index().append(&lock, page, &rev).unwrap();
            rev
        }
    }

    fn author() -> CommitAuthor {
        CommitAuthor::new("Tester", "tester@example.org")
    }

    fn master() -> BranchName {
        BranchName::new("master").unwrap()
    }

    fn home() -> PageName {
        PageName::new("Home").unwrap()
    }

    #[test]
    fn appends_in_order() {
        let f = Fixture::new();
        let r1 = f.write(&home(), "one");
        let r2 = f.write(&home(), "two");
        let index = f.index();
        assert_eq!(index.length(&home()).unwrap(), 2);
        assert_eq!(index.lookup(&home(), 0).unwrap(), r1);
        assert_eq!(index.lookup(&home(), 1).unwrap(), r2);
    }

    #[test]
    fn out_of_range() {
        let f = Fixture::new();
        f.write(&home(), "one");
        let index = f.index();
        assert!(matches!(
            index.lookup(&home(), 1),
            Err(IndexError::OutOfRange { length: 1, .. })
        ));
        assert!(matches!(
            index.lookup(&home(), -1),
            Err(IndexError::OutOfRange { .. })
        ));
    }

    #[test]
    fn unknown_page_is_empty() {
        let f = Fixture::new();
        assert_eq!(f.index().length(&home()).unwrap(), 0);
        assert!(f.index().entries(&home()).unwrap().is_empty());
    }

    #[test]
    fn rebuilds_after_unindexed_write() {
        let f = Fixture::new();
        let r1 = f.write(&home(), "one");
        let r2 = f
            .revisions()
            .write(&master(), &home(), b"two", &author(), "Home")
            .unwrap();
        assert_eq!(f.index().entries(&home()).unwrap(), vec![r1, r2]);
    }

    #[test]
    fn rebuilds_after_deletion_and_corruption() {
        let f = Fixture::new();
        let r1 = f.write(&home(), "one");
        let r2 = f.write(&home(), "two");

        f.store.remove(&master(), &home()).unwrap();
        assert_eq!(f.index().entries(&home()).unwrap(), vec![r1.clone(), r2.clone()]);

        fs::write(f.store.entry_path(&master(), &home()), "garbage").unwrap();
        assert_eq!(f.index().entries(&home()).unwrap(), vec![r1, r2]);
    }

    #[test]
    fn duplicates_trigger_rebuild() {
        let f = Fixture::new();
        let r1 = f.write(&home(), "one");
        let r2 = f.write(&home(), "two");
        let mut record = f.store.load(&master(), &home()).unwrap().unwrap();
        record.revisions = vec![r2.clone(), r1.clone(), r2.clone()];
        f.store.save(&record).unwrap();
        assert_eq!(f.index().entries(&home()).unwrap(), vec![r1, r2]);
    }

    #[test]
    fn front_truncation_is_rebuilt() {
        let f = Fixture::new();
        let r1 = f.write(&home(), "one");
        let r2 = f.write(&home(), "two");
        let r3 = f.write(&home(), "three");
        let mut record = f.store.load(&master(), &home()).unwrap().unwrap();
        record.revisions = vec![r3.clone()];
        f.store.save(&record).unwrap();

        let index = f.index();
        assert_eq!(index.length(&home()).unwrap(), 3);
        assert_eq!(index.lookup(&home(), 0).unwrap(), r1);
        assert_eq!(index.entries(&home()).unwrap(), vec![r1, r2, r3]);
    }

    #[test]
    fn every_write_is_indexed() {
        let f = Fixture::new();
        let writes: Vec<Oid> = (0..3).map(|_| f.write(&home(), "same")).collect();
        assert_eq!(f.index().length(&home()).unwrap(), 3);
        assert_eq!(f.index().entries(&home()).unwrap(), writes);
    }

    #[test]
    fn tip_follows_branch_without_rebuild() {
        let f = Fixture::new();
        let about = PageName::new("About").unwrap();
        let r1 = f.write(&home(), "one");
        f.write(&about, "about");

        let head = f.revisions().head(&master()).unwrap();
        assert_ne!(f.store.load(&master(), &home()).unwrap().unwrap().tip, head);
        assert_eq!(f.index().entries(&home()).unwrap(), vec![r1.clone()]);

        let record = f.store.load(&master(), &home()).unwrap().unwrap();
        assert_eq!(record.tip, head);
        assert!(record.is_intact());
        assert_eq!(record.revisions, vec![r1]);
    }

    #[test]
    fn append_requires_matching_lock() {
        let f = Fixture::new();
        let about = PageName::new("About").unwrap();
        let lock = f.locks.acquire(&about, &master()).unwrap();
        let rev = f
            .revisions()
            .write(&master(), &home(), b"x", &author(), "Home")
            .unwrap();
        assert!(matches!(
            f.index().append(&lock, &home(), &rev),
            Err(IndexError::Lock(LockError::WrongScope { .. }))
        ));
    }

    #[test]
    fn other_pages_do_not_enter_entry() {
        let f = Fixture::new();
        let about = PageName::new("About").unwrap();
        let r1 = f.write(&home(), "one");
        f.write(&about, "about");
        let r2 = f.write(&home(), "two");
        assert_eq!(f.index().entries(&home()).unwrap(), vec![r1, r2]);
        assert_eq!(f.index().length(&about).unwrap(), 1);
    }
}
