//! core::index::store
//!
//! Persistent storage for commit index entries.
//!
//! Each (branch, page) pair has one JSON file under
//! `<git_dir>/wikifork/index/`. Writes go to a uniquely named temp file in
//! the same directory, are synced, and are then renamed over the entry, so a
//! reader sees either the old record or the new one and never a prefix.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::IndexError;
use crate::core::paths::WikiPaths;
use crate::core::types::{BranchName, Oid, PageName};

/// One persisted index entry.
///
/// `tip` is the branch head the entry was last known to be complete at, and
/// `checksum` covers the pair, the tip and every revision. An entry whose
/// checksum does not match was changed outside the index and is not trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub branch: BranchName,
    pub page: PageName,
    /// Revisions that touched the page, oldest first.
    pub revisions: Vec<Oid>,
    #[serde(default)]
    pub tip: Option<Oid>,
    #[serde(default)]
    pub checksum: String,
}

impl IndexRecord {
    /// A sealed entry complete as of the branch head `tip`.
    pub fn new(
        branch: &BranchName,
        page: &PageName,
        revisions: Vec<Oid>,
        tip: Option<Oid>,
    ) -> Self {
        let mut record = Self {
            branch: branch.clone(),
            page: page.clone(),
            revisions,
            tip,
            checksum: String::new(),
        };
        record.checksum = record.digest();
        record
    }

    /// A sealed entry with no revisions.
    pub fn empty(branch: &BranchName, page: &PageName) -> Self {
        Self::new(branch, page, Vec::new(), None)
    }

    /// The newest revision, if any.
    pub fn newest(&self) -> Option<&Oid> {
        self.revisions.last()
    }

    /// True when some revision appears twice.
    pub fn has_duplicates(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.revisions.len());
        !self.revisions.iter().all(|rev| seen.insert(rev))
    }

    /// True when the checksum matches and no revision repeats.
    pub fn is_intact(&self) -> bool {
        self.checksum == self.digest() && !self.has_duplicates()
    }

    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.branch.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.page.as_str().as_bytes());
        hasher.update([0u8]);
        if let Some(tip) = &self.tip {
            hasher.update(tip.as_str().as_bytes());
        }
        for revision in &self.revisions {
            hasher.update([b'\n']);
            hasher.update(revision.as_str().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// File-backed key-value store for index records.
#[derive(Debug, Clone)]
pub struct IndexStore {
    paths: WikiPaths,
}

impl IndexStore {
    pub fn new(paths: &WikiPaths) -> Self {
        Self {
            paths: paths.clone(),
        }
    }

    /// Load the record for `(branch, page)`.
    ///
    /// Returns `Ok(None)` when no entry exists yet.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Corrupt`] if the file does not parse or belongs to a
    ///   different pair
    /// - [`IndexError::Io`] if the file cannot be read
    pub fn load(
        &self,
        branch: &BranchName,
        page: &PageName,
    ) -> Result<Option<IndexRecord>, IndexError> {
        let path = self.paths.index_entry_path(branch, page);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        let record: IndexRecord =
            serde_json::from_str(&content).map_err(|e| IndexError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if &record.branch != branch || &record.page != page {
            return Err(IndexError::Corrupt {
                path,
                message: format!(
                    "entry belongs to '{}' on {}",
                    record.page, record.branch
                ),
            });
        }

        Ok(Some(record))
    }

    /// Atomically replace the record for its `(branch, page)`.
    pub fn save(&self, record: &IndexRecord) -> Result<(), IndexError> {
        let dir = self.paths.index_dir();
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;

        let target = self.paths.index_entry_path(&record.branch, &record.page);
        let temp = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        let json = serde_json::to_vec_pretty(record).map_err(|e| IndexError::Io {
            path: target.clone(),
            message: e.to_string(),
        })?;

        let result = write_synced(&temp, &json).and_then(|()| {
            fs::rename(&temp, &target).map_err(|e| io_error(&target, e))
        });
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    /// Delete the record for `(branch, page)` if present.
    pub fn remove(&self, branch: &BranchName, page: &PageName) -> Result<(), IndexError> {
        let path = self.paths.index_entry_path(branch, page);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Path of the file backing `(branch, page)`.
    pub fn entry_path(&self, branch: &BranchName, page: &PageName) -> PathBuf {
        self.paths.index_entry_path(branch, page)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let mut file = File::create(path).map_err(|e| io_error(path, e))?;
    file.write_all(bytes).map_err(|e| io_error(path, e))?;
    file.sync_all().map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, err: std::io::Error) -> IndexError {
    IndexError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, IndexStore) {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(&WikiPaths::new(dir.path().to_path_buf()));
        (dir, store)
    }

    fn branch() -> BranchName {
        BranchName::new("master").unwrap()
    }

    fn page() -> PageName {
        PageName::new("Home").unwrap()
    }

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn missing_entry_is_none() {
        let (_dir, store) = setup();
        assert_eq!(store.load(&branch(), &page()).unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let (_dir, store) = setup();
        let record = IndexRecord::new(&branch(), &page(), vec![oid('a'), oid('b')], Some(oid('b')));
        store.save(&record).unwrap();
        let loaded = store.load(&branch(), &page()).unwrap().unwrap();
        assert!(loaded.is_intact());
        assert_eq!(loaded, record);
    }

    #[test]
    fn edited_revisions_break_the_checksum() {
        let mut record =
            IndexRecord::new(&branch(), &page(), vec![oid('a'), oid('b'), oid('c')], Some(oid('c')));
        assert!(record.is_intact());
        record.revisions.remove(0);
        assert!(!record.is_intact());

        let mut moved = IndexRecord::new(&branch(), &page(), vec![oid('a')], Some(oid('a')));
        moved.tip = Some(oid('b'));
        assert!(!moved.is_intact());
    }

    #[test]
    fn entries_without_checksum_are_not_intact() {
        let (_dir, store) = setup();
        let path = store.entry_path(&branch(), &page());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let json = format!(
            r#"{{"branch":"master","page":"Home","revisions":["{}"]}}"#,
            oid('a')
        );
        fs::write(&path, json).unwrap();
        let loaded = store.load(&branch(), &page()).unwrap().unwrap();
        assert_eq!(loaded.tip, None);
        assert!(!loaded.is_intact());
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let (dir, store) = setup();
        store.save(&IndexRecord::empty(&branch(), &page())).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path().join("wikifork/index"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[test]
    fn garbage_is_corrupt() {
        let (_dir, store) = setup();
        let path = store.entry_path(&branch(), &page());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            store.load(&branch(), &page()),
            Err(IndexError::Corrupt { .. })
        ));
    }

    #[test]
    fn duplicates_detected() {
        let mut record = IndexRecord::new(&branch(), &page(), vec![oid('a'), oid('b')], None);
        assert!(!record.has_duplicates());
        record.revisions.push(oid('a'));
        assert!(record.has_duplicates());
        assert!(!IndexRecord::new(&branch(), &page(), record.revisions.clone(), None).is_intact());
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, store) = setup();
        store.save(&IndexRecord::empty(&branch(), &page())).unwrap();
        store.remove(&branch(), &page()).unwrap();
        store.remove(&branch(), &page()).unwrap();
        assert_eq!(store.load(&branch(), &page()).unwrap(), None);
    }
}
