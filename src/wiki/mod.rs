//! wiki
//!
//! The wiki service: the entry points a web front end (or the CLI) calls.
//!
//! # Architecture
//!
//! A [`Wiki`] is the context every operation receives by reference: resolved
//! configuration, storage paths, the git handle, the lock factory, the index
//! store and the notification sink. It is built once per thread or process;
//! git handles are not shared across threads, so concurrent writers each
//! open their own `Wiki` on the same repository and coordinate through
//! page locks and ref compare-and-swap.
//!
//! # Modules
//!
//! - [`fork`] - Which branch a requester reads and writes; fork promotion
//! - [`history`] - Offset-addressed page history
//! - [`diff`] - Unified diff to tagged display lines
//! - [`summary`] - Commit summaries
//! - [`collab`] - Identity and notification collaborators
//! - [`error`] - The [`WikiError`] taxonomy
//!
//! # Example
//!
//! ```ignore
//! use wikifork::wiki::{ForkManager, Requester, Wiki};
//!
//! let wiki = Wiki::open(Path::new("/srv/wiki.git"))?;
//! let forks = ForkManager::new(&wiki);
//! let page = forks.read(&PageName::new("Home")?, &Requester::anonymous())?;
//! ```

pub mod collab;
pub mod diff;
pub mod error;
pub mod fork;
pub mod history;
pub mod summary;

use std::path::Path;
use std::sync::Arc;

pub use collab::{
    IdentityProvider, Notification, NotificationSink, RecordingNotifier, Requester,
    StaticIdentity, TracingNotifier,
};
pub use diff::{DiffLine, DiffRenderer, LineKind};
pub use error::WikiError;
pub use fork::{ForkManager, PendingFork};
pub use history::{History, HistoryEntry};
pub use summary::{CommitSummary, CommitSummaryBuilder};

use crate::core::config::{Config, ConfigFile, WikiConfig};
use crate::core::index::{CommitIndex, IndexStore};
use crate::core::ops::lock::PageLocks;
use crate::core::paths::WikiPaths;
use crate::core::revisions::RevisionStore;
use crate::core::types::{BranchName, Identity};
use crate::git::{CommitAuthor, Git};

/// Commit identity used when no requester identity is available.
pub const SYSTEM_NAME: &str = "wikifork";
pub const SYSTEM_EMAIL: &str = "wikifork@wikifork.invalid";

/// The wiki context.
pub struct Wiki {
    config: WikiConfig,
    paths: WikiPaths,
    git: Git,
    locks: PageLocks,
    index_store: IndexStore,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for Wiki {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wiki")
            .field("git_dir", &self.paths.git_dir)
            .field("canonical", &self.config.canonical_branch)
            .finish()
    }
}

impl Wiki {
    /// Open the wiki repository containing `path`, loading configuration
    /// from the default locations.
    pub fn open(path: &Path) -> Result<Self, WikiError> {
        let git = Git::open(path)?;
        let loaded = Config::load(Some(git.git_dir()))?;
        Self::from_parts(git, loaded.config)
    }

    /// Open with an already-resolved configuration.
    pub fn open_with_config(path: &Path, config: WikiConfig) -> Result<Self, WikiError> {
        Self::from_parts(Git::open(path)?, config)
    }

    /// Create a bare wiki repository at `path` (or reuse an existing one),
    /// optionally writing a repository config file first.
    pub fn init(path: &Path, repo_config: Option<&ConfigFile>) -> Result<Self, WikiError> {
        let git = Git::init_bare(path)?;
        let paths = WikiPaths::new(git.git_dir().to_path_buf());
        if let Some(file) = repo_config {
            let written = Config::write_repo(&paths, file)?;
            tracing::info!(path = %written.display(), "wrote repository config");
        }
        let loaded = Config::load(Some(git.git_dir()))?;
        Self::from_parts(git, loaded.config)
    }

    fn from_parts(git: Git, config: WikiConfig) -> Result<Self, WikiError> {
        let paths = WikiPaths::new(git.git_dir().to_path_buf());
        let locks = PageLocks::new(&paths, config.lock_timeout);
        let index_store = IndexStore::new(&paths);

        let wiki = Self {
            config,
            paths,
            git,
            locks,
            index_store,
            notifier: Arc::new(TracingNotifier),
        };
        wiki.revisions()
            .ensure_root(wiki.canonical(), &system_author())?;
        tracing::debug!(git_dir = %wiki.paths.git_dir.display(), canonical = %wiki.canonical(), "opened wiki");
        Ok(wiki)
    }

    /// Replace the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    pub fn paths(&self) -> &WikiPaths {
        &self.paths
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    pub fn locks(&self) -> &PageLocks {
        &self.locks
    }

    pub fn notifier(&self) -> &dyn NotificationSink {
        self.notifier.as_ref()
    }

    /// The canonical branch.
    pub fn canonical(&self) -> &BranchName {
        &self.config.canonical_branch
    }

    /// Revision storage for this wiki.
    pub fn revisions(&self) -> RevisionStore<'_> {
        RevisionStore::new(&self.git, &self.config.extension)
    }

    /// The commit index of `branch`.
    pub fn index(&self, branch: &BranchName) -> CommitIndex<'_> {
        CommitIndex::new(
            self.revisions(),
            &self.index_store,
            &self.locks,
            branch.clone(),
        )
    }
}

/// Commit author for a requester identity, or the system identity.
pub fn commit_author(identity: Option<&Identity>) -> CommitAuthor {
    match identity {
        Some(identity) => CommitAuthor::new(identity.display_name(), identity.email()),
        None => system_author(),
    }
}

fn system_author() -> CommitAuthor {
    CommitAuthor::new(SYSTEM_NAME, SYSTEM_EMAIL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_canonical() {
        let dir = TempDir::new().unwrap();
        let wiki = Wiki::init(dir.path(), None).unwrap();
        let head = wiki.revisions().head(wiki.canonical()).unwrap();
        assert!(head.is_some());
        assert!(wiki.revisions().list_pages(wiki.canonical()).unwrap().is_empty());
    }

    #[test]
    fn init_writes_repo_config() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile {
            canonical_branch: Some("main".into()),
            ..Default::default()
        };
        let wiki = Wiki::init(dir.path(), Some(&file)).unwrap();
        assert_eq!(wiki.canonical().as_str(), "main");
        assert!(wiki.paths().repo_config_path().exists());
    }

    #[test]
    fn reopen_keeps_head() {
        let dir = TempDir::new().unwrap();
        let first = Wiki::init(dir.path(), None).unwrap();
        let head = first.revisions().head(first.canonical()).unwrap();
        drop(first);

        let config = WikiConfig::defaults().unwrap();
        let again = Wiki::open_with_config(dir.path(), config).unwrap();
        assert_eq!(again.revisions().head(again.canonical()).unwrap(), head);
    }

    #[test]
    fn open_outside_repo_fails() {
        let dir = TempDir::new().unwrap();
        let config = WikiConfig::defaults().unwrap();
        assert!(matches!(
            Wiki::open_with_config(dir.path(), config),
            Err(WikiError::StoreIo(_))
        ));
    }

    #[test]
    fn commit_author_from_identity() {
        let id = Identity::new("alice@example.org").unwrap();
        let author = commit_author(Some(&id));
        assert_eq!(author.name, "alice");
        assert_eq!(author.email, "alice@example.org");
        assert_eq!(commit_author(None).name, SYSTEM_NAME);
    }
}
