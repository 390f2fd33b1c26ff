//! wiki::history
//!
//! Offset-addressed page history on one branch.
//!
//! Offsets are oldest-first everywhere: offset 0 is the revision that
//! introduced the page, `length - 1` the newest. Short lists are returned
//! newest first but keep those offsets.

use crate::core::page::Page;
use crate::core::types::{BranchName, Oid, PageName};

use super::diff::{DiffLine, DiffRenderer};
use super::summary::{CommitSummary, CommitSummaryBuilder};
use super::{Requester, Wiki, WikiError};

/// Revisions shown beside the edit form.
pub const RECENT_LIMIT: usize = 7;

/// Revisions shown beside a historical revision.
pub const BEFORE_LIMIT: usize = 5;

/// Everything needed to display one historical revision.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub summary: CommitSummary,
    /// The page as of this revision.
    pub page: Page,
    /// The revision's changes to the page.
    pub lines: Vec<DiffLine>,
}

/// History views for pages on one branch.
pub struct History<'w> {
    wiki: &'w Wiki,
    branch: BranchName,
}

impl<'w> History<'w> {
    pub fn new(wiki: &'w Wiki, branch: BranchName) -> Self {
        Self { wiki, branch }
    }

    /// History of the canonical branch.
    pub fn canonical(wiki: &'w Wiki) -> Self {
        Self::new(wiki, wiki.canonical().clone())
    }

    /// History of the branch `requester` reads `page` from.
    pub fn for_requester(
        wiki: &'w Wiki,
        page: &PageName,
        requester: &Requester,
    ) -> Result<Self, WikiError> {
        let branch = super::ForkManager::new(wiki).resolve_read_ref(page, requester)?;
        Ok(Self::new(wiki, branch))
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// The revision at `offset`.
    pub fn lookup(&self, page: &PageName, offset: i64) -> Result<Oid, WikiError> {
        Ok(self.wiki.index(&self.branch).lookup(page, offset)?)
    }

    /// Number of revisions of `page`.
    pub fn length(&self, page: &PageName) -> Result<usize, WikiError> {
        Ok(self.wiki.index(&self.branch).length(page)?)
    }

    /// Summary of the revision at `offset`.
    pub fn summary(&self, page: &PageName, offset: i64) -> Result<CommitSummary, WikiError> {
        let revision = self.lookup(page, offset)?;
        self.summarize(page, &revision, offset_index(offset))
    }

    /// The revision at `offset` with its rendered changes.
    pub fn diff_render(&self, page: &PageName, offset: i64) -> Result<HistoryEntry, WikiError> {
        let revision = self.lookup(page, offset)?;
        let store = self.wiki.revisions();

        let diff = store.diff(&revision, page)?;
        let lines = DiffRenderer::render(&diff.patch)?;
        let info = store.commit_info(&revision)?;
        let summary =
            CommitSummaryBuilder::summarize(&info, offset_index(offset), diff.introduces_path, page);

        let blob = store.read_at(&revision, page)?;
        let snapshot = Page::parse(
            &blob,
            page.clone(),
            self.branch.clone(),
            &self.wiki.config().fields,
        )?;

        Ok(HistoryEntry {
            summary,
            page: snapshot,
            lines,
        })
    }

    /// The newest `limit` revisions, newest first.
    pub fn recent(&self, page: &PageName, limit: usize) -> Result<Vec<CommitSummary>, WikiError> {
        let entries = self.wiki.index(&self.branch).entries(page)?;
        self.newest_first(page, &entries, entries.len(), limit)
    }

    /// Up to `limit` revisions with offsets strictly below `head`, newest
    /// first.
    pub fn before(
        &self,
        page: &PageName,
        head: i64,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, WikiError> {
        let entries = self.wiki.index(&self.branch).entries(page)?;
        let end = usize::try_from(head).unwrap_or(0).min(entries.len());
        self.newest_first(page, &entries, end, limit)
    }

    /// Summaries of `entries[..end]`, newest first, at most `limit`.
    fn newest_first(
        &self,
        page: &PageName,
        entries: &[Oid],
        end: usize,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, WikiError> {
        let start = end.saturating_sub(limit);
        (start..end)
            .rev()
            .map(|offset| self.summarize(page, &entries[offset], offset))
            .collect()
    }

    fn summarize(
        &self,
        page: &PageName,
        revision: &Oid,
        offset: usize,
    ) -> Result<CommitSummary, WikiError> {
        let store = self.wiki.revisions();
        let info = store.commit_info(revision)?;
        let introduces = store.diff(revision, page)?.introduces_path;
        Ok(CommitSummaryBuilder::summarize(&info, offset, introduces, page))
    }
}

/// An offset that already passed a lookup is non-negative.
fn offset_index(offset: i64) -> usize {
    usize::try_from(offset).unwrap_or(0)
}
