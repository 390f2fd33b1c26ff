//! wiki::summary
//!
//! Human-readable commit summaries for history listings.

use serde::Serialize;

use crate::core::types::{Oid, PageName};
use crate::git::CommitInfo;

/// Timestamp layout used in summaries, always in UTC.
pub const TIME_FORMAT: &str = "%H:%M:%S on %m/%d/%Y";

/// One revision of a page as shown in history views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub id: Oid,
    /// Oldest-first position of the revision in the page's history.
    pub offset: usize,
    pub author: String,
    pub authored_at: String,
    pub committer: String,
    pub committed_at: String,
    /// True when this revision created the page on its branch.
    pub introduces_page: bool,
    pub page: PageName,
}

/// Projects raw commits into [`CommitSummary`] records.
pub struct CommitSummaryBuilder;

impl CommitSummaryBuilder {
    pub fn summarize(
        info: &CommitInfo,
        offset: usize,
        introduces_page: bool,
        page: &PageName,
    ) -> CommitSummary {
        CommitSummary {
            id: info.oid.clone(),
            offset,
            author: info.author_name.clone(),
            authored_at: info.author_time.format(TIME_FORMAT).to_string(),
            committer: info.committer_name.clone(),
            committed_at: info.committer_time.format(TIME_FORMAT).to_string(),
            introduces_page,
            page: page.clone(),
        }
    }
}
