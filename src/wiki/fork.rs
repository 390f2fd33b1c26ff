//! wiki::fork
//!
//! Branch selection, forking and promotion.
//!
//! # States
//!
//! For each (page, requester) pair:
//!
//! ```text
//! Canonical ──edit by contributor──▶ Forked ──promote / approving edit──▶ Canonical
//! ```
//!
//! A contributor's fork of a page is the branch `fork/<owner>/<page>`,
//! created from canonical on the contributor's first edit. Once its head is
//! reachable from canonical it is *merged*: reads ignore it, and the next
//! edit fast-forwards it to canonical before writing.
//!
//! # Locking
//!
//! Every write holds the (page, branch) lock from reading the current page
//! to appending the new revision to the commit index. Operations touching
//! both canonical and a fork lock canonical first.

use crate::core::naming::{self, FORK_PREFIX};
use crate::core::ops::lock::PageLock;
use crate::core::page::{Metadata, Page, Role};
use crate::core::revisions::MergeOutcome;
use crate::core::types::{BranchName, Identity, Oid, PageName};
use crate::git::CommitAuthor;

use super::{commit_author, Requester, Wiki, WikiError};

/// An unmerged fork of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFork {
    pub branch: BranchName,
    /// `<slug>-<hash>` key of the fork's owner.
    pub owner: String,
    /// Author of the fork's newest commit.
    pub author: String,
    pub head: Oid,
}

/// Decides which branch a requester reads and writes.
pub struct ForkManager<'w> {
    wiki: &'w Wiki,
}

impl<'w> ForkManager<'w> {
    pub fn new(wiki: &'w Wiki) -> Self {
        Self { wiki }
    }

    fn canonical(&self) -> &BranchName {
        self.wiki.canonical()
    }

    /// Whether `requester` reads and writes canonical directly.
    fn writes_canonical(&self, requester: &Requester) -> bool {
        requester.is_editor || !self.wiki.config().auth_enabled
    }

    fn require_editor(&self, requester: &Requester, action: &str) -> Result<(), WikiError> {
        if self.writes_canonical(requester) {
            Ok(())
        } else {
            Err(WikiError::PermissionDenied(format!("only editors may {action}")))
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// The branch `requester` sees `page` on.
    ///
    /// Editors, and everyone when auth or forking is disabled, read
    /// canonical. Anyone else reads their own fork while it is unmerged.
    pub fn resolve_read_ref(
        &self,
        page: &PageName,
        requester: &Requester,
    ) -> Result<BranchName, WikiError> {
        if self.writes_canonical(requester) || !self.wiki.config().forking_enabled {
            return Ok(self.canonical().clone());
        }
        let Some(identity) = &requester.identity else {
            return Ok(self.canonical().clone());
        };

        let fork = naming::fork_branch(identity, page)?;
        if self.unmerged_head(&fork)?.is_some() {
            Ok(fork)
        } else {
            Ok(self.canonical().clone())
        }
    }

    /// The page as `requester` sees it.
    pub fn read(&self, page: &PageName, requester: &Requester) -> Result<Page, WikiError> {
        let branch = self.resolve_read_ref(page, requester)?;
        self.read_on(&branch, page)
    }

    /// Like [`read`](Self::read), but an absent page comes back empty with
    /// default metadata, ready to be edited.
    pub fn find_or_create(
        &self,
        page: &PageName,
        requester: &Requester,
    ) -> Result<Page, WikiError> {
        let branch = self.resolve_read_ref(page, requester)?;
        match self.read_on(&branch, page) {
            Ok(found) => Ok(found),
            Err(WikiError::PageNotFound { .. }) => {
                Ok(Page::empty(page.clone(), branch, &self.wiki.config().fields))
            }
            Err(e) => Err(e),
        }
    }

    /// An editor's view of `owner`'s pending version of `page`.
    pub fn read_fork(
        &self,
        page: &PageName,
        owner: &Identity,
        approver: &Requester,
    ) -> Result<Page, WikiError> {
        self.require_editor(approver, "review forks")?;
        let fork = naming::fork_branch(owner, page)?;
        if self.wiki.revisions().head(&fork)?.is_none() {
            return Err(WikiError::BranchNotFound(fork.to_string()));
        }
        self.read_on(&fork, page)
    }

    /// Unmerged forks of `page`.
    pub fn pending_forks(&self, page: &PageName) -> Result<Vec<PendingFork>, WikiError> {
        let store = self.wiki.revisions();
        let Some(canonical_head) = store.head(self.canonical())? else {
            return Ok(Vec::new());
        };

        let mut pending = Vec::new();
        for (branch, head) in store.list_branches(FORK_PREFIX)? {
            let Some((owner, fork_page)) = naming::parse_fork_branch(&branch) else {
                continue;
            };
            if &fork_page != page || store.is_ancestor(&head, &canonical_head)? {
                continue;
            }
            let info = store.commit_info(&head)?;
            pending.push(PendingFork {
                owner: owner.to_string(),
                author: info.author_email,
                head,
                branch,
            });
        }
        Ok(pending)
    }

    fn read_on(&self, branch: &BranchName, page: &PageName) -> Result<Page, WikiError> {
        let blob = self.wiki.revisions().read(branch, page)?;
        Ok(Page::parse(
            &blob,
            page.clone(),
            branch.clone(),
            &self.wiki.config().fields,
        )?)
    }

    fn read_optional(&self, branch: &BranchName, page: &PageName) -> Result<Option<Page>, WikiError> {
        match self.read_on(branch, page) {
            Ok(found) => Ok(Some(found)),
            Err(WikiError::PageNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The fork's head if the fork exists and is not merged.
    fn unmerged_head(&self, fork: &BranchName) -> Result<Option<Oid>, WikiError> {
        let store = self.wiki.revisions();
        let Some(fork_head) = store.head(fork)? else {
            return Ok(None);
        };
        let Some(canonical_head) = store.head(self.canonical())? else {
            return Ok(Some(fork_head));
        };
        if store.is_ancestor(&fork_head, &canonical_head)? {
            Ok(None)
        } else {
            Ok(Some(fork_head))
        }
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Save `requester`'s edit of `page`, dispatching on role.
    ///
    /// Editors (or everyone, with auth disabled) write canonical; others
    /// write their fork when forking is enabled and are refused otherwise.
    pub fn submit(
        &self,
        page: &PageName,
        requester: &Requester,
        body: &str,
        metadata: &Metadata,
        approving: Option<&Identity>,
    ) -> Result<Page, WikiError> {
        if self.writes_canonical(requester) {
            self.update_canonical(page, requester, body, metadata, approving)
        } else if self.wiki.config().forking_enabled {
            self.branch_content(page, requester, body, metadata)
        } else {
            Err(WikiError::PermissionDenied(
                "only editors may change pages while forking is disabled".to_string(),
            ))
        }
    }

    /// Write `requester`'s edit of `page` to their fork, creating it from
    /// canonical if needed. Canonical is never touched.
    pub fn branch_content(
        &self,
        page: &PageName,
        requester: &Requester,
        body: &str,
        metadata: &Metadata,
    ) -> Result<Page, WikiError> {
        let identity = requester.identity.as_ref().ok_or_else(|| {
            WikiError::PermissionDenied("anonymous requesters cannot edit pages".to_string())
        })?;
        let fork = naming::fork_branch(identity, page)?;
        let store = self.wiki.revisions();

        let lock = self.wiki.locks().acquire(page, &fork)?;

        let created = match store.head(&fork)? {
            None => {
                store.create_branch_from(&fork, self.canonical())?;
                tracing::info!(page = %page, fork = %fork, "created fork");
                true
            }
            Some(fork_head) => {
                let canonical_head = store
                    .head(self.canonical())?
                    .ok_or_else(|| WikiError::BranchNotFound(self.canonical().to_string()))?;
                if fork_head != canonical_head && store.is_ancestor(&fork_head, &canonical_head)? {
                    store.fast_forward(&fork, &fork_head, &canonical_head)?;
                    tracing::info!(page = %page, fork = %fork, "fast-forwarded merged fork to canonical");
                }
                false
            }
        };

        let current = self.read_optional(&fork, page)?;
        let saved = self.write_locked(
            &lock,
            &fork,
            page,
            current.as_ref(),
            requester.role(),
            body,
            metadata,
            &commit_author(Some(identity)),
            page.as_str(),
            None,
        )?;
        drop(lock);

        if created {
            let owner = current
                .as_ref()
                .and_then(|p| p.get("owner"))
                .filter(|owner| !owner.is_empty());
            self.wiki.notifier().fork_created(page, owner, identity);
        }
        Ok(saved)
    }

    /// An editor's write to canonical.
    ///
    /// With `approving`, the new revision also records the owner's fork head
    /// as a second parent, so the fork counts as merged afterwards, and the
    /// fork's author is notified.
    pub fn update_canonical(
        &self,
        page: &PageName,
        editor: &Requester,
        body: &str,
        metadata: &Metadata,
        approving: Option<&Identity>,
    ) -> Result<Page, WikiError> {
        self.require_editor(editor, "change the canonical version")?;
        let canonical = self.canonical().clone();
        let store = self.wiki.revisions();

        let canonical_lock = self.wiki.locks().acquire(page, &canonical)?;
        let (fork_lock, extra_parent) = match approving {
            Some(owner) => {
                let fork = naming::fork_branch(owner, page)?;
                let fork_lock = self.wiki.locks().acquire(page, &fork)?;
                let fork_head = store
                    .head(&fork)?
                    .ok_or_else(|| WikiError::BranchNotFound(fork.to_string()))?;
                let canonical_head = store
                    .head(&canonical)?
                    .ok_or_else(|| WikiError::BranchNotFound(canonical.to_string()))?;
                let extra = if store.is_ancestor(&fork_head, &canonical_head)? {
                    None
                } else {
                    Some(fork_head)
                };
                (Some(fork_lock), extra)
            }
            None => (None, None),
        };
        let message = match approving {
            Some(owner) => approval_message(owner, page),
            None => page.to_string(),
        };

        let current = self.read_optional(&canonical, page)?;
        let saved = self.write_locked(
            &canonical_lock,
            &canonical,
            page,
            current.as_ref(),
            Role::Editor,
            body,
            metadata,
            &commit_author(editor.identity.as_ref()),
            &message,
            extra_parent.as_ref(),
        )?;
        drop(fork_lock);
        drop(canonical_lock);

        if let Some(owner) = approving {
            self.wiki
                .notifier()
                .fork_approved(page, owner, editor.identity.as_ref());
        }
        Ok(saved)
    }

    /// Merge `owner`'s fork of `page` into canonical.
    ///
    /// # Errors
    ///
    /// - [`WikiError::PermissionDenied`] unless `approver` is an editor
    /// - [`WikiError::BranchNotFound`] if `owner` has no fork of the page
    /// - [`WikiError::MergeConflict`] if the versions conflict; neither
    ///   branch moves
    pub fn promote(
        &self,
        page: &PageName,
        owner: &Identity,
        approver: &Requester,
    ) -> Result<Page, WikiError> {
        self.require_editor(approver, "approve changes")?;
        let canonical = self.canonical().clone();
        let fork = naming::fork_branch(owner, page)?;
        let store = self.wiki.revisions();

        let canonical_lock = self.wiki.locks().acquire(page, &canonical)?;
        let fork_lock = self.wiki.locks().acquire(page, &fork)?;

        if store.head(&fork)?.is_none() {
            return Err(WikiError::BranchNotFound(fork.to_string()));
        }

        let author = commit_author(approver.identity.as_ref());
        let outcome = store.merge(
            &fork,
            &canonical,
            page,
            &author,
            &approval_message(owner, page),
        )?;
        self.wiki
            .index(&canonical)
            .reconcile_locked(&canonical_lock, page)?;
        drop(fork_lock);
        drop(canonical_lock);

        match &outcome {
            MergeOutcome::AlreadyMerged { .. } => {
                tracing::info!(page = %page, fork = %fork, "fork already merged");
            }
            MergeOutcome::FastForward { head } | MergeOutcome::Merged { head } => {
                tracing::info!(page = %page, fork = %fork, head = %head.short(8), "promoted fork");
                self.wiki
                    .notifier()
                    .fork_approved(page, owner, approver.identity.as_ref());
            }
        }

        self.read_on(&canonical, page)
    }

    /// Write `page` on `branch` while holding its lock, then index it.
    #[allow(clippy::too_many_arguments)]
    fn write_locked(
        &self,
        lock: &PageLock,
        branch: &BranchName,
        page: &PageName,
        current: Option<&Page>,
        role: Role,
        body: &str,
        requested: &Metadata,
        author: &CommitAuthor,
        message: &str,
        extra_parent: Option<&Oid>,
    ) -> Result<Page, WikiError> {
        let fields = &self.wiki.config().fields;
        let next = match current {
            Some(current) => current.with_content(
                body,
                fields.apply(role, current.metadata(), requested),
                fields,
            ),
            None => Page::new(
                page.clone(),
                branch.clone(),
                body,
                fields.apply(role, &Metadata::new(), requested),
                fields,
            ),
        };

        let revision = self.wiki.revisions().write_with_extra_parent(
            branch,
            page,
            &next.serialize()?,
            author,
            message,
            extra_parent,
        )?;
        self.wiki.index(branch).append(lock, page, &revision)?;
        Ok(next)
    }
}

/// Commit message for an approval; the page name is the last line.
fn approval_message(owner: &Identity, page: &PageName) -> String {
    format!("Approve {} changes\n\n{}", owner, page)
}
