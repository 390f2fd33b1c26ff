//! wiki::collab
//!
//! Collaborators the wiki consumes but does not implement: who is asking,
//! and where notifications go.

use std::sync::Mutex;

use crate::core::page::Role;
use crate::core::types::{Identity, PageName};

/// The person making a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requester {
    /// `None` for anonymous requests.
    pub identity: Option<Identity>,
    pub is_editor: bool,
}

impl Requester {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn contributor(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            is_editor: false,
        }
    }

    pub fn editor(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            is_editor: true,
        }
    }

    /// Field-policy role of this requester.
    pub fn role(&self) -> Role {
        if self.is_editor {
            Role::Editor
        } else {
            Role::Contributor
        }
    }
}

/// Source of the current requester (session lookup in a web front end).
pub trait IdentityProvider {
    fn current(&self) -> Requester;
}

/// An identity provider that always answers with the same requester, as a
/// command-line session does.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub Requester);

impl StaticIdentity {
    /// The requester described by an optional identity and an editor flag.
    pub fn new(identity: Option<Identity>, is_editor: bool) -> Self {
        Self(Requester {
            identity,
            is_editor,
        })
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Requester {
        self.0.clone()
    }
}

/// Receiver for fork lifecycle events.
pub trait NotificationSink: Send + Sync {
    /// `author` created a fork of `page`; `owner` is the page's `owner`
    /// field when it is set.
    fn fork_created(&self, page: &PageName, owner: Option<&str>, author: &Identity);

    /// `approver` accepted `author`'s fork of `page`.
    fn fork_approved(&self, page: &PageName, author: &Identity, approver: Option<&Identity>);
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn fork_created(&self, page: &PageName, owner: Option<&str>, author: &Identity) {
        tracing::info!(page = %page, owner = owner.unwrap_or("-"), author = %author, "fork created");
    }

    fn fork_approved(&self, page: &PageName, author: &Identity, approver: Option<&Identity>) {
        let approver = approver.map(Identity::as_str).unwrap_or("-");
        tracing::info!(page = %page, author = %author, approver, "fork approved");
    }
}

/// A delivered notification, as kept by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ForkCreated {
        page: PageName,
        owner: Option<String>,
        author: Identity,
    },
    ForkApproved {
        page: PageName,
        author: Identity,
        approver: Option<Identity>,
    },
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, oldest first.
    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, event: Notification) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl NotificationSink for RecordingNotifier {
    fn fork_created(&self, page: &PageName, owner: Option<&str>, author: &Identity) {
        self.push(Notification::ForkCreated {
            page: page.clone(),
            owner: owner.map(str::to_string),
            author: author.clone(),
        });
    }

    fn fork_approved(&self, page: &PageName, author: &Identity, approver: Option<&Identity>) {
        self.push(Notification::ForkApproved {
            page: page.clone(),
            author: author.clone(),
            approver: approver.cloned(),
        });
    }
}
