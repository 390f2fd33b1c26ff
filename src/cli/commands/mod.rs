//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls one wiki operation
//! 3. Formats and displays output
//!
//! Handlers never touch git or the index directly.

mod approve;
mod completion;
mod config_cmd;
mod diff;
mod edit;
mod forks;
mod history;
mod init;
mod pages;
mod show;

pub use approve::approve;
pub use completion::completion;
pub use config_cmd::config;
pub use diff::diff;
pub use edit::edit;
pub use forks::{forks, show_fork};
pub use history::history;
pub use init::init;
pub use pages::pages;
pub use show::show;

use super::args::Command;
use super::Context;
use crate::core::types::{Identity, PageName};
use anyhow::{Context as _, Result};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init {
            canonical,
            no_auth,
            no_forking,
        } => init::init(ctx, canonical.as_deref(), no_auth, no_forking),
        Command::Show {
            page,
            at,
            body_only,
            json,
        } => show::show(ctx, page.as_deref(), at, body_only, json),
        Command::Edit {
            page,
            body,
            file,
            meta,
            approve,
        } => edit::edit(
            ctx,
            &page,
            body.as_deref(),
            file.as_deref(),
            &meta,
            approve.as_deref(),
        ),
        Command::Approve { page, owner } => approve::approve(ctx, &page, &owner),
        Command::ShowFork { page, owner } => forks::show_fork(ctx, &page, &owner),
        Command::Forks { page, json } => forks::forks(ctx, &page, json),
        Command::History {
            page,
            before,
            limit,
            all,
            json,
        } => history::history(ctx, &page, before, limit, all, json),
        Command::Diff { page, offset, html } => diff::diff(ctx, &page, offset, html),
        Command::Pages { branch } => pages::pages(ctx, branch.as_deref()),
        Command::Config => config_cmd::config(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Parse a page name argument.
fn page_name(name: &str) -> Result<PageName> {
    PageName::new(name).with_context(|| format!("Invalid page name '{}'", name))
}

/// Parse a fork owner argument.
fn owner_identity(owner: &str) -> Result<Identity> {
    Identity::new(owner).with_context(|| format!("Invalid owner '{}'", owner))
}
