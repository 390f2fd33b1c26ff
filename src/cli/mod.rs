//! cli
//!
//! Command-line front end for wikifork.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Turn `--user` / `--editor` into a [`StaticIdentity`] provider
//! - Delegate to command handlers, which call into [`crate::wiki`]
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers open a [`Wiki`], call one wiki
//! operation, and format the result through [`crate::ui::output`]. Errors
//! are reported with `anyhow` context; the wiki's own error types stay
//! below this layer.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::types::Identity;
use crate::ui::output::Verbosity;
use crate::wiki::{IdentityProvider, Requester, StaticIdentity, Wiki};

/// Execution context shared by all command handlers.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Repository override.
    pub repo: Option<PathBuf>,
    /// Identity to act as.
    pub user: Option<String>,
    /// Act with editor rights.
    pub editor: bool,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// The repository path: `--repo`, or the current directory.
    pub fn repo_path(&self) -> Result<PathBuf> {
        match &self.repo {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir().context("Failed to determine current directory"),
        }
    }

    /// Open the wiki this invocation works on.
    pub fn open_wiki(&self) -> Result<Wiki> {
        let path = self.repo_path()?;
        Wiki::open(&path).with_context(|| format!("Failed to open wiki at {}", path.display()))
    }

    /// The identity provider for this invocation: `--user` and `--editor`.
    pub fn identity(&self) -> Result<StaticIdentity> {
        let identity = self
            .user
            .as_deref()
            .map(Identity::new)
            .transpose()
            .context("Invalid --user")?;
        Ok(StaticIdentity::new(identity, self.editor))
    }

    /// The requester every command in this invocation acts as.
    pub fn requester(&self) -> Result<Requester> {
        Ok(self.identity()?.current())
    }
}

/// Run an already-parsed command line.
///
/// This is the main entry point called from `main.rs`, which parses first
/// so logging can be set up from the global flags.
pub fn run_with(cli: Cli) -> Result<()> {
    let ctx = Context {
        repo: cli.repo.clone(),
        user: cli.user.clone(),
        editor: cli.editor,
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requester_from_flags() {
        let ctx = Context {
            user: Some("alice@example.org".into()),
            ..Default::default()
        };
        let requester = ctx.requester().unwrap();
        assert!(!requester.is_editor);
        assert_eq!(
            requester.identity.as_ref().map(Identity::as_str),
            Some("alice@example.org")
        );

        let ctx = Context {
            editor: true,
            ..Default::default()
        };
        let requester = ctx.requester().unwrap();
        assert!(requester.is_editor);
        assert!(requester.identity.is_none());
    }

    #[test]
    fn invalid_user_is_rejected() {
        let ctx = Context {
            user: Some("  ".into()),
            ..Default::default()
        };
        assert!(ctx.requester().is_err());
    }
}
