//! init command - Create a wiki repository

use crate::cli::Context;
use crate::core::config::ConfigFile;
use crate::ui::output;
use crate::wiki::Wiki;
use anyhow::{Context as _, Result};

/// Create (or reopen) the wiki repository at the context's path.
///
/// Only options given on the command line are written to the repository
/// config; everything else keeps its default.
pub fn init(
    ctx: &Context,
    canonical: Option<&str>,
    no_auth: bool,
    no_forking: bool,
) -> Result<()> {
    let path = ctx.repo_path()?;
    let file = ConfigFile {
        canonical_branch: canonical.map(str::to_string),
        auth_enabled: no_auth.then_some(false),
        forking_enabled: no_forking.then_some(false),
        ..Default::default()
    };
    let repo_config = (file != ConfigFile::default()).then_some(&file);

    let wiki = Wiki::init(&path, repo_config)
        .with_context(|| format!("Failed to initialize wiki at {}", path.display()))?;

    output::success(
        format!(
            "Initialized wiki at {} (canonical branch: {})",
            wiki.paths().git_dir.display(),
            wiki.canonical()
        ),
        ctx.verbosity(),
    );
    Ok(())
}
