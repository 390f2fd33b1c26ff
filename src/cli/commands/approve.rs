//! approve command - Merge a contributor's fork into the canonical version

use super::{owner_identity, page_name};
use crate::cli::Context;
use crate::ui::output;
use crate::wiki::{ForkManager, WikiError};
use anyhow::{bail, Result};

/// Promote `owner`'s fork of `page`.
pub fn approve(ctx: &Context, page: &str, owner: &str) -> Result<()> {
    let name = page_name(page)?;
    let owner = owner_identity(owner)?;

    let wiki = ctx.open_wiki()?;
    let requester = ctx.requester()?;
    match ForkManager::new(&wiki).promote(&name, &owner, &requester) {
        Ok(page) => {
            output::success(
                format!("Approved changes to {} by {}", page.name(), owner),
                ctx.verbosity(),
            );
            Ok(())
        }
        Err(WikiError::MergeConflict { paths, .. }) => {
            bail!(
                "Changes to {} by {} conflict with the canonical version ({}); \
                 resolve with `edit --approve`",
                name,
                owner,
                paths.join(", ")
            )
        }
        Err(e) => Err(e.into()),
    }
}
