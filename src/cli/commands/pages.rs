//! pages command - List pages on a branch

use crate::cli::Context;
use crate::core::types::BranchName;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// List the pages on `branch`, or on canonical.
pub fn pages(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let wiki = ctx.open_wiki()?;
    let branch = match branch {
        Some(name) => {
            BranchName::new(name).with_context(|| format!("Invalid branch name '{}'", name))?
        }
        None => wiki.canonical().clone(),
    };

    let pages = wiki
        .revisions()
        .list_pages(&branch)
        .with_context(|| format!("Failed to list pages on {}", branch))?;
    if pages.is_empty() {
        output::print(format!("No pages on {}", branch), ctx.verbosity());
        return Ok(());
    }
    println!("{}", output::format_list(&pages, ""));
    Ok(())
}
