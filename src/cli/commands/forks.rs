//! forks command - List and inspect unapproved forks of a page

use super::show::print_page;
use super::{owner_identity, page_name};
use crate::cli::Context;
use crate::ui::output;
use crate::wiki::ForkManager;
use anyhow::Result;
use serde_json::json;

/// List unmerged forks of `page`.
pub fn forks(ctx: &Context, page: &str, json: bool) -> Result<()> {
    let name = page_name(page)?;
    let wiki = ctx.open_wiki()?;
    let pending = ForkManager::new(&wiki).pending_forks(&name)?;

    if json {
        let items: Vec<_> = pending
            .iter()
            .map(|fork| {
                json!({
                    "branch": fork.branch.as_str(),
                    "owner": fork.owner,
                    "author": fork.author,
                    "head": fork.head.as_str(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if pending.is_empty() {
        output::print(format!("No pending changes to {}", name), ctx.verbosity());
        return Ok(());
    }
    for fork in &pending {
        println!("{}", output::format_fork(fork));
    }
    Ok(())
}

/// Show `owner`'s pending version of `page`.
pub fn show_fork(ctx: &Context, page: &str, owner: &str) -> Result<()> {
    let name = page_name(page)?;
    let owner = owner_identity(owner)?;
    let wiki = ctx.open_wiki()?;
    let requester = ctx.requester()?;

    let page = ForkManager::new(&wiki).read_fork(&name, &owner, &requester)?;
    print_page(&page, &wiki.config().templates, false, false)
}
