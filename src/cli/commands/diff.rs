//! diff command - Show what a revision changed

use super::page_name;
use crate::cli::Context;
use crate::ui::output;
use crate::wiki::{DiffRenderer, History};
use anyhow::Result;

/// Show the changes made to `page` by the revision at `offset`.
pub fn diff(ctx: &Context, page: &str, offset: i64, html: bool) -> Result<()> {
    let name = page_name(page)?;
    let wiki = ctx.open_wiki()?;
    let requester = ctx.requester()?;
    let entry = History::for_requester(&wiki, &name, &requester)?.diff_render(&name, offset)?;

    if html {
        println!("{}", DiffRenderer::to_html(&entry.lines));
        return Ok(());
    }

    output::print(output::format_summary(&entry.summary), ctx.verbosity());
    println!("{}", output::format_diff(&entry.lines));
    Ok(())
}
