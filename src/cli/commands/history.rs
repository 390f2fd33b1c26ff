//! history command - List revisions of a page

use super::page_name;
use crate::cli::Context;
use crate::ui::output;
use crate::wiki::history::{BEFORE_LIMIT, RECENT_LIMIT};
use crate::wiki::History;
use anyhow::Result;

/// List revisions of `page` on the branch the current user reads.
pub fn history(
    ctx: &Context,
    page: &str,
    before: Option<i64>,
    limit: Option<usize>,
    all: bool,
    json: bool,
) -> Result<()> {
    let name = page_name(page)?;
    let wiki = ctx.open_wiki()?;
    let requester = ctx.requester()?;
    let history = History::for_requester(&wiki, &name, &requester)?;

    let summaries = match (before, all) {
        (Some(head), _) => history.before(&name, head, limit.unwrap_or(BEFORE_LIMIT))?,
        (None, true) => history.recent(&name, usize::MAX)?,
        (None, false) => history.recent(&name, limit.unwrap_or(RECENT_LIMIT))?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    output::debug(
        format!("history of {} on {}", name, history.branch()),
        ctx.verbosity(),
    );
    if summaries.is_empty() {
        output::print(format!("No revisions of {}", name), ctx.verbosity());
    }
    for summary in &summaries {
        println!("{}", output::format_summary(summary));
    }
    Ok(())
}
