//! show command - Show a page as the current user sees it

use super::page_name;
use crate::cli::Context;
use crate::core::page::{Metadata, Page, TemplateSet};
use crate::ui::output;
use crate::wiki::{ForkManager, History};
use anyhow::Result;
use serde::Serialize;

/// JSON shape of a page.
#[derive(Serialize)]
pub(super) struct PageView<'a> {
    name: &'a str,
    branch: &'a str,
    template: &'a str,
    metadata: &'a Metadata,
    body: &'a str,
}

impl<'a> PageView<'a> {
    pub(super) fn new(page: &'a Page, templates: &'a TemplateSet) -> Self {
        Self {
            name: page.name().as_str(),
            branch: page.branch().as_str(),
            template: templates.select(page),
            metadata: page.metadata(),
            body: page.body(),
        }
    }
}

/// Show `page` (or the homepage), optionally at a historical offset.
pub fn show(
    ctx: &Context,
    page: Option<&str>,
    at: Option<i64>,
    body_only: bool,
    json: bool,
) -> Result<()> {
    let wiki = ctx.open_wiki()?;
    let requester = ctx.requester()?;
    let name = match page {
        Some(name) => page_name(name)?,
        None => wiki.config().homepage.clone(),
    };

    let page = match at {
        Some(offset) => {
            History::for_requester(&wiki, &name, &requester)?
                .diff_render(&name, offset)?
                .page
        }
        None => ForkManager::new(&wiki).read(&name, &requester)?,
    };
    output::debug(
        format!("read {} from {}", page.name(), page.branch()),
        ctx.verbosity(),
    );

    print_page(&page, &wiki.config().templates, body_only, json)
}

pub(super) fn print_page(
    page: &Page,
    templates: &TemplateSet,
    body_only: bool,
    json: bool,
) -> Result<()> {
    if json {
        let view = PageView::new(page, templates);
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else if body_only {
        print!("{}", page.body());
    } else {
        print!("{}", output::format_page(page));
    }
    Ok(())
}
