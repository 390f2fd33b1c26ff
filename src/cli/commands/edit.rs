//! edit command - Save a new version of a page

use super::{owner_identity, page_name};
use crate::cli::Context;
use crate::core::page::Metadata;
use crate::ui::output;
use crate::wiki::ForkManager;
use anyhow::{bail, Context as _, Result};
use std::io::Read;
use std::path::Path;

/// Save a new version of `page` for the current user.
pub fn edit(
    ctx: &Context,
    page: &str,
    body: Option<&str>,
    file: Option<&Path>,
    meta: &[String],
    approve: Option<&str>,
) -> Result<()> {
    let name = page_name(page)?;
    let metadata = parse_meta(meta)?;
    let approving = approve.map(owner_identity).transpose()?;
    let body = read_body(body, file)?;

    let wiki = ctx.open_wiki()?;
    let requester = ctx.requester()?;
    let saved =
        ForkManager::new(&wiki).submit(&name, &requester, &body, &metadata, approving.as_ref())?;

    output::success(
        format!("Saved {} on {}", saved.name(), saved.branch()),
        ctx.verbosity(),
    );
    if let Some(owner) = &approving {
        output::print(format!("Approved changes by {}", owner), ctx.verbosity());
    }
    Ok(())
}

/// Parse repeated `key=value` arguments, keeping their order.
fn parse_meta(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid --meta '{}': expected KEY=VALUE", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid --meta '{}': empty key", pair);
        }
        metadata.insert(key.to_string(), value.to_string());
    }
    Ok(metadata)
}

fn read_body(body: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(body) = body {
        return Ok(body.to_string());
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    let mut body = String::new();
    std::io::stdin()
        .read_to_string(&mut body)
        .context("Failed to read page body from stdin")?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_pairs_keep_order() {
        let meta = parse_meta(&["title=Recipes".into(), "tags=food, home".into()]).unwrap();
        let keys: Vec<&str> = meta.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "tags"]);
        assert_eq!(meta["tags"], "food, home");
    }

    #[test]
    fn meta_value_may_contain_equals() {
        let meta = parse_meta(&["title=a=b".into()]).unwrap();
        assert_eq!(meta["title"], "a=b");
    }

    #[test]
    fn meta_without_equals_is_rejected() {
        assert!(parse_meta(&["title".into()]).is_err());
        assert!(parse_meta(&["=x".into()]).is_err());
    }

    #[test]
    fn body_argument_wins() {
        assert_eq!(read_body(Some("text"), None).unwrap(), "text");
    }
}
