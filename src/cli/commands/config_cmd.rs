//! config command - Show the resolved configuration

use crate::cli::Context;
use crate::core::config::Config;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Print the resolved configuration and the files it came from.
pub fn config(ctx: &Context) -> Result<()> {
    let wiki = ctx.open_wiki()?;
    let loaded = Config::load(Some(wiki.paths().git_dir.as_path())).context("Failed to load config")?;
    let config = &loaded.config;

    for source in &loaded.sources {
        output::debug(format!("config source: {}", source.display()), ctx.verbosity());
    }
    println!("canonical_branch = {}", config.canonical_branch);
    println!("extension = {}", config.extension);
    println!("homepage = {}", config.homepage);
    println!("auth_enabled = {}", config.auth_enabled);
    println!("forking_enabled = {}", config.forking_enabled);
    println!("lock_timeout_ms = {}", config.lock_timeout.as_millis());
    println!("templates = {}", config.templates.known().join(", "));
    let fields: Vec<String> = config
        .fields
        .defaults()
        .map(|(key, value)| {
            let role = if config.fields.is_editor_field(key) {
                "editor"
            } else {
                "open"
            };
            format!("{} ({}, default {:?})", key, role, value)
        })
        .collect();
    println!("fields = {}", fields.join(", "));
    Ok(())
}
