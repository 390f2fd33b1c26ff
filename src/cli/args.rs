//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--repo <path>`: Wiki repository (defaults to the current directory)
//! - `--user <identity>`: Act as this identity
//! - `--editor`: Act with editor rights
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// wikifork - git-backed wiki pages with per-contributor forks
#[derive(Parser, Debug)]
#[command(name = "wikifork")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Wiki repository to operate on
    #[arg(long, global = true, env = "WIKIFORK_REPO")]
    pub repo: Option<PathBuf>,

    /// Identity to act as (usually an email address)
    #[arg(long, short, global = true, env = "WIKIFORK_USER")]
    pub user: Option<String>,

    /// Act with editor rights
    #[arg(long, global = true)]
    pub editor: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a wiki repository
    #[command(
        name = "init",
        long_about = "Create a bare wiki repository.\n\n\
            The canonical branch is created with an empty root commit. Options \
            given here are written to the repository config file; running init \
            on an existing wiki only adds a missing canonical branch.",
        after_help = "\
WORKFLOW EXAMPLES:
    # New wiki in ./wiki.git
    wikifork --repo wiki.git init

    # Wiki whose canonical branch is main, without forking
    wikifork --repo wiki.git init --canonical main --no-forking"
    )]
    Init {
        /// Name of the canonical branch
        #[arg(long)]
        canonical: Option<String>,

        /// Treat every requester as an editor
        #[arg(long)]
        no_auth: bool,

        /// Refuse edits from non-editors instead of forking
        #[arg(long)]
        no_forking: bool,
    },

    /// Show a page as the current user sees it
    #[command(
        name = "show",
        long_about = "Show a page.\n\n\
            Editors see the canonical version. Other users see their own fork \
            while it has unapproved changes, and the canonical version otherwise.",
        after_help = "\
WORKFLOW EXAMPLES:
    # The homepage
    wikifork show

    # A page as alice sees it
    wikifork --user alice@example.org show Recipes

    # Only the body
    wikifork show Recipes --body-only"
    )]
    Show {
        /// Page to show (defaults to the homepage)
        page: Option<String>,

        /// Show a historical revision by offset (0 is the oldest)
        #[arg(long)]
        at: Option<i64>,

        /// Print only the body
        #[arg(long)]
        body_only: bool,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save a new version of a page
    #[command(
        name = "edit",
        long_about = "Save a new version of a page.\n\n\
            Editors write the canonical version; other users write their fork, \
            which is created on their first edit. The body is read from --body, \
            --file or standard input. Metadata fields the user may not set are \
            kept at their current values.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Propose a change as a contributor
    echo 'New text' | wikifork --user alice@example.org edit Recipes

    # Set a field
    wikifork --editor --user ed@example.org edit Recipes --file recipes.md --meta title=Recipes

    # Rewrite a contributor's proposal and approve it in one step
    wikifork --editor --user ed@example.org edit Recipes --file merged.md --approve alice@example.org"
    )]
    Edit {
        /// Page to edit
        page: String,

        /// New body text
        #[arg(long, conflicts_with = "file")]
        body: Option<String>,

        /// Read the new body from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Metadata field to set, as key=value
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Approve this user's fork with the edit (editors only)
        #[arg(long, value_name = "OWNER")]
        approve: Option<String>,
    },

    /// Merge a contributor's fork into the canonical version
    #[command(
        name = "approve",
        long_about = "Merge a contributor's fork of a page into the canonical version.\n\n\
            Editors only. If the versions conflict nothing is changed and the \
            conflicting paths are reported; use `edit --approve` to resolve by hand.",
        after_help = "\
WORKFLOW EXAMPLES:
    # See who has pending changes
    wikifork --editor forks Recipes

    # Review, then approve
    wikifork --editor show-fork Recipes alice@example.org
    wikifork --editor --user ed@example.org approve Recipes alice@example.org"
    )]
    Approve {
        /// Page whose fork to merge
        page: String,

        /// Owner of the fork
        owner: String,
    },

    /// Show a contributor's pending version of a page
    #[command(name = "show-fork")]
    ShowFork {
        /// Page to show
        page: String,

        /// Owner of the fork
        owner: String,
    },

    /// List unapproved forks of a page
    #[command(name = "forks")]
    Forks {
        /// Page to list forks of
        page: String,

        /// Print the forks as JSON
        #[arg(long)]
        json: bool,
    },

    /// List revisions of a page
    #[command(
        name = "history",
        long_about = "List revisions of a page, newest first.\n\n\
            Each revision is shown with its offset: 0 is the revision that \
            created the page. Offsets stay stable as the page grows.",
        after_help = "\
WORKFLOW EXAMPLES:
    # The latest revisions
    wikifork history Recipes

    # The revisions before offset 12
    wikifork history Recipes --before 12

    # Full history as JSON
    wikifork history Recipes --all --json"
    )]
    History {
        /// Page to list
        page: String,

        /// Show revisions strictly older than this offset
        #[arg(long, conflicts_with = "all")]
        before: Option<i64>,

        /// Maximum number of revisions
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Show every revision
        #[arg(long)]
        all: bool,

        /// Print the revisions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a revision changed
    #[command(
        name = "diff",
        after_help = "\
WORKFLOW EXAMPLES:
    # Changes made by the first revision
    wikifork diff Recipes 0

    # As HTML for embedding
    wikifork diff Recipes 4 --html"
    )]
    Diff {
        /// Page
        page: String,

        /// Revision offset (0 is the oldest)
        offset: i64,

        /// Render as HTML
        #[arg(long)]
        html: bool,
    },

    /// List pages
    #[command(name = "pages")]
    Pages {
        /// List pages on this branch instead of canonical
        #[arg(long)]
        branch: Option<String>,
    },

    /// Show the resolved configuration
    #[command(name = "config")]
    Config,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
INSTALLATION:
    # Bash
    wikifork completion bash > ~/.local/share/bash-completion/completions/wikifork

    # Zsh
    wikifork completion zsh > ~/.zfunc/_wikifork

    # Fish
    wikifork completion fish > ~/.config/fish/completions/wikifork.fish

    # PowerShell
    wikifork completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
