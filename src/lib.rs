//! wikifork - git-backed page versioning for wikis
//!
//! Every page lives as one file in a git repository. Editors write the
//! canonical branch directly; other contributors write a personal fork of
//! the page, which an editor later approves by merging it. A per-page commit
//! index gives every revision a stable oldest-first offset for history
//! views and diffs.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line front end (parses args, calls the wiki service)
//! - [`wiki`] - Service entry points: forks, promotion, history, diffs
//! - [`core`] - Domain types, configuration, pages, revisions, index, locks
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - Terminal output
//!
//! # Invariants
//!
//! 1. Canonical changes only through editor writes or fork promotion
//! 2. Every write to a (page, branch) pair happens under its lock
//! 3. A page's index lists exactly the commits that changed it, oldest first
//! 4. A failed merge changes nothing

pub mod cli;
pub mod core;
pub mod git;
pub mod ui;
pub mod wiki;
