//! ui
//!
//! Terminal output for the command-line front end.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All command output goes through this module so quiet and debug modes
//! behave the same everywhere.

pub mod output;
