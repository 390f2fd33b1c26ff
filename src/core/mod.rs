//! core
//!
//! Core domain types, storage and schemas for wikifork.
//!
//! # Modules
//!
//! - [`types`] - Strong types: PageName, BranchName, Oid, Identity, etc.
//! - [`naming`] - Fork branch naming
//! - [`paths`] - Centralized path routing for wikifork storage
//! - [`ops`] - (page, branch) locking
//! - [`revisions`] - Page revisions as commits on branches
//! - [`index`] - Per-page commit index cache
//! - [`page`] - Page parsing, serialization and field policy
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - The commit graph is the source of truth; everything else is a cache

pub mod config;
pub mod index;
pub mod naming;
pub mod ops;
pub mod page;
pub mod paths;
pub mod revisions;
pub mod types;
