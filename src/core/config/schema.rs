//! core::config::schema
//!
//! Configuration file schema.
//!
//! The global file and the repository file share one schema: every key is
//! optional, and a key set in the repository file overrides the same key in
//! the global file.
//!
//! # Example
//!
//! ```toml
//! canonical_branch = "master"
//! extension = "md"
//! homepage = "Home"
//! auth_enabled = true
//! forking_enabled = true
//! lock_timeout_ms = 5000
//! templates = ["show", "raw", "clinic"]
//! default_template = "show"
//!
//! [fields.editor]
//! template = "show"
//! owner = ""
//!
//! [fields.open]
//! title = ""
//! tags = ""
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, PageName};

/// One configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Branch holding the authoritative version of every page
    pub canonical_branch: Option<String>,

    /// File extension for page blobs
    pub extension: Option<String>,

    /// Page shown at the wiki root
    pub homepage: Option<String>,

    /// When false, every requester is treated as an editor
    pub auth_enabled: Option<bool>,

    /// When false, non-editors cannot save changes at all
    pub forking_enabled: Option<bool>,

    /// Bounded wait for a page lock
    pub lock_timeout_ms: Option<u64>,

    /// Known page templates
    pub templates: Option<Vec<String>>,

    /// Template used when a page names none or an unknown one
    pub default_template: Option<String>,

    /// Declared metadata fields
    pub fields: Option<FieldsConfig>,
}

/// Declared metadata fields with their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FieldsConfig {
    /// Fields only editors may set
    pub editor: Option<IndexMap<String, String>>,

    /// Fields anyone may set
    pub open: Option<IndexMap<String, String>>,
}

impl ConfigFile {
    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merged_with(self, other: ConfigFile) -> ConfigFile {
        ConfigFile {
            canonical_branch: other.canonical_branch.or(self.canonical_branch),
            extension: other.extension.or(self.extension),
            homepage: other.homepage.or(self.homepage),
            auth_enabled: other.auth_enabled.or(self.auth_enabled),
            forking_enabled: other.forking_enabled.or(self.forking_enabled),
            lock_timeout_ms: other.lock_timeout_ms.or(self.lock_timeout_ms),
            templates: other.templates.or(self.templates),
            default_template: other.default_template.or(self.default_template),
            fields: match (self.fields, other.fields) {
                (Some(base), Some(over)) => Some(FieldsConfig {
                    editor: over.editor.or(base.editor),
                    open: over.open.or(base.open),
                }),
                (base, over) => over.or(base),
            },
        }
    }

    /// Validate the values that are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.canonical_branch {
            BranchName::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("canonical_branch '{}': {}", branch, e))
            })?;
        }

        if let Some(ext) = &self.extension {
            if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::InvalidValue(format!(
                    "extension '{}' must be non-empty and alphanumeric",
                    ext
                )));
            }
        }

        if let Some(home) = &self.homepage {
            PageName::new(home.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("homepage '{}': {}", home, e)))?;
        }

        if self.lock_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "lock_timeout_ms must be positive".to_string(),
            ));
        }

        if let Some(fields) = &self.fields {
            if let (Some(editor), Some(open)) = (&fields.editor, &fields.open) {
                if let Some(shared) = editor.keys().find(|k| open.contains_key(*k)) {
                    return Err(ConfigError::InvalidValue(format!(
                        "field '{}' is both editor-only and open",
                        shared
                    )));
                }
            }
            if let Some(open) = &fields.open {
                if open.contains_key("template") {
                    return Err(ConfigError::InvalidValue(
                        "'template' must be an editor-only field".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
