//! core::page::schema
//!
//! Declared metadata fields and who may set them.
//!
//! Fields come in two disjoint sets: editor-only fields (always including
//! `template`) and open fields that any contributor may set. Keys outside
//! both sets are undeclared: requests cannot set them, but values already
//! stored in a page are carried forward untouched.

use indexmap::IndexMap;

use super::{Metadata, Page, PageError};

/// Field every page carries.
pub const TEMPLATE_FIELD: &str = "template";

/// Template used when a page names none or an unknown one.
pub const DEFAULT_TEMPLATE: &str = "show";

/// Who is asking to change a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Editor,
    Contributor,
}

/// The declared metadata fields with their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    editor: IndexMap<String, String>,
    open: IndexMap<String, String>,
}

impl Default for FieldSchema {
    fn default() -> Self {
        let editor = [(TEMPLATE_FIELD, DEFAULT_TEMPLATE), ("owner", "")];
        let open = [("title", ""), ("tags", "")];
        Self {
            editor: editor
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            open: open
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl FieldSchema {
    /// Build a schema from editor-only and open field defaults.
    ///
    /// # Errors
    ///
    /// [`PageError::Schema`] when the sets overlap or `template` is not an
    /// editor field.
    pub fn new(
        editor: IndexMap<String, String>,
        open: IndexMap<String, String>,
    ) -> Result<Self, PageError> {
        if let Some(shared) = editor.keys().find(|k| open.contains_key(*k)) {
            return Err(PageError::Schema(format!(
                "field '{shared}' is both editor-only and open"
            )));
        }
        if !editor.contains_key(TEMPLATE_FIELD) {
            return Err(PageError::Schema(format!(
                "'{TEMPLATE_FIELD}' must be an editor-only field"
            )));
        }
        Ok(Self { editor, open })
    }

    pub fn is_editor_field(&self, key: &str) -> bool {
        self.editor.contains_key(key)
    }

    pub fn is_open_field(&self, key: &str) -> bool {
        self.open.contains_key(key)
    }

    pub fn is_declared(&self, key: &str) -> bool {
        self.is_editor_field(key) || self.is_open_field(key)
    }

    /// Whether `role` may set `key`.
    pub fn can_set(&self, role: Role, key: &str) -> bool {
        match role {
            Role::Editor => self.is_declared(key),
            Role::Contributor => self.is_open_field(key),
        }
    }

    /// Declared fields with defaults, editor fields first.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.editor
            .iter()
            .chain(self.open.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add every declared field missing from `metadata` with its default.
    pub fn fill_defaults(&self, metadata: &mut Metadata) {
        for (key, default) in self.defaults() {
            if !metadata.contains_key(key) {
                metadata.insert(key.to_string(), default.to_string());
            }
        }
    }

    /// Metadata after `role` requests `requested` on a page that currently
    /// has `current`.
    ///
    /// Requested keys the role may not set are dropped; every current key is
    /// kept unless a permitted request overrides it.
    pub fn apply(&self, role: Role, current: &Metadata, requested: &Metadata) -> Metadata {
        let mut merged = current.clone();
        for (key, value) in requested {
            if self.can_set(role, key) {
                merged.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(field = %key, ?role, "ignoring field the requester may not set");
            }
        }
        self.fill_defaults(&mut merged);
        merged
    }
}

/// The templates a page may name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    known: Vec<String>,
    fallback: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            known: vec![DEFAULT_TEMPLATE.to_string()],
            fallback: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl TemplateSet {
    /// A set of known templates; `fallback` is always included.
    pub fn new(known: impl IntoIterator<Item = String>, fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        let mut known: Vec<String> = known.into_iter().collect();
        if !known.contains(&fallback) {
            known.push(fallback.clone());
        }
        Self { known, fallback }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.known.iter().any(|t| t == name)
    }

    pub fn known(&self) -> &[String] {
        &self.known
    }

    /// The template to render `page` with.
    pub fn select<'a>(&'a self, page: &'a Page) -> &'a str {
        match page.template() {
            Some(name) if self.contains(name) => name,
            _ => &self.fallback,
        }
    }
}
