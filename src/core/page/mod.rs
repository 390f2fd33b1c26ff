//! core::page
//!
//! Page blobs: YAML front matter plus a markdown body.
//!
//! # Format
//!
//! ```text
//! ---
//! template: show
//! title: Clinic hours
//! ---
//! The clinic is open ...
//! ```
//!
//! A blob that does not open with a `---` line, or whose front matter is
//! never closed, is all body. Metadata values are strings; other YAML
//! scalars are read as their text and `null` as the empty string.
//! Serialization always writes front matter, so a page read from a plain
//! blob reaches a fixed point after one write.

pub mod schema;

use indexmap::IndexMap;
use thiserror::Error;

pub use schema::{FieldSchema, Role, TemplateSet};

use crate::core::types::{BranchName, PageName};

/// Ordered page metadata.
pub type Metadata = IndexMap<String, String>;

const DELIMITER: &str = "---";

/// Errors from page parsing and serialization.
#[derive(Debug, Error)]
pub enum PageError {
    /// The blob is not UTF-8 text.
    #[error("page '{0}' is not valid UTF-8")]
    NotUtf8(PageName),

    /// The front matter is not a YAML mapping.
    #[error("invalid front matter in page '{page}': {message}")]
    FrontMatter { page: PageName, message: String },

    /// Metadata could not be written as YAML.
    #[error("cannot serialize metadata: {0}")]
    Serialize(String),

    /// The configured field sets are inconsistent.
    #[error("invalid field schema: {0}")]
    Schema(String),
}

/// One version of a page, as read from a branch.
///
/// Pages are immutable; [`with_content`](Page::with_content) produces the
/// next version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    name: PageName,
    body: String,
    metadata: Metadata,
    branch: BranchName,
}

impl Page {
    /// Build a page, filling declared fields that `metadata` lacks with
    /// their defaults.
    pub fn new(
        name: PageName,
        branch: BranchName,
        body: impl Into<String>,
        mut metadata: Metadata,
        schema: &FieldSchema,
    ) -> Self {
        schema.fill_defaults(&mut metadata);
        Self {
            name,
            body: body.into(),
            metadata,
            branch,
        }
    }

    /// An empty page carrying only default metadata.
    pub fn empty(name: PageName, branch: BranchName, schema: &FieldSchema) -> Self {
        Self::new(name, branch, String::new(), Metadata::new(), schema)
    }

    /// Parse a stored blob.
    ///
    /// # Errors
    ///
    /// - [`PageError::NotUtf8`] for binary content
    /// - [`PageError::FrontMatter`] if the front matter is not a mapping
    pub fn parse(
        blob: &[u8],
        name: PageName,
        branch: BranchName,
        schema: &FieldSchema,
    ) -> Result<Self, PageError> {
        let text = std::str::from_utf8(blob).map_err(|_| PageError::NotUtf8(name.clone()))?;

        let (metadata, body) = match split_front_matter(text) {
            Some((yaml, body)) => (parse_metadata(yaml, &name)?, body),
            None => (Metadata::new(), text),
        };

        Ok(Self::new(name, branch, body, metadata, schema))
    }

    /// Encode the page as a blob: front matter, then the body.
    pub fn serialize(&self) -> Result<Vec<u8>, PageError> {
        let yaml = if self.metadata.is_empty() {
            String::new()
        } else {
            serde_yaml_ng::to_string(&self.metadata)
                .map_err(|e| PageError::Serialize(e.to_string()))?
        };

        let mut out = String::with_capacity(yaml.len() + self.body.len() + 8);
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&yaml);
        if !yaml.is_empty() && !yaml.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&self.body);
        Ok(out.into_bytes())
    }

    /// The next version of this page with a new body and metadata.
    ///
    /// The metadata is taken as given; declared fields it lacks get their
    /// defaults.
    pub fn with_content(
        &self,
        body: impl Into<String>,
        metadata: Metadata,
        schema: &FieldSchema,
    ) -> Self {
        Self::new(self.name.clone(), self.branch.clone(), body, metadata, schema)
    }

    pub fn name(&self) -> &PageName {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// A metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The template named in the metadata.
    pub fn template(&self) -> Option<&str> {
        self.get("template")
    }
}

/// Split `---\n<yaml>---\n<body>` into its YAML and body parts.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_metadata(yaml: &str, page: &PageName) -> Result<Metadata, PageError> {
    let value: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(yaml).map_err(|e| PageError::FrontMatter {
            page: page.clone(),
            message: e.to_string(),
        })?;

    let mapping = match value {
        serde_yaml_ng::Value::Null => return Ok(Metadata::new()),
        serde_yaml_ng::Value::Mapping(mapping) => mapping,
        _ => {
            return Err(PageError::FrontMatter {
                page: page.clone(),
                message: "front matter must be a mapping".to_string(),
            })
        }
    };

    let mut metadata = Metadata::with_capacity(mapping.len());
    for (key, value) in mapping {
        let key = scalar_text(&key).ok_or_else(|| PageError::FrontMatter {
            page: page.clone(),
            message: "metadata keys must be scalars".to_string(),
        })?;
        let value = match scalar_text(&value) {
            Some(text) => text,
            None => serde_yaml_ng::to_string(&value)
                .map_err(|e| PageError::Serialize(e.to_string()))?
                .trim_end()
                .to_string(),
        };
        metadata.insert(key, value);
    }
    Ok(metadata)
}

fn scalar_text(value: &serde_yaml_ng::Value) -> Option<String> {
    match value {
        serde_yaml_ng::Value::Null => Some(String::new()),
        serde_yaml_ng::Value::Bool(b) => Some(b.to_string()),
        serde_yaml_ng::Value::Number(n) => Some(n.to_string()),
        serde_yaml_ng::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> PageName {
        PageName::new("Home").unwrap()
    }

    fn master() -> BranchName {
        BranchName::new("master").unwrap()
    }

    fn parse(text: &str) -> Page {
        Page::parse(text.as_bytes(), name(), master(), &FieldSchema::default()).unwrap()
    }

    #[test]
    fn front_matter_and_body() {
        let page = parse("---\ntitle: Hours\ncolor: blue\n---\nOpen daily.\n");
        assert_eq!(page.body(), "Open daily.\n");
        assert_eq!(page.get("title"), Some("Hours"));
        assert_eq!(page.get("color"), Some("blue"));
        assert_eq!(page.template(), Some("show"));
    }

    #[test]
    fn unknown_keys_keep_order() {
        let page = parse("---\nzeta: 1\nalpha: 2\n---\n");
        let keys: Vec<_> = page.metadata().keys().map(String::as_str).collect();
        assert_eq!(&keys[..2], &["zeta", "alpha"]);
    }

    #[test]
    fn no_front_matter_is_all_body() {
        let page = parse("just text\n---\nmore\n");
        assert_eq!(page.body(), "just text\n---\nmore\n");
        assert_eq!(page.template(), Some("show"));
    }

    #[test]
    fn unclosed_front_matter_is_all_body() {
        let page = parse("---\ntitle: x\n");
        assert_eq!(page.body(), "---\ntitle: x\n");
    }

    #[test]
    fn empty_front_matter() {
        let page = parse("---\n---\nbody");
        assert_eq!(page.body(), "body");
        assert_eq!(page.get("owner"), Some(""));
    }

    #[test]
    fn scalars_become_strings() {
        let page = parse("---\ncount: 3\nflag: true\nnothing:\n---\n");
        assert_eq!(page.get("count"), Some("3"));
        assert_eq!(page.get("flag"), Some("true"));
        assert_eq!(page.get("nothing"), Some(""));
    }

    #[test]
    fn non_mapping_front_matter_rejected() {
        let result = Page::parse(
            b"---\n- a\n- b\n---\n",
            name(),
            master(),
            &FieldSchema::default(),
        );
        assert!(matches!(result, Err(PageError::FrontMatter { .. })));
    }

    #[test]
    fn binary_rejected() {
        let result = Page::parse(&[0xff, 0xfe], name(), master(), &FieldSchema::default());
        assert!(matches!(result, Err(PageError::NotUtf8(_))));
    }

    #[test]
    fn serialize_reparses_to_same_page() {
        let page = parse("---\ntitle: 'yes'\nflag: 'true'\n---\n# Heading\n\n---\nrule above\n");
        let blob = page.serialize().unwrap();
        let again = Page::parse(&blob, name(), master(), &FieldSchema::default()).unwrap();
        assert_eq!(again, page);
        assert_eq!(again.serialize().unwrap(), blob);
    }

    #[test]
    fn plain_blob_reaches_fixed_point() {
        let page = parse("plain body");
        let once = page.serialize().unwrap();
        let twice = Page::parse(&once, name(), master(), &FieldSchema::default())
            .unwrap()
            .serialize()
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn with_content_is_new_value() {
        let page = parse("---\ntitle: a\n---\nold");
        let mut meta = page.metadata().clone();
        meta.insert("title".into(), "b".into());
        let next = page.with_content("new", meta, &FieldSchema::default());
        assert_eq!(page.body(), "old");
        assert_eq!(next.body(), "new");
        assert_eq!(next.get("title"), Some("b"));
        assert_eq!(next.branch(), page.branch());
    }
}
