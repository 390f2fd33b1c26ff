//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`PageName`] - Validated, path-safe wiki page identifier
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Validated Git reference name
//! - [`Identity`] - A requester identity (usually an email address)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a page name that reached the revision store
//! is already known to be safe to use as a storage path.
//!
//! # Examples
//!
//! ```
//! use wikifork::core::types::{BranchName, Oid, PageName, RefName};
//!
//! let page = PageName::new("Clinic-Hours").unwrap();
//! assert_eq!(page.storage_path("md"), "Clinic-Hours.md");
//!
//! let branch = BranchName::new("master").unwrap();
//! assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/master");
//!
//! assert!(PageName::new("../etc/passwd").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid page name: {0}")]
    InvalidPageName(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}

/// Maximum length of a page name, in bytes.
pub const MAX_PAGE_NAME_LEN: usize = 128;

/// A validated wiki page name.
///
/// Page names double as file names in the repository, so they are limited
/// to ASCII letters, digits, `-`, `_` and non-leading `.` characters, and
/// may never contain `..`.
///
/// # Example
///
/// ```
/// use wikifork::core::types::PageName;
///
/// assert!(PageName::new("Home").is_ok());
/// assert!(PageName::new("v1.2_notes").is_ok());
/// assert!(PageName::new("").is_err());
/// assert!(PageName::new(".hidden").is_err());
/// assert!(PageName::new("v1.").is_err());
/// assert!(PageName::new("a/b").is_err());
/// assert!(PageName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageName(String);

impl PageName {
    /// Create a new validated page name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPageName` if the name is not path-safe.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidPageName(
                "page name cannot be empty".into(),
            ));
        }
        if name.len() > MAX_PAGE_NAME_LEN {
            return Err(TypeError::InvalidPageName(format!(
                "page name cannot exceed {MAX_PAGE_NAME_LEN} characters"
            )));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidPageName(
                "page name cannot start with '.'".into(),
            ));
        }
        if name.contains("..") {
            return Err(TypeError::InvalidPageName(
                "page name cannot contain '..'".into(),
            ));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(TypeError::InvalidPageName(format!(
                "page name cannot contain {c:?}"
            )));
        }
        if name.ends_with('.') {
            return Err(TypeError::InvalidPageName(
                "page name cannot end with '.'".into(),
            ));
        }
        if name.ends_with(".lock") {
            return Err(TypeError::InvalidPageName(
                "page name cannot end with '.lock'".into(),
            ));
        }
        Ok(())
    }

    /// The repository path that stores this page.
    pub fn storage_path(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }

    /// Recover a page name from a repository path with the given extension.
    ///
    /// Returns `None` for paths that do not belong to a page.
    pub fn from_storage_path(path: &str, extension: &str) -> Option<Self> {
        let stem = path.strip_suffix(extension)?.strip_suffix('.')?;
        Self::new(stem).ok()
    }

    /// Get the page name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PageName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PageName> for String {
    fn from(name: PageName) -> Self {
        name.0
    }
}

impl AsRef<str> for PageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check the parts of `git check-ref-format` shared by branch and ref names.
///
/// `what` names the kind of value in error messages ("branch name", "ref name").
fn check_refname_rules(name: &str, what: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if name.ends_with('/') {
        return Err(format!("{what} cannot end with '/'"));
    }
    if name.ends_with('.') {
        return Err(format!("{what} cannot end with '.'"));
    }
    for bad in ["..", "@{", "//"] {
        if name.contains(bad) {
            return Err(format!("{what} cannot contain '{bad}'"));
        }
    }
    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(format!("{what} cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err(format!("{what} cannot contain control characters"));
    }
    for component in name.split('/').filter(|c| !c.is_empty()) {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }
    Ok(())
}

/// A validated Git branch name.
///
/// Branch names follow Git's refname rules. The canonical branch and every
/// fork branch are represented with this type.
///
/// # Example
///
/// ```
/// use wikifork::core::types::BranchName;
///
/// let name = BranchName::new("fork/alice-1a2b3c4d/Home").unwrap();
/// assert_eq!(name.as_str(), "fork/alice-1a2b3c4d/Home");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("-leading-dash").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_refname_rules(&name, "branch name").map_err(TypeError::InvalidBranchName)?;
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// Revision ids handed out by the revision store and persisted in the
/// commit index are `Oid`s. They are normalized to lowercase.
///
/// # Example
///
/// ```
/// use wikifork::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if shorter.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// # Example
///
/// ```
/// use wikifork::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("fork/bob-0badf00d/Home").unwrap();
/// let refname = RefName::for_branch(&branch);
/// assert_eq!(refname.as_str(), "refs/heads/fork/bob-0badf00d/Home");
/// assert_eq!(refname.strip_prefix("refs/heads/"), Some("fork/bob-0badf00d/Home"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Prefix of every local branch ref.
    pub const HEADS_PREFIX: &'static str = "refs/heads/";

    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.starts_with('/') {
            return Err(TypeError::InvalidRefName(
                "ref name cannot start with '/'".into(),
            ));
        }
        check_refname_rules(&name, "ref name").map_err(TypeError::InvalidRefName)?;
        Ok(Self(name))
    }

    /// Create a ref name for a branch (`refs/heads/<branch>`).
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("{}{}", Self::HEADS_PREFIX, branch.as_str()))
    }

    /// Strip a prefix from the ref name and return the remainder.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a requester, as reported by the identity provider.
///
/// Usually an email address. Identities become commit authors and are the
/// input to fork branch naming.
///
/// # Example
///
/// ```
/// use wikifork::core::types::Identity;
///
/// let id = Identity::new("  alice@example.org ").unwrap();
/// assert_eq!(id.as_str(), "alice@example.org");
/// assert_eq!(id.display_name(), "alice");
/// assert!(Identity::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Create a new identity, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidIdentity` for empty identities or ones
    /// containing control characters or angle brackets.
    pub fn new(identity: impl Into<String>) -> Result<Self, TypeError> {
        let identity = identity.into().trim().to_string();
        if identity.is_empty() {
            return Err(TypeError::InvalidIdentity(
                "identity cannot be empty".into(),
            ));
        }
        if identity
            .chars()
            .any(|c| c.is_control() || c == '<' || c == '>')
        {
            return Err(TypeError::InvalidIdentity(
                "identity cannot contain control characters or angle brackets".into(),
            ));
        }
        Ok(Self(identity))
    }

    /// Name used for commit signatures: the local part of an email, or the
    /// whole identity.
    pub fn display_name(&self) -> &str {
        match self.0.split_once('@') {
            Some((local, _)) if !local.is_empty() => local,
            _ => &self.0,
        }
    }

    /// Email used for commit signatures.
    pub fn email(&self) -> String {
        if self.0.contains('@') {
            self.0.clone()
        } else {
            format!("{}@wikifork.invalid", self.0)
        }
    }

    /// Get the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod page_name {
        use super::*;

        #[test]
        fn accepts_path_safe_names() {
            for name in ["Home", "clinic-hours", "v1.2", "A_b-C.d", "x"] {
                assert!(PageName::new(name).is_ok(), "{name} should be valid");
            }
        }

        #[test]
        fn rejects_traversal_and_separators() {
            for name in ["..", "a..b", "../x", "a/b", "a\\b", ".git", "x.lock", "v1.", "a."] {
                assert!(PageName::new(name).is_err(), "{name} should be invalid");
            }
        }

        #[test]
        fn rejects_overlong_names() {
            let name = "a".repeat(MAX_PAGE_NAME_LEN + 1);
            assert!(PageName::new(name).is_err());
            let name = "a".repeat(MAX_PAGE_NAME_LEN);
            assert!(PageName::new(name).is_ok());
        }

        #[test]
        fn storage_path_roundtrip() {
            let page = PageName::new("Home").unwrap();
            let path = page.storage_path("md");
            assert_eq!(path, "Home.md");
            assert_eq!(PageName::from_storage_path(&path, "md"), Some(page));
        }

        #[test]
        fn from_storage_path_ignores_other_files() {
            assert_eq!(PageName::from_storage_path("README.txt", "md"), None);
            assert_eq!(PageName::from_storage_path("md", "md"), None);
        }

        #[test]
        fn every_valid_name_makes_a_valid_fork_branch() {
            for name in ["v1.2", "A_b-C.d", "x", "a.b.c"] {
                let branch = format!("fork/alice-7a64adf2/{name}");
                assert!(BranchName::new(branch).is_ok(), "{name} should branch");
            }
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<PageName, _> = serde_json::from_str("\"a/b\"");
            assert!(parsed.is_err());
        }
    }

    mod branch_name {
        use super::*;

        #[test]
        fn valid_names() {
            assert!(BranchName::new("master").is_ok());
            assert!(BranchName::new("fork/alice-12345678/Home").is_ok());
        }

        #[test]
        fn invalid_names() {
            for name in ["", "@", "-x", "a..b", "a//b", "a/", "a b", "a~b", ".a", "a/.b", "a.lock", "a.", "fork/x-1/v1."] {
                assert!(BranchName::new(name).is_err(), "{name:?} should be invalid");
            }
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn normalizes_case() {
            let oid = Oid::new("ABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
            assert_eq!(oid.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
        }

        #[test]
        fn rejects_bad_length_and_chars() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("g".repeat(40)).is_err());
            assert!(Oid::new("a".repeat(64)).is_ok());
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn email_identity() {
            let id = Identity::new("bob@clinic.org").unwrap();
            assert_eq!(id.display_name(), "bob");
            assert_eq!(id.email(), "bob@clinic.org");
        }

        #[test]
        fn plain_identity_gets_placeholder_email() {
            let id = Identity::new("bob").unwrap();
            assert_eq!(id.display_name(), "bob");
            assert_eq!(id.email(), "bob@wikifork.invalid");
        }

        #[test]
        fn rejects_angle_brackets() {
            assert!(Identity::new("Bob <bob@x.org>").is_err());
        }
    }
}
