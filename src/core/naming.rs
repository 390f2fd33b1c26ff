//! core::naming
//!
//! Fork branch naming.
//!
//! Forks are named deterministically from the requester's identity and the
//! page, so the fork manager can find a fork without any lookup table:
//!
//! ```text
//! fork/<identity-slug>-<identity-hash>/<page>
//! ```
//!
//! The slug keeps branch listings readable; the hash (first 8 hex characters
//! of the SHA-256 of the identity) keeps two identities with the same slug
//! apart.

use sha2::{Digest, Sha256};

use crate::core::types::{BranchName, Identity, PageName, TypeError};

/// Namespace under which all fork branches live.
pub const FORK_PREFIX: &str = "fork/";

/// Maximum slug length taken from an identity.
const MAX_SLUG_LEN: usize = 32;

/// Lowercase, hyphen-separated slug of arbitrary text.
///
/// # Example
///
/// ```
/// use wikifork::core::naming::slugify;
///
/// assert_eq!(slugify("Alice Smith"), "alice-smith");
/// assert_eq!(slugify("dr.who_42"), "drwho-42");
/// ```
pub fn slugify(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c == ' ' || c == '_' || c == '-' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(MAX_SLUG_LEN)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}

/// Stable owner key for an identity: `<slug>-<hash8>`.
///
/// # Example
///
/// ```
/// use wikifork::core::naming::owner_key;
/// use wikifork::core::types::Identity;
///
/// let key = owner_key(&Identity::new("alice@example.org").unwrap());
/// assert!(key.starts_with("alice-"));
/// assert_eq!(key.len(), "alice-".len() + 8);
/// ```
pub fn owner_key(identity: &Identity) -> String {
    let digest = Sha256::digest(identity.as_str().as_bytes());
    let hash = hex::encode(&digest[..4]);
    let slug = slugify(identity.display_name());
    let slug = if slug.is_empty() { "user".to_string() } else { slug };
    format!("{slug}-{hash}")
}

/// The fork branch for `(identity, page)`.
pub fn fork_branch(identity: &Identity, page: &PageName) -> Result<BranchName, TypeError> {
    BranchName::new(format!("{FORK_PREFIX}{}/{}", owner_key(identity), page))
}

/// Split a fork branch back into its owner key and page.
///
/// Returns `None` for branches outside the fork namespace.
pub fn parse_fork_branch(branch: &BranchName) -> Option<(&str, PageName)> {
    let rest = branch.as_str().strip_prefix(FORK_PREFIX)?;
    let (owner, page) = rest.split_once('/')?;
    if owner.is_empty() {
        return None;
    }
    Some((owner, PageName::new(page).ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  spaced  out "), "spaced-out");
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_truncates() {
        let long = "a".repeat(100);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn fork_branch_is_deterministic() {
        let page = PageName::new("Home").unwrap();
        let a = fork_branch(&id("alice@example.org"), &page).unwrap();
        let b = fork_branch(&id("alice@example.org"), &page).unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("fork/alice-"));
        assert!(a.as_str().ends_with("/Home"));
    }

    #[test]
    fn colliding_slugs_get_distinct_branches() {
        let page = PageName::new("Home").unwrap();
        let a = fork_branch(&id("a.b@example.org"), &page).unwrap();
        let b = fork_branch(&id("ab@example.org"), &page).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unsluggable_identity_falls_back() {
        let key = owner_key(&id("!!!@example.org"));
        assert!(key.starts_with("user-"));
    }

    #[test]
    fn parse_roundtrip() {
        let page = PageName::new("Clinic-Hours").unwrap();
        let identity = id("carol@example.org");
        let branch = fork_branch(&identity, &page).unwrap();
        let (owner, parsed) = parse_fork_branch(&branch).unwrap();
        assert_eq!(owner, owner_key(&identity));
        assert_eq!(parsed, page);
    }

    #[test]
    fn parse_rejects_non_fork() {
        let branch = BranchName::new("master").unwrap();
        assert!(parse_fork_branch(&branch).is_none());
    }
}
