//! git::log
//!
//! Lazy per-path history walk.
//!
//! [`PathLog`] follows first parents only, so a merge commit contributes its
//! own change to the path and the commits that arrived through its second
//! parent stay out of the listing. This keeps the branch's own revision
//! numbering stable when forks are merged into it.

use std::path::PathBuf;

use super::interface::GitError;
use crate::core::types::Oid;

/// Iterator over the commits that changed one path, newest first.
///
/// A commit counts when the blob at the path differs from its first
/// parent's (present vs absent included); a root commit counts when the path
/// exists in its tree. With [`marked_by`](Self::marked_by), a commit that
/// keeps the blob unchanged also counts when the last line of its message is
/// the marker.
pub struct PathLog<'repo> {
    repo: &'repo git2::Repository,
    walk: git2::Revwalk<'repo>,
    path: PathBuf,
    marker: Option<String>,
    skip: usize,
    remaining: Option<usize>,
}

impl<'repo> PathLog<'repo> {
    pub(super) fn new(
        repo: &'repo git2::Repository,
        start: git2::Oid,
        path: &str,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Self, GitError> {
        let mut walk = repo.revwalk()?;
        // The first-parent chain is linear, so insertion order is already
        // child before parent.
        walk.set_sorting(git2::Sort::NONE)?;
        walk.simplify_first_parent()?;
        walk.push(start)
            .map_err(|e| GitError::from_git2(e, &start.to_string()))?;

        Ok(Self {
            repo,
            walk,
            path: PathBuf::from(path),
            marker: None,
            skip,
            remaining: limit,
        })
    }

    /// Also count commits whose message ends with the line `marker`.
    pub fn marked_by(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    fn touches(&self, oid: git2::Oid) -> Result<bool, git2::Error> {
        let commit = self.repo.find_commit(oid)?;
        let current = entry_id(&commit.tree()?, &self.path)?;
        let previous = if commit.parent_count() == 0 {
            None
        } else {
            entry_id(&commit.parent(0)?.tree()?, &self.path)?
        };
        if current != previous {
            return Ok(true);
        }
        Ok(current.is_some()
            && self
                .marker
                .as_deref()
                .is_some_and(|marker| last_line(commit.message_bytes()) == marker.as_bytes()))
    }

    fn stop(&mut self, err: GitError) -> Option<Result<Oid, GitError>> {
        self.remaining = Some(0);
        Some(Err(err))
    }
}

fn entry_id(tree: &git2::Tree<'_>, path: &std::path::Path) -> Result<Option<git2::Oid>, git2::Error> {
    match tree.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn last_line(message: &[u8]) -> &[u8] {
    let trimmed = message.trim_ascii_end();
    match trimmed.iter().rposition(|&b| b == b'\n') {
        Some(i) => trimmed[i + 1..].trim_ascii(),
        None => trimmed.trim_ascii(),
    }
}

impl Iterator for PathLog<'_> {
    type Item = Result<Oid, GitError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }

        loop {
            let oid = match self.walk.next()? {
                Ok(oid) => oid,
                Err(e) => return self.stop(GitError::from_git2(e, "revwalk")),
            };

            match self.touches(oid) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => return self.stop(GitError::from_git2(e, &oid.to_string())),
            }

            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }

            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(Oid::new(oid.to_string()).map_err(GitError::from));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::git::{CommitAuthor, Git};
    use crate::core::types::Oid;
    use tempfile::TempDir;

    fn author() -> CommitAuthor {
        CommitAuthor::new("Tester", "tester@example.org")
    }

    fn commit(git: &Git, parent: &Oid, path: &str, body: &str) -> Oid {
        git.commit_with_path(Some(parent), &[parent.clone()], path, body.as_bytes(), &author(), path)
            .unwrap()
    }

    fn collect(git: &Git, head: &Oid, path: &str, limit: Option<usize>, skip: usize) -> Vec<Oid> {
        git.path_log(head, path, limit, skip)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn only_commits_touching_path() {
        let dir = TempDir::new().unwrap();
        let git = Git::init_bare(dir.path()).unwrap();
        let root = git.commit_empty_root(&author(), "root").unwrap();
        let a1 = commit(&git, &root, "A.md", "one");
        let b1 = commit(&git, &a1, "B.md", "one");
        let a2 = commit(&git, &b1, "A.md", "two");

        assert_eq!(collect(&git, &a2, "A.md", None, 0), vec![a2.clone(), a1.clone()]);
        assert_eq!(collect(&git, &a2, "B.md", None, 0), vec![b1]);
        assert!(collect(&git, &a2, "C.md", None, 0).is_empty());
    }

    #[test]
    fn skip_and_limit() {
        let dir = TempDir::new().unwrap();
        let git = Git::init_bare(dir.path()).unwrap();
        let root = git.commit_empty_root(&author(), "root").unwrap();
        let c1 = commit(&git, &root, "A.md", "1");
        let c2 = commit(&git, &c1, "A.md", "2");
        let c3 = commit(&git, &c2, "A.md", "3");

        assert_eq!(collect(&git, &c3, "A.md", Some(2), 0), vec![c3.clone(), c2.clone()]);
        assert_eq!(collect(&git, &c3, "A.md", Some(5), 1), vec![c2, c1]);
        assert!(collect(&git, &c3, "A.md", Some(0), 0).is_empty());
    }

    #[test]
    fn unchanged_blob_counts_only_when_marked() {
        let dir = TempDir::new().unwrap();
        let git = Git::init_bare(dir.path()).unwrap();
        let root = git.commit_empty_root(&author(), "root").unwrap();
        let c1 = commit(&git, &root, "A.md", "same");
        let c2 = git
            .commit_with_path(Some(&c1), &[c1.clone()], "A.md", b"same", &author(), "Approve x\n\nA\n")
            .unwrap();
        let c3 = git
            .commit_with_path(Some(&c2), &[c2.clone()], "A.md", b"same", &author(), "B")
            .unwrap();

        let marked: Vec<Oid> = git
            .path_log(&c3, "A.md", None, 0)
            .unwrap()
            .marked_by("A")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(marked, vec![c2, c1.clone()]);
        assert_eq!(collect(&git, &c3, "A.md", None, 0), vec![c1]);
    }

    #[test]
    fn merge_counts_once_on_first_parent_chain() {
        let dir = TempDir::new().unwrap();
        let git = Git::init_bare(dir.path()).unwrap();
        let root = git.commit_empty_root(&author(), "root").unwrap();
        let base = commit(&git, &root, "A.md", "base");
        let side = commit(&git, &base, "A.md", "side");
        let main = commit(&git, &base, "B.md", "main");

        let tree = match git.merge_trees(&main, &side).unwrap() {
            crate::git::TreeMerge::Clean(tree) => tree,
            other => panic!("unexpected {:?}", other),
        };
        let merge = git
            .commit_tree(&tree, &[main.clone(), side.clone()], &author(), "merge")
            .unwrap();

        assert_eq!(collect(&git, &merge, "A.md", None, 0), vec![merge, base]);
    }
}
