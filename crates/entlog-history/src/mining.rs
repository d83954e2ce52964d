//! Commit range and per-commit changes via git2.

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use entlog_core::EntlogError;
use git2::{Commit, DiffFindOptions, DiffOptions, Oid, Repository, Sort};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::status::FileChange;

/// Author-side metadata of one commit.
///
/// # Examples
///
/// ```
/// use entlog_history::mining::CommitMeta;
///
/// let meta = CommitMeta {
///     id: "9f1c2e4".into(),
///     author: "Jane Doe".into(),
///     email: "jane@example.com".into(),
///     date: "2018-03-01".into(),
///     merge: false,
/// };
/// assert_eq!(meta.header(), "2018-03-01  Jane Doe  <jane@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMeta {
    /// Full hex commit id.
    pub id: String,
    pub author: String,
    pub email: String,
    /// Author date as `YYYY-MM-DD` in the author's own offset.
    pub date: String,
    /// More than one parent.
    pub merge: bool,
}

impl CommitMeta {
    /// Read metadata from a commit object.
    pub fn from_commit(commit: &Commit<'_>) -> Self {
        let author = commit.author();
        Self {
            id: commit.id().to_string(),
            author: author.name().unwrap_or("unknown").to_string(),
            email: author.email().unwrap_or("unknown").to_string(),
            date: short_date(author.when()),
            merge: commit.parent_count() > 1,
        }
    }

    /// ChangeLog entry header line.
    pub fn header(&self) -> String {
        format!("{}  {}  <{}>", self.date, self.author, self.email)
    }
}

fn short_date(time: git2::Time) -> String {
    let utc = DateTime::<Utc>::from_timestamp(time.seconds(), 0).unwrap_or_default();
    match FixedOffset::east_opt(time.offset_minutes() * 60) {
        Some(offset) => utc.with_timezone(&offset).format("%Y-%m-%d").to_string(),
        None => utc.format("%Y-%m-%d").to_string(),
    }
}

/// Open the repository at `path`.
///
/// # Errors
///
/// [`EntlogError::Git`] if `path` is not inside a repository.
pub fn open_repo(path: &Path) -> Result<Repository, EntlogError> {
    Repository::open(path)
        .map_err(|e| EntlogError::Git(format!("failed to open repository: {e}")))
}

/// Commits reachable from `to` but not from `from`, newest first.
///
/// # Errors
///
/// [`EntlogError::Git`] if either revision does not resolve to a commit or
/// the walk fails.
pub fn list_commits(repo: &Repository, from: &str, to: &str) -> Result<Vec<Oid>, EntlogError> {
    let from_id = resolve_commit(repo, from)?;
    let to_id = resolve_commit(repo, to)?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| EntlogError::Git(format!("failed to create revwalk: {e}")))?;
    revwalk.set_sorting(Sort::TIME).ok();
    revwalk
        .push(to_id)
        .map_err(|e| EntlogError::Git(format!("failed to push {to}: {e}")))?;
    revwalk
        .hide(from_id)
        .map_err(|e| EntlogError::Git(format!("failed to hide {from}: {e}")))?;

    let commits = revwalk
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EntlogError::Git(format!("revwalk error: {e}")))?;
    debug!(count = commits.len(), range = %format!("{from}..{to}"), "listed commits");
    Ok(commits)
}

fn resolve_commit(repo: &Repository, rev: &str) -> Result<Oid, EntlogError> {
    repo.revparse_single(rev)
        .and_then(|object| object.peel_to_commit())
        .map(|commit| commit.id())
        .map_err(|e| EntlogError::Git(format!("failed to resolve revision '{rev}': {e}")))
}

/// Find a commit by id.
///
/// # Errors
///
/// [`EntlogError::Git`] if the id is not a commit in `repo`.
pub fn find_commit(repo: &Repository, id: Oid) -> Result<Commit<'_>, EntlogError> {
    repo.find_commit(id)
        .map_err(|e| EntlogError::Git(format!("failed to find commit {id}: {e}")))
}

/// Paths changed by `commit` relative to its first parent, with renames and
/// copies detected.
///
/// A root commit is compared against the empty tree.
///
/// # Errors
///
/// [`EntlogError::Git`] on repository access failures and
/// [`EntlogError::UnknownStatus`] for an unexpected delta.
pub fn commit_changes(
    repo: &Repository,
    commit: &Commit<'_>,
) -> Result<Vec<FileChange>, EntlogError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| EntlogError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| EntlogError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| EntlogError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), Some(&mut diff_opts))
        .map_err(|e| EntlogError::Git(format!("failed to compute diff: {e}")))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true).copies(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| EntlogError::Git(format!("failed to find renames: {e}")))?;

    let id = commit.id().to_string();
    diff.deltas()
        .map(|delta| FileChange::from_delta(&delta, &id))
        .collect()
}

/// Raw content of a blob.
///
/// # Errors
///
/// [`EntlogError::Git`] if `id` is not a blob in `repo`.
pub fn read_blob(repo: &Repository, id: Oid) -> Result<Vec<u8>, EntlogError> {
    let blob = repo
        .find_blob(id)
        .map_err(|e| EntlogError::Git(format!("failed to read blob {id}: {e}")))?;
    Ok(blob.content().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_uses_author_offset() {
        // 2018-03-01T23:30:00Z
        let seconds = 1_519_947_000;
        assert_eq!(short_date(git2::Time::new(seconds, 0)), "2018-03-01");
        assert_eq!(short_date(git2::Time::new(seconds, 60)), "2018-03-02");
        assert_eq!(short_date(git2::Time::new(seconds, -300)), "2018-03-01");
    }

    #[test]
    fn header_has_two_space_separators() {
        let meta = CommitMeta {
            id: "abc".into(),
            author: "A U Thor".into(),
            email: "author@example.com".into(),
            date: "2018-03-01".into(),
            merge: false,
        };
        assert_eq!(meta.header(), "2018-03-01  A U Thor  <author@example.com>");
    }

    #[test]
    fn opening_a_non_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_repo(dir.path());
        assert!(matches!(result, Err(EntlogError::Git(_))));
    }
}
