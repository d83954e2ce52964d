//! ChangeLog entries for a commit range.
//!
//! [`ChangelogBuilder`] walks `from..to`, classifies each changed path and,
//! for modified C sources, runs the entity diff. The result renders as GNU
//! ChangeLog text (`Display`), Markdown or JSON.

use std::fmt;

use entlog_core::{Encoding, EntlogConfig, EntlogError};
use entlog_cparse::{diff_sources, ChangeRecord};
use git2::{Oid, Repository};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decode::decode_blob;
use crate::filter::PathFilter;
use crate::mining::{commit_changes, find_commit, list_commits, read_blob, CommitMeta};
use crate::status::{ChangeStatus, FileChange};

/// One changed path and the entities that changed in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    pub status: ChangeStatus,
    pub changes: Vec<ChangeRecord>,
}

impl FileEntry {
    /// An entry with no entity records yet.
    pub fn from_change(change: &FileChange) -> Self {
        Self {
            path: change.path.clone(),
            status: change.status.clone(),
            changes: Vec::new(),
        }
    }

    /// The `* path: ...` lines, without indentation.
    ///
    /// A rename takes two lines; an unmerged path takes none.
    ///
    /// # Examples
    ///
    /// ```
    /// use entlog_history::changelog::FileEntry;
    /// use entlog_history::status::ChangeStatus;
    ///
    /// let entry = FileEntry {
    ///     path: "new.c".into(),
    ///     status: ChangeStatus::Renamed { from: "old.c".into(), similarity: Some(100) },
    ///     changes: vec![],
    /// };
    /// assert_eq!(entry.header_lines(), vec!["* old.c: Move to...", "* new.c: ... here."]);
    /// ```
    pub fn header_lines(&self) -> Vec<String> {
        let path = &self.path;
        match &self.status {
            ChangeStatus::Added => vec![format!("* {path}: New file.")],
            ChangeStatus::Deleted => vec![format!("* {path}: Delete file.")],
            ChangeStatus::Modified => vec![format!("* {path}: Modified.")],
            ChangeStatus::Renamed { from, .. } | ChangeStatus::Copied { from, .. } => vec![
                format!("* {from}: Move to..."),
                format!("* {path}: ... here."),
            ],
            ChangeStatus::ModeChanged { old_mode, new_mode } => vec![format!(
                "* {path}: Changed file permission bits from {old_mode} to {new_mode}"
            )],
            ChangeStatus::Unmerged => Vec::new(),
        }
    }

    /// Markdown bullet text; `None` for an unmerged path, as in the text form.
    fn markdown_line(&self) -> Option<String> {
        let path = &self.path;
        let line = match &self.status {
            ChangeStatus::Added => format!("`{path}`: New file."),
            ChangeStatus::Deleted => format!("`{path}`: Delete file."),
            ChangeStatus::Modified => format!("`{path}`: Modified."),
            ChangeStatus::Renamed { from, .. } => format!("`{from}`: Move to `{path}`."),
            ChangeStatus::Copied { from, .. } => format!("`{from}`: Copy to `{path}`."),
            ChangeStatus::ModeChanged { old_mode, new_mode } => format!(
                "`{path}`: Changed file permission bits from {old_mode} to {new_mode}"
            ),
            ChangeStatus::Unmerged => return None,
        };
        Some(line)
    }
}

/// Everything logged for one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEntry {
    pub meta: CommitMeta,
    /// Empty for merge commits.
    pub files: Vec<FileEntry>,
}

impl fmt::Display for CommitEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", self.meta.header())?;

        if self.meta.merge {
            return writeln!(f, "\t MERGE COMMIT: {}\n", self.meta.id);
        }

        writeln!(f, "\tCOMMIT: {}", self.meta.id)?;
        for file in &self.files {
            for line in file.header_lines() {
                writeln!(f, "\t{line}")?;
            }
            for record in &file.changes {
                writeln!(f, "\t{record}")?;
            }
        }
        writeln!(f)
    }
}

/// Entries for a whole commit range, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changelog {
    pub commits: Vec<CommitEntry>,
}

impl fmt::Display for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for commit in &self.commits {
            write!(f, "{commit}")?;
        }
        Ok(())
    }
}

impl Changelog {
    /// Render as Markdown: a section per commit, a bullet per file and a
    /// nested bullet per entity.
    ///
    /// # Examples
    ///
    /// ```
    /// use entlog_history::changelog::Changelog;
    ///
    /// let md = Changelog::default().to_markdown();
    /// assert!(md.contains("# ChangeLog"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# ChangeLog\n\n");

        if self.commits.is_empty() {
            out.push_str("No changes.\n");
            return out;
        }

        for commit in &self.commits {
            out.push_str(&format!("## {}\n\n", commit.meta.header()));
            if commit.meta.merge {
                out.push_str(&format!("Merge commit `{}`\n\n", commit.meta.id));
                continue;
            }
            out.push_str(&format!("Commit `{}`\n\n", commit.meta.id));
            for file in &commit.files {
                let Some(line) = file.markdown_line() else {
                    continue;
                };
                out.push_str(&format!("- {line}\n"));
                for record in &file.changes {
                    out.push_str(&format!("  - `{record}`\n"));
                }
            }
            out.push('\n');
        }
        out
    }

    /// Render as pretty-printed JSON with camelCase keys.
    ///
    /// # Errors
    ///
    /// [`EntlogError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String, EntlogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds [`Changelog`]s from a repository.
pub struct ChangelogBuilder<'r> {
    repo: &'r Repository,
    filter: PathFilter,
    encodings: Vec<Encoding>,
}

impl<'r> ChangelogBuilder<'r> {
    pub fn new(repo: &'r Repository, config: &EntlogConfig) -> Self {
        Self {
            repo,
            filter: PathFilter::from_config(&config.sources),
            encodings: config.decode.encodings.clone(),
        }
    }

    /// Entries for every commit in `from..to`.
    ///
    /// # Errors
    ///
    /// Git access failures and unknown change statuses abort the run.
    /// Undecodable files do not: they keep their header line and lose only
    /// their entity records.
    pub fn build(&self, from: &str, to: &str) -> Result<Changelog, EntlogError> {
        let mut commits = Vec::new();
        for id in list_commits(self.repo, from, to)? {
            if let Some(entry) = self.commit_entry(id)? {
                commits.push(entry);
            }
        }
        Ok(Changelog { commits })
    }

    /// The entry for one commit, or `None` when every path it touches is
    /// skipped.
    ///
    /// # Errors
    ///
    /// See [`ChangelogBuilder::build`].
    pub fn commit_entry(&self, id: Oid) -> Result<Option<CommitEntry>, EntlogError> {
        let commit = find_commit(self.repo, id)?;
        let meta = CommitMeta::from_commit(&commit);

        let changes: Vec<FileChange> = commit_changes(self.repo, &commit)?
            .into_iter()
            .filter(|change| !self.is_skipped(change))
            .collect();

        if changes.is_empty() {
            debug!(commit = %meta.id, "no loggable paths, skipping commit");
            return Ok(None);
        }

        if meta.merge {
            return Ok(Some(CommitEntry {
                meta,
                files: Vec::new(),
            }));
        }

        let mut files = Vec::with_capacity(changes.len());
        for change in &changes {
            debug!(commit = %meta.id, path = %change.path, status = %change.status, "changed path");
            if change.status == ChangeStatus::Unmerged {
                continue;
            }
            let mut entry = FileEntry::from_change(change);
            entry.changes = self.analyze(change)?;
            files.push(entry);
        }

        Ok(Some(CommitEntry { meta, files }))
    }

    fn is_skipped(&self, change: &FileChange) -> bool {
        let from = match &change.status {
            ChangeStatus::Renamed { from, .. } | ChangeStatus::Copied { from, .. } => Some(from),
            _ => None,
        };
        self.filter.should_skip(&change.path)
            || from.is_some_and(|from| self.filter.should_skip(from))
    }

    /// Entity records for one path; empty unless it is a source whose
    /// content changed.
    fn analyze(&self, change: &FileChange) -> Result<Vec<ChangeRecord>, EntlogError> {
        if !change.needs_structural_diff() || !self.filter.is_source(&change.path) {
            return Ok(Vec::new());
        }
        let (Some(old_id), Some(new_id)) = (change.old_id, change.new_id) else {
            return Ok(Vec::new());
        };

        let texts = self
            .read_text(old_id, &change.path)
            .and_then(|old| Ok((old, self.read_text(new_id, &change.path)?)));
        match texts {
            Ok((old, new)) => Ok(diff_sources(&old, &new)),
            Err(e) if e.is_skippable() => {
                warn!(path = %change.path, error = %e, "skipping entity diff");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn read_text(&self, id: Oid, path: &str) -> Result<String, EntlogError> {
        let bytes = read_blob(self.repo, id)?;
        decode_blob(&bytes, &self.encodings, path)
    }
}
