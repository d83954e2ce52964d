//! Per-path change classification.
//!
//! Changes come either from a live `git2` tree diff ([`FileChange::from_delta`])
//! or from recorded `git show --raw` output ([`parse_raw_line`]). Both paths
//! end in the same [`ChangeStatus`], and both treat an unrecognised status as
//! fatal: it means the collaborator speaks a protocol we do not understand.

use std::fmt;
use std::path::Path;

use entlog_core::EntlogError;
use git2::{Delta, DiffDelta, DiffFile, FileMode, Oid};
use serde::{Deserialize, Serialize};

/// What happened to one path in one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeStatus {
    Added,
    Deleted,
    Modified,
    /// Moved from `from`; `similarity` is a percentage when known.
    Renamed { from: String, similarity: Option<u8> },
    /// Copied from `from`.
    Copied { from: String, similarity: Option<u8> },
    /// Only the file mode changed. Modes are six-digit octal strings.
    #[serde(rename_all = "camelCase")]
    ModeChanged { old_mode: String, new_mode: String },
    /// Merge conflict marker; never expected in history and never rendered.
    Unmerged,
}

impl ChangeStatus {
    /// Classify a `--raw` status code such as `M`, `R087` or `T`.
    ///
    /// `paths` are the path columns after the code and `modes` the old and
    /// new mode columns.
    ///
    /// # Errors
    ///
    /// [`EntlogError::UnknownStatus`] for a code outside the known set and
    /// [`EntlogError::Parse`] when a rename or copy lacks its second path.
    ///
    /// # Examples
    ///
    /// ```
    /// use entlog_history::status::ChangeStatus;
    ///
    /// let status = ChangeStatus::from_raw("R087", &["old.c", "new.c"], ("100644", "100644"), "c0ffee").unwrap();
    /// assert_eq!(
    ///     status,
    ///     ChangeStatus::Renamed { from: "old.c".into(), similarity: Some(87) }
    /// );
    /// assert!(ChangeStatus::from_raw("X", &["a.c"], ("100644", "100644"), "c0ffee").is_err());
    /// ```
    pub fn from_raw(
        code: &str,
        paths: &[&str],
        modes: (&str, &str),
        commit: &str,
    ) -> Result<Self, EntlogError> {
        let unknown = || EntlogError::UnknownStatus {
            commit: commit.to_owned(),
            status: code.to_owned(),
        };
        let mut chars = code.chars();
        let letter = chars.next().ok_or_else(unknown)?;
        let score = chars.as_str();

        let status = match letter {
            'A' if score.is_empty() => ChangeStatus::Added,
            'D' if score.is_empty() => ChangeStatus::Deleted,
            'T' if score.is_empty() => ChangeStatus::ModeChanged {
                old_mode: modes.0.to_owned(),
                new_mode: modes.1.to_owned(),
            },
            'U' if score.is_empty() => ChangeStatus::Unmerged,
            'M' if is_score(score) => ChangeStatus::Modified,
            'R' | 'C' if is_score(score) => {
                let from = paths.first().copied().unwrap_or_default().to_owned();
                if paths.len() < 2 {
                    return Err(EntlogError::Parse(format!(
                        "{commit}: {code} change for {from:?} has no destination path"
                    )));
                }
                let similarity = score.parse::<u8>().ok();
                if letter == 'R' {
                    ChangeStatus::Renamed { from, similarity }
                } else {
                    ChangeStatus::Copied { from, similarity }
                }
            }
            _ => return Err(unknown()),
        };
        Ok(status)
    }
}

fn is_score(score: &str) -> bool {
    score.chars().all(|c| c.is_ascii_digit())
}

/// One changed path, with the blob ids needed to diff it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path in the new tree; the old path for deletions.
    pub path: String,
    pub status: ChangeStatus,
    /// `None` when the side does not exist (additions, deletions).
    pub old_id: Option<Oid>,
    pub new_id: Option<Oid>,
}

impl FileChange {
    /// Build from one delta of a tree-to-tree diff.
    ///
    /// Git reports a pure permission change as a modification; it is told
    /// apart here by the unchanged blob id.
    ///
    /// # Errors
    ///
    /// [`EntlogError::UnknownStatus`] for deltas a commit diff should never
    /// contain (unmodified, ignored, untracked, unreadable).
    pub fn from_delta(delta: &DiffDelta<'_>, commit: &str) -> Result<Self, EntlogError> {
        let old = delta.old_file();
        let new = delta.new_file();
        let old_path = file_path(&old);
        let new_path = file_path(&new);

        let status = match delta.status() {
            Delta::Added => ChangeStatus::Added,
            Delta::Deleted => ChangeStatus::Deleted,
            Delta::Modified if old.id() == new.id() && old.mode() != new.mode() => {
                ChangeStatus::ModeChanged {
                    old_mode: mode_string(old.mode()),
                    new_mode: mode_string(new.mode()),
                }
            }
            Delta::Modified => ChangeStatus::Modified,
            Delta::Renamed => ChangeStatus::Renamed {
                from: old_path.clone(),
                similarity: exact_similarity(&old, &new),
            },
            Delta::Copied => ChangeStatus::Copied {
                from: old_path.clone(),
                similarity: exact_similarity(&old, &new),
            },
            Delta::Typechange => ChangeStatus::ModeChanged {
                old_mode: mode_string(old.mode()),
                new_mode: mode_string(new.mode()),
            },
            Delta::Conflicted => ChangeStatus::Unmerged,
            other => {
                return Err(EntlogError::UnknownStatus {
                    commit: commit.to_owned(),
                    status: format!("{other:?}"),
                })
            }
        };

        let path = if status == ChangeStatus::Deleted {
            old_path
        } else {
            new_path
        };

        Ok(Self {
            path,
            status,
            old_id: non_zero(old.id()),
            new_id: non_zero(new.id()),
        })
    }

    /// Whether the entity-level diff should run for this change.
    ///
    /// Content modifications always qualify; renames and copies only when
    /// the content is not known to be identical.
    pub fn needs_structural_diff(&self) -> bool {
        match &self.status {
            ChangeStatus::Modified => true,
            ChangeStatus::Renamed { similarity, .. } | ChangeStatus::Copied { similarity, .. } => {
                similarity.map_or(true, |s| s < 100)
            }
            _ => false,
        }
    }
}

/// Parse one line of `git show --raw` / `git log --raw` output.
///
/// Lines that are not raw change records (commit headers, messages, blank
/// lines) yield `Ok(None)`. Fields are whitespace separated:
/// `:<old mode> <new mode> <old id> <new id> <status> <path> [<path>]`.
///
/// # Errors
///
/// [`EntlogError::Parse`] for a truncated record and
/// [`EntlogError::UnknownStatus`] for an unrecognised status code.
///
/// # Examples
///
/// ```
/// use entlog_history::status::{parse_raw_line, ChangeStatus};
///
/// let line = ":100644 100644 1a2b3c4 5d6e7f8 M\telf/dl-load.c";
/// let change = parse_raw_line(line, "c0ffee").unwrap().unwrap();
/// assert_eq!(change.path, "elf/dl-load.c");
/// assert_eq!(change.status, ChangeStatus::Modified);
///
/// assert!(parse_raw_line("Author: A U Thor <author@example.com>", "c0ffee").unwrap().is_none());
/// ```
pub fn parse_raw_line(line: &str, commit: &str) -> Result<Option<FileChange>, EntlogError> {
    let Some(record) = line.strip_prefix(':') else {
        return Ok(None);
    };
    if !record.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(None);
    }

    // Metadata is space separated; paths follow a tab and may contain spaces.
    let truncated = || EntlogError::Parse(format!("{commit}: truncated raw change line {line:?}"));
    let (meta, paths) = record.split_once('\t').ok_or_else(truncated)?;
    let fields: Vec<&str> = meta.split_whitespace().collect();
    let paths: Vec<&str> = paths.split('\t').filter(|p| !p.is_empty()).collect();
    let [old_mode, new_mode, old_id, new_id, code] = fields[..] else {
        return Err(truncated());
    };
    if paths.is_empty() {
        return Err(truncated());
    }

    let status = ChangeStatus::from_raw(code, &paths, (old_mode, new_mode), commit)?;
    let path = match status {
        ChangeStatus::Renamed { .. } | ChangeStatus::Copied { .. } => paths[1],
        _ => paths[0],
    };

    Ok(Some(FileChange {
        path: path.to_owned(),
        status,
        old_id: parse_id(old_id, commit)?,
        new_id: parse_id(new_id, commit)?,
    }))
}

/// [`parse_raw_line`] over a whole log, keeping only change records.
///
/// # Errors
///
/// Stops at the first line [`parse_raw_line`] rejects.
pub fn parse_raw_log(text: &str, commit: &str) -> Result<Vec<FileChange>, EntlogError> {
    let mut changes = Vec::new();
    for line in text.lines() {
        if let Some(change) = parse_raw_line(line, commit)? {
            changes.push(change);
        }
    }
    Ok(changes)
}

fn parse_id(hex: &str, commit: &str) -> Result<Option<Oid>, EntlogError> {
    // Raw output abbreviates ids; `Oid::from_str` zero-pads a short prefix.
    let hex = hex.trim_end_matches('.');
    Oid::from_str(hex)
        .map(non_zero)
        .map_err(|e| EntlogError::Parse(format!("{commit}: bad object id {hex:?}: {e}")))
}

fn non_zero(id: Oid) -> Option<Oid> {
    (!id.is_zero()).then_some(id)
}

fn file_path(file: &DiffFile<'_>) -> String {
    file.path()
        .unwrap_or(Path::new(""))
        .to_string_lossy()
        .to_string()
}

fn mode_string(mode: FileMode) -> String {
    format!("{:06o}", u32::from(mode))
}

fn exact_similarity(old: &DiffFile<'_>, new: &DiffFile<'_>) -> Option<u8> {
    (old.id() == new.id()).then_some(100)
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Added => f.write_str("added"),
            ChangeStatus::Deleted => f.write_str("deleted"),
            ChangeStatus::Modified => f.write_str("modified"),
            ChangeStatus::Renamed { from, .. } => write!(f, "renamed from {from}"),
            ChangeStatus::Copied { from, .. } => write!(f, "copied from {from}"),
            ChangeStatus::ModeChanged { old_mode, new_mode } => {
                write!(f, "mode {old_mode} -> {new_mode}")
            }
            ChangeStatus::Unmerged => f.write_str("unmerged"),
        }
    }
}
