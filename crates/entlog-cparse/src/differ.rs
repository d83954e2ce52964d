//! Structural comparison of two scope trees.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::{BlockId, BlockKind, Tree};

/// What happened to an entity between two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Removed,
    Modified,
}

impl ChangeAction {
    /// The action seen when old and new are swapped.
    pub fn inverse(self) -> Self {
        match self {
            ChangeAction::Added => ChangeAction::Removed,
            ChangeAction::Removed => ChangeAction::Added,
            ChangeAction::Modified => ChangeAction::Modified,
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Added => f.write_str("New"),
            ChangeAction::Removed => f.write_str("Removed"),
            ChangeAction::Modified => f.write_str("Modified"),
        }
    }
}

/// One changed entity together with the conditions it sits under.
///
/// # Examples
///
/// ```
/// use entlog_cparse::{diff_sources, ChangeAction};
///
/// let records = diff_sources("#ifdef X\nint a;\n#endif\n", "#ifdef X\nint a;\nint b;\n#endif\n");
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].action, ChangeAction::Added);
/// assert_eq!(records[0].to_string(), "[X](b): New.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub name: String,
    pub kind: BlockKind,
    pub action: ChangeAction,
    /// Enclosing conditions, innermost last.
    pub scope: Vec<String>,
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for condition in &self.scope {
            write!(f, "[{condition}]")?;
        }
        write!(f, "({}): {}.", self.name, self.action)
    }
}

/// Compare two file trees and list what changed, in old-tree order followed
/// by additions in new-tree order.
///
/// Children pair up greedily: each old child takes the first unmatched new
/// sibling with the same name and kind. A scope whose condition text changed
/// never pairs, so everything beneath it shows up as removed and re-added.
pub fn compare(old: &Tree, new: &Tree) -> Vec<ChangeRecord> {
    let mut differ = Differ {
        old,
        new,
        matched: vec![false; new.len()],
        records: Vec::new(),
    };
    differ.run(old.root(), new.root());
    differ.records
}

struct Differ<'a> {
    old: &'a Tree,
    new: &'a Tree,
    /// Per new-tree block: already paired with an old block.
    matched: Vec<bool>,
    records: Vec<ChangeRecord>,
}

/// Pending work, processed depth first in tree order.
enum Task {
    Pair(BlockId, BlockId),
    Removed(BlockId),
    Added(BlockId),
}

impl Differ<'_> {
    fn run(&mut self, old_root: BlockId, new_root: BlockId) {
        let (old, new) = (self.old, self.new);
        let mut stack = vec![Task::Pair(old_root, new_root)];
        while let Some(task) = stack.pop() {
            match task {
                Task::Pair(left, right) => {
                    let tasks = self.compare_blocks(left, right);
                    stack.extend(tasks.into_iter().rev());
                }
                Task::Removed(id) => self.report(old, id, ChangeAction::Removed),
                Task::Added(id) => self.report(new, id, ChangeAction::Added),
            }
        }
    }

    /// Pair the children of two matched blocks; leaves are compared directly.
    fn compare_blocks(&mut self, left: BlockId, right: BlockId) -> Vec<Task> {
        let (old, new) = (self.old, self.new);

        if !old[left].kind().is_scope() {
            if old[left].raw_text() != new[right].raw_text() {
                self.report(old, left, ChangeAction::Modified);
            }
            return Vec::new();
        }

        let mut tasks = Vec::new();
        for &cl in old[left].children() {
            let candidate = new[right].children().iter().copied().find(|&cr| {
                !self.matched[cr.index()]
                    && new[cr].name() == old[cl].name()
                    && new[cr].kind() == old[cl].kind()
            });
            match candidate {
                Some(cr) => {
                    self.matched[cr.index()] = true;
                    tasks.push(Task::Pair(cl, cr));
                }
                None => tasks.push(Task::Removed(cl)),
            }
        }

        tasks.extend(
            new[right]
                .children()
                .iter()
                .copied()
                .filter(|cr| !self.matched[cr.index()])
                .map(Task::Added),
        );
        tasks
    }

    /// Record `id`, or every leaf beneath it when it is a scope.
    fn report(&mut self, tree: &Tree, id: BlockId, action: ChangeAction) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let block = &tree[id];
            if block.kind().is_scope() {
                stack.extend(block.children().iter().rev());
                continue;
            }
            self.records.push(ChangeRecord {
                name: block.name().to_owned(),
                kind: block.kind(),
                action,
                scope: tree.scope_path(id),
            });
        }
    }
}
