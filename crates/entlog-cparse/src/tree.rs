//! Arena-backed scope tree.
//!
//! A [`Tree`] owns every [`Block`] of one file revision. Conditional scopes
//! and the file root are internal nodes; everything else is a leaf. Blocks
//! refer to each other by [`BlockId`], so the parent back-reference is a plain
//! index and never owns anything.

use std::fmt;
use std::fmt::Write as _;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Name given to composite types declared without a tag.
pub const ANONYMOUS: &str = "<anonymous>";

/// What a [`Block`] represents.
///
/// # Examples
///
/// ```
/// use entlog_cparse::BlockKind;
///
/// assert!(BlockKind::ConditionalScope.is_scope());
/// assert!(!BlockKind::FunctionDefinition.is_scope());
/// assert_eq!(BlockKind::CompositeType.to_string(), "composite type");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    /// The root of a tree.
    File,
    /// One branch of an `#if`/`#elif`/`#else` group.
    ConditionalScope,
    /// `#include`.
    Include,
    /// `#define`.
    MacroDefine,
    /// `#undef`.
    MacroUndef,
    /// `#error` or `#warning`.
    PreprocessorDiagnostic,
    /// Variable declaration or function-pointer declarator.
    Declaration,
    /// Function prototype without a body.
    FunctionForwardDeclaration,
    /// Function with a body.
    FunctionDefinition,
    /// `struct`, `union` or `enum` with a body.
    CompositeType,
    /// Initialised variable, including array initialisers.
    StaticAssignment,
    /// Macro call written without a trailing semicolon.
    BareMacroInvocation,
}

impl BlockKind {
    /// Whether blocks of this kind hold children.
    pub fn is_scope(self) -> bool {
        matches!(self, BlockKind::File | BlockKind::ConditionalScope)
    }

    /// Short upper-case tag used by [`Tree::dump`].
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::File | BlockKind::ConditionalScope => "SCOPE",
            BlockKind::Include => "INCLUDE",
            BlockKind::MacroDefine => "DEFINE",
            BlockKind::MacroUndef => "UNDEF",
            BlockKind::PreprocessorDiagnostic => "MACRO LEAF",
            BlockKind::Declaration => "DECL",
            BlockKind::FunctionForwardDeclaration => "FNDECL",
            BlockKind::FunctionDefinition => "FUNC",
            BlockKind::CompositeType => "COMPOSITE",
            BlockKind::StaticAssignment => "ASSIGN",
            BlockKind::BareMacroInvocation => "MACROCALL",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BlockKind::File => "file",
            BlockKind::ConditionalScope => "conditional scope",
            BlockKind::Include => "include",
            BlockKind::MacroDefine => "macro definition",
            BlockKind::MacroUndef => "macro undef",
            BlockKind::PreprocessorDiagnostic => "preprocessor diagnostic",
            BlockKind::Declaration => "declaration",
            BlockKind::FunctionForwardDeclaration => "function declaration",
            BlockKind::FunctionDefinition => "function definition",
            BlockKind::CompositeType => "composite type",
            BlockKind::StaticAssignment => "static assignment",
            BlockKind::BareMacroInvocation => "macro invocation",
        };
        f.write_str(text)
    }
}

/// Index of a [`Block`] inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

impl BlockId {
    /// Position in the arena; stable for the lifetime of the tree.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the scope tree.
#[derive(Debug, Clone)]
pub struct Block {
    kind: BlockKind,
    name: String,
    raw_text: String,
    children: Vec<BlockId>,
    parent: Option<BlockId>,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Identity key: the condition for scopes, the symbol for entities.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The whitespace-normalised source the block was recognised from.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Children in source order. Always empty for leaves.
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Enclosing scope; `None` only for the file root.
    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }
}

/// All blocks of one parsed file revision, rooted at a single `File` block.
///
/// # Examples
///
/// ```
/// use entlog_cparse::{parse_source, BlockKind};
///
/// let tree = parse_source("#ifdef X\nint a;\n#endif\n");
/// let root = &tree[tree.root()];
/// assert_eq!(root.kind(), BlockKind::File);
///
/// let scope = &tree[root.children()[0]];
/// assert_eq!(scope.name(), "X");
/// assert_eq!(tree[scope.children()[0]].name(), "a");
/// ```
#[derive(Debug, Clone)]
pub struct Tree {
    blocks: Vec<Block>,
}

impl Tree {
    /// A tree holding only its `File` root.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block {
                kind: BlockKind::File,
                name: String::new(),
                raw_text: String::new(),
                children: Vec::new(),
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    /// Number of blocks, root included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }

    /// Append a block under `parent`. The parent link is fixed from here on.
    pub(crate) fn push(
        &mut self,
        parent: BlockId,
        kind: BlockKind,
        name: String,
        raw_text: String,
    ) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block {
            kind,
            name,
            raw_text,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.blocks[parent.0].children.push(id);
        id
    }

    /// Conditions of the `ConditionalScope` ancestors of `id`, outermost first.
    pub fn scope_path(&self, id: BlockId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = self[id].parent;
        while let Some(parent) = cursor {
            let block = &self[parent];
            if block.kind == BlockKind::ConditionalScope {
                path.push(block.name.clone());
            }
            cursor = block.parent;
        }
        path.reverse();
        path
    }

    /// Render the tree as an indented `Scope:`/`EndScope:` listing.
    ///
    /// # Examples
    ///
    /// ```
    /// use entlog_cparse::parse_source;
    ///
    /// let dump = parse_source("#include <stdio.h>\n").dump();
    /// assert_eq!(dump, "Scope:\n    INCLUDE: stdio.h\nEndScope:\n");
    /// ```
    pub fn dump(&self) -> String {
        enum Visit {
            Enter(BlockId, usize),
            Exit(BlockId, usize),
        }

        let mut out = String::new();
        let mut stack = vec![Visit::Enter(self.root(), 0)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id, indent) => {
                    let block = &self[id];
                    let pad = " ".repeat(indent);
                    if !block.kind.is_scope() {
                        let _ = writeln!(out, "{pad}{}: {}", block.kind.tag(), block.name);
                        continue;
                    }
                    let _ = writeln!(out, "{}", format!("{pad}Scope: {}", block.name).trim_end());
                    stack.push(Visit::Exit(id, indent));
                    stack.extend(
                        block
                            .children
                            .iter()
                            .rev()
                            .map(|&child| Visit::Enter(child, indent + 4)),
                    );
                }
                Visit::Exit(id, indent) => {
                    let pad = " ".repeat(indent);
                    let _ = writeln!(
                        out,
                        "{}",
                        format!("{pad}EndScope: {}", self[id].name).trim_end()
                    );
                }
            }
        }
        out
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<BlockId> for Tree {
    type Output = Block;

    fn index(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }
}
