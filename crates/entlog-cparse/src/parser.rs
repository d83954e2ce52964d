//! Scope parser over normalised lines.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::classify::classify;
use crate::tree::{BlockId, BlockKind, Tree};

static INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"include(?:_next)?\s*["<]?(?P<name>[^">]+)[">]?"#).unwrap()
});
static DEFINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"define\s+(?P<name>[A-Za-z0-9_]+)").unwrap());
static UNDEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"undef\s+(?P<name>[A-Za-z0-9_]+)").unwrap());
static DIAGNOSTIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:error|warning)\s+"?(?P<name>.*?)"?$"#).unwrap());
static DEFINED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdefined\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const BLANK: &str = "<blank>";

/// Build the scope tree for already-normalised lines.
pub(crate) fn parse(lines: &[String]) -> Tree {
    let mut parser = Parser {
        lines,
        pos: 0,
        tree: Tree::new(),
    };
    parser.run();
    parser.tree
}

struct Parser<'a> {
    lines: &'a [String],
    pos: usize,
    tree: Tree,
}

/// What a directive line does to the branch being parsed.
enum Step {
    Stay,
    /// `#endif`: the branch ends.
    Close,
    /// `#if*`: a nested scope opens.
    Open(BlockId),
    /// `#elif`/`#else`: a sibling opens, and the current branch ends with it.
    Branch(BlockId),
}

/// How a frame was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    File,
    Nested,
    Branch,
}

/// One open branch.
struct Frame {
    scope: BlockId,
    /// Buffer at the start of the conditional group; seeds `#elif`/`#else` siblings.
    start: String,
    buffer: String,
    entry: Entry,
}

impl Frame {
    fn new(scope: BlockId, seed: String, entry: Entry) -> Self {
        Self {
            scope,
            start: seed.clone(),
            buffer: seed,
            entry,
        }
    }
}

impl Parser<'_> {
    fn run(&mut self) {
        let lines = self.lines;
        let mut stack = vec![Frame::new(self.tree.root(), String::new(), Entry::File)];

        while self.pos < lines.len() {
            let line = &lines[self.pos];
            self.pos += 1;
            let Some(frame) = stack.last_mut() else {
                break;
            };

            if let Some(body) = line.strip_prefix('#') {
                match self.directive(frame.scope, body, line) {
                    Step::Stay => {}
                    Step::Open(child) => {
                        let seed = frame.buffer.clone();
                        stack.push(Frame::new(child, seed, Entry::Nested));
                    }
                    Step::Branch(sibling) => {
                        let seed = frame.start.clone();
                        stack.push(Frame::new(sibling, seed, Entry::Branch));
                    }
                    Step::Close => close(&mut stack),
                }
                continue;
            }

            if !frame.buffer.is_empty() {
                frame.buffer.push(' ');
            }
            frame.buffer.push_str(line);

            if let Some(entity) = classify(&frame.buffer, &lines[self.pos..]) {
                self.pos += entity.consumed;
                trace!(kind = %entity.kind, name = %entity.name, "entity");
                self.tree
                    .push(frame.scope, entity.kind, entity.name, entity.raw_text);
                frame.buffer.clear();
            }
        }

        for frame in stack.iter().rev().filter(|frame| !frame.buffer.is_empty()) {
            debug!(fragment = %frame.buffer, "discarding unclassified fragment at end of input");
        }
    }

    /// Handle one directive line in `scope`.
    fn directive(&mut self, scope: BlockId, body: &str, line: &str) -> Step {
        if body.starts_with("include") {
            self.leaf(scope, BlockKind::Include, &INCLUDE, body, line);
        } else if body.starts_with("define") {
            self.leaf(scope, BlockKind::MacroDefine, &DEFINE, body, line);
        } else if body.starts_with("undef") {
            self.leaf(scope, BlockKind::MacroUndef, &UNDEF, body, line);
        } else if body.starts_with("error") || body.starts_with("warning") {
            let name = DIAGNOSTIC
                .captures(body)
                .and_then(|caps| caps.name("name"))
                .map(|m| m.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(BLANK);
            self.tree.push(
                scope,
                BlockKind::PreprocessorDiagnostic,
                name.to_owned(),
                line.to_owned(),
            );
        } else if body.starts_with("if") {
            let child = self.tree.push(
                scope,
                BlockKind::ConditionalScope,
                condition(body),
                line.to_owned(),
            );
            return Step::Open(child);
        } else if let Some(parent) = self.tree[scope].parent() {
            let name = if body.starts_with("elif") {
                condition(body)
            } else if body.starts_with("else") {
                format!("!({})", self.tree[scope].name())
            } else if body.starts_with("endif") {
                return Step::Close;
            } else {
                return Step::Stay;
            };
            let sibling =
                self.tree
                    .push(parent, BlockKind::ConditionalScope, name, line.to_owned());
            return Step::Branch(sibling);
        } else {
            trace!(directive = %line, "ignored at file level");
        }
        Step::Stay
    }

    fn leaf(&mut self, scope: BlockId, kind: BlockKind, pattern: &Regex, body: &str, line: &str) {
        match pattern.captures(body).and_then(|caps| caps.name("name")) {
            Some(name) => {
                self.tree
                    .push(scope, kind, name.as_str().to_owned(), line.to_owned());
            }
            None => debug!(directive = %line, "no name in directive, ignoring"),
        }
    }
}

/// End the innermost branch, along with the `#elif`/`#else` chain that
/// opened it.
fn close(stack: &mut Vec<Frame>) {
    while let Some(frame) = stack.last() {
        // A pending fragment keeps the branch open.
        if frame.entry == Entry::File || !frame.buffer.is_empty() {
            return;
        }
        let entry = frame.entry;
        stack.pop();
        if entry != Entry::Branch {
            return;
        }
    }
}

/// Normalised condition text of an `#if`, `#ifdef`, `#ifndef` or `#elif`.
fn condition(body: &str) -> String {
    let (negate, rest) = if let Some(rest) = body.strip_prefix("ifndef") {
        (true, rest)
    } else if let Some(rest) = body.strip_prefix("ifdef") {
        (false, rest)
    } else if let Some(rest) = body.strip_prefix("elif") {
        (false, rest)
    } else {
        (false, body.strip_prefix("if").unwrap_or(body))
    };
    let stripped = DEFINED.replace_all(rest, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    if negate {
        format!("!{collapsed}")
    } else {
        collapsed.into_owned()
    }
}
