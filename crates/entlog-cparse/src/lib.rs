//! Approximate structural parsing and diffing of C sources.
//!
//! Sources are reduced to a tree of top-level entities (functions,
//! declarations, composite types, macros, includes) nested under the
//! `#if`/`#ifdef` conditions they appear in. Two such trees can then be
//! compared to list which entities were added, removed or modified.
//!
//! This is not a C parser. It assumes GNU-style formatting and degrades to
//! missed entities on anything unusual; it never fails.
//!
//! # Examples
//!
//! ```
//! use entlog_cparse::{diff_sources, BlockKind, ChangeAction};
//!
//! let records = diff_sources("void f(void) { return; }\n", "void f(void) { return 1; }\n");
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].name, "f");
//! assert_eq!(records[0].kind, BlockKind::FunctionDefinition);
//! assert_eq!(records[0].action, ChangeAction::Modified);
//! ```

mod classify;
mod differ;
pub mod normalize;
mod parser;
mod tree;

pub use differ::{compare, ChangeAction, ChangeRecord};
pub use tree::{Block, BlockId, BlockKind, Tree, ANONYMOUS};

/// Parse the raw lines of one file revision into its scope tree.
pub fn parse_file<S: AsRef<str>>(lines: &[S]) -> Tree {
    parser::parse(&normalize::normalize(lines))
}

/// [`parse_file`] over a whole source text.
pub fn parse_source(source: &str) -> Tree {
    let lines: Vec<&str> = source.lines().collect();
    parse_file(&lines)
}

/// Parse both revisions and compare them.
pub fn diff_files<S: AsRef<str>>(old: &[S], new: &[S]) -> Vec<ChangeRecord> {
    compare(&parse_file(old), &parse_file(new))
}

/// [`diff_files`] over whole source texts.
pub fn diff_sources(old: &str, new: &str) -> Vec<ChangeRecord> {
    compare(&parse_source(old), &parse_source(new))
}
