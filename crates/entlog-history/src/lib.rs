//! Git history side of entlog: which paths a commit touched, how, and what
//! the entity diff says about the C sources among them.
//!
//! - [`mining`]: commit ranges, metadata and tree diffs via git2
//! - [`status`]: change classification from git2 deltas or `--raw` lines
//! - [`decode`]: blob bytes to text
//! - [`filter`]: skip patterns and source extensions
//! - [`changelog`]: the assembled log and its renderings

pub mod changelog;
pub mod decode;
pub mod filter;
pub mod mining;
pub mod status;

pub use changelog::{Changelog, ChangelogBuilder, CommitEntry, FileEntry};
pub use status::{ChangeStatus, FileChange};
