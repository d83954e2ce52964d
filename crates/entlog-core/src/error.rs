use std::path::PathBuf;

/// Errors that can occur across entlog.
///
/// Library crates return this type directly; the binary turns it into a
/// `miette` report at the boundary. The structural parser and differ never
/// fail, so every variant here comes from the revision layer, configuration,
/// or I/O.
///
/// # Examples
///
/// ```
/// use entlog_core::EntlogError;
///
/// let err = EntlogError::Config("unknown encoding".into());
/// assert!(err.to_string().contains("unknown encoding"));
/// assert!(!err.is_fatal());
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum EntlogError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    #[diagnostic(code(entlog::git))]
    Git(String),

    /// Malformed collaborator input, such as a truncated raw change line.
    #[error("parse error: {0}")]
    Parse(String),

    /// A blob could not be decoded under any configured encoding.
    #[error("cannot decode {path} with any configured encoding")]
    #[diagnostic(
        code(entlog::decode),
        help("add another encoding to [decode] encodings in .entlog.toml")
    )]
    Decode {
        /// Path (or blob label) of the undecodable unit.
        path: String,
    },

    /// A change-status code outside the known set.
    #[error("{commit}: unknown change status {status:?}")]
    #[diagnostic(
        code(entlog::unknown_status),
        help("git reported a change type this tool does not understand; this is a bug")
    )]
    UnknownStatus {
        /// Commit the change was reported for.
        commit: String,
        /// The raw status code as reported.
        status: String,
    },

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl EntlogError {
    /// Whether the whole run must stop.
    ///
    /// Only a violated collaborator protocol (an unknown status code) is
    /// fatal. Decoding failures skip the affected file and everything else
    /// propagates to the caller as an ordinary error.
    ///
    /// # Examples
    ///
    /// ```
    /// use entlog_core::EntlogError;
    ///
    /// let err = EntlogError::UnknownStatus { commit: "abc".into(), status: "X".into() };
    /// assert!(err.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, EntlogError::UnknownStatus { .. })
    }

    /// Whether the affected unit should be skipped rather than aborting.
    pub fn is_skippable(&self) -> bool {
        matches!(self, EntlogError::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EntlogError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn unknown_status_names_commit_and_code() {
        let err = EntlogError::UnknownStatus {
            commit: "deadbeef".into(),
            status: "X".into(),
        };
        assert_eq!(err.to_string(), "deadbeef: unknown change status \"X\"");
        assert!(err.is_fatal());
        assert!(!err.is_skippable());
    }

    #[test]
    fn decode_is_skippable_not_fatal() {
        let err = EntlogError::Decode {
            path: "locale/C-translit.h".into(),
        };
        assert!(err.is_skippable());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("C-translit.h"));
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = EntlogError::FileNotFound(PathBuf::from("/tmp/missing.c"));
        assert!(err.to_string().contains("/tmp/missing.c"));
    }
}
