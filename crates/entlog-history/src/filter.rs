//! Path selection for changelog entries.
//!
//! Two questions are asked of every changed path: should it appear in the
//! log at all (skip patterns such as `*ChangeLog*`), and is it a source file
//! whose entities are worth diffing (extension list).

use std::path::Path;

use entlog_core::SourcesConfig;
use tracing::warn;

/// Skip patterns and source extensions for one run.
///
/// # Examples
///
/// ```
/// use entlog_core::SourcesConfig;
/// use entlog_history::filter::PathFilter;
///
/// let filter = PathFilter::from_config(&SourcesConfig::default());
/// assert!(filter.should_skip("ChangeLog"));
/// assert!(filter.is_source("elf/dl-load.c"));
/// assert!(!filter.is_source("manual/intro.texi"));
/// ```
#[derive(Debug, Clone)]
pub struct PathFilter {
    skip_patterns: Vec<glob::Pattern>,
    extensions: Vec<String>,
}

impl PathFilter {
    /// Build a filter from the `[sources]` section.
    ///
    /// Patterns that fail to compile are dropped with a warning.
    pub fn from_config(config: &SourcesConfig) -> Self {
        let mut skip_patterns = Vec::new();
        for pat in &config.skip_patterns {
            match glob::Pattern::new(pat) {
                Ok(p) => skip_patterns.push(p),
                Err(e) => warn!(pattern = %pat, error = %e, "ignoring invalid skip pattern"),
            }
        }

        Self {
            skip_patterns,
            extensions: config.extensions.clone(),
        }
    }

    /// Whether `path` is left out of the log entirely.
    pub fn should_skip(&self, path: &str) -> bool {
        self.skip_patterns.iter().any(|p| p.matches(path))
    }

    /// Whether `path` has one of the configured source extensions.
    pub fn is_source(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::from_config(&SourcesConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changelog_files_are_skipped_anywhere() {
        let filter = PathFilter::default();
        assert!(filter.should_skip("ChangeLog"));
        assert!(filter.should_skip("ChangeLog.old/ChangeLog.18"));
        assert!(filter.should_skip("localedata/ChangeLog"));
        assert!(!filter.should_skip("stdio-common/vfprintf.c"));
    }

    #[test]
    fn only_configured_extensions_are_sources() {
        let filter = PathFilter::default();
        assert!(filter.is_source("include/link.h"));
        assert!(filter.is_source("csu/libc-start.c"));
        assert!(!filter.is_source("sysdeps/x86_64/start.S"));
        assert!(!filter.is_source("Makefile"));
        assert!(!filter.is_source("scripts/build.c.in"));
    }

    #[test]
    fn custom_extensions() {
        let config = SourcesConfig {
            extensions: vec!["S".into()],
            skip_patterns: Vec::new(),
        };
        let filter = PathFilter::from_config(&config);
        assert!(filter.is_source("sysdeps/x86_64/start.S"));
        assert!(!filter.is_source("csu/libc-start.c"));
        assert!(!filter.should_skip("ChangeLog"));
    }

    #[test]
    fn invalid_pattern_is_dropped() {
        let config = SourcesConfig {
            extensions: vec!["c".into()],
            skip_patterns: vec!["[".into(), "*.texi".into()],
        };
        let filter = PathFilter::from_config(&config);
        assert!(filter.should_skip("manual/intro.texi"));
        assert!(!filter.should_skip("["));
    }
}
