use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EntlogError;
use crate::types::Encoding;

/// Top-level configuration loaded from `.entlog.toml`.
///
/// Resolution order: `--config` flag, then `.entlog.toml` in the working
/// directory, then these defaults.
///
/// # Examples
///
/// ```
/// use entlog_core::EntlogConfig;
///
/// let config = EntlogConfig::default();
/// assert_eq!(config.sources.extensions, vec!["c", "h"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntlogConfig {
    /// Which paths are analysed and which are ignored.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// How file revisions are turned into text.
    #[serde(default)]
    pub decode: DecodeConfig,
}

impl EntlogConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EntlogError::FileNotFound`] if `path` does not exist,
    /// [`EntlogError::Io`] if it cannot be read, [`EntlogError::Toml`] if the
    /// content is not valid TOML, or [`EntlogError::Config`] if it is valid
    /// TOML but unusable.
    pub fn from_file(path: &Path) -> Result<Self, EntlogError> {
        if !path.exists() {
            return Err(EntlogError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`EntlogError::Toml`] if parsing fails and
    /// [`EntlogError::Config`] if no decoding encoding is configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use entlog_core::{Encoding, EntlogConfig};
    ///
    /// let toml = r#"
    /// [decode]
    /// encodings = ["utf-8"]
    /// "#;
    /// let config = EntlogConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.decode.encodings, vec![Encoding::Utf8]);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, EntlogError> {
        let config: Self = toml::from_str(content)?;
        if config.decode.encodings.is_empty() {
            return Err(EntlogError::Config(
                "[decode] encodings must list at least one encoding".into(),
            ));
        }
        Ok(config)
    }
}

/// Source selection settings.
///
/// # Examples
///
/// ```
/// use entlog_core::SourcesConfig;
///
/// let config = SourcesConfig::default();
/// assert_eq!(config.skip_patterns, vec!["*ChangeLog*"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// File suffixes analysed structurally (default: `c`, `h`).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Glob patterns for paths dropped from a commit's change list.
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["c".into(), "h".into()]
}

fn default_skip_patterns() -> Vec<String> {
    vec!["*ChangeLog*".into()]
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            skip_patterns: default_skip_patterns(),
        }
    }
}

/// Blob decoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Encodings tried in order; the first that succeeds wins.
    #[serde(default = "default_encodings")]
    pub encodings: Vec<Encoding>,
}

fn default_encodings() -> Vec<Encoding> {
    vec![Encoding::Utf8, Encoding::Latin1]
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            encodings: default_encodings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = EntlogConfig::default();
        assert_eq!(config.sources.extensions, vec!["c", "h"]);
        assert_eq!(config.sources.skip_patterns, vec!["*ChangeLog*"]);
        assert_eq!(
            config.decode.encodings,
            vec![Encoding::Utf8, Encoding::Latin1]
        );
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = EntlogConfig::from_toml("").unwrap();
        assert_eq!(config.sources.extensions, vec!["c", "h"]);
        assert_eq!(config.decode.encodings.len(), 2);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[sources]
extensions = ["c", "h", "S"]
skip_patterns = ["*ChangeLog*", "manual/**"]

[decode]
encodings = ["utf8", "iso-8859-1"]
"#;
        let config = EntlogConfig::from_toml(toml).unwrap();
        assert_eq!(config.sources.extensions, vec!["c", "h", "S"]);
        assert_eq!(
            config.sources.skip_patterns,
            vec!["*ChangeLog*", "manual/**"]
        );
        assert_eq!(
            config.decode.encodings,
            vec![Encoding::Utf8, Encoding::Latin1]
        );
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let result = EntlogConfig::from_toml("[decode]\nencodings = [\"cp1252\"]\n");
        assert!(matches!(result, Err(EntlogError::Toml(_))));
    }

    #[test]
    fn empty_encoding_list_is_a_config_error() {
        let result = EntlogConfig::from_toml("[decode]\nencodings = []\n");
        assert!(matches!(result, Err(EntlogError::Config(_))));
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(EntlogConfig::from_toml("{{invalid}}").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let result = EntlogConfig::from_file(Path::new("/nonexistent/.entlog.toml"));
        assert!(matches!(result, Err(EntlogError::FileNotFound(_))));
    }
}
