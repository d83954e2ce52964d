//! Shared error type, configuration, and output types for entlog.
//!
//! - [`EntlogError`]: unified error type using `thiserror`
//! - [`EntlogConfig`]: configuration loaded from `.entlog.toml`
//! - [`OutputFormat`] and [`Encoding`]

mod config;
mod error;
mod types;

pub use config::{DecodeConfig, EntlogConfig, SourcesConfig};
pub use error::EntlogError;
pub use types::{Encoding, OutputFormat};

/// A convenience `Result` type for entlog operations.
pub type Result<T> = std::result::Result<T, EntlogError>;
