//! Blob bytes to text.

use entlog_core::{Encoding, EntlogError};
use tracing::debug;

/// Decode `bytes` with the first encoding in `encodings` that accepts them.
///
/// # Errors
///
/// [`EntlogError::Decode`] naming `path` when every encoding rejects the
/// input (only possible when Latin-1 is not configured).
///
/// # Examples
///
/// ```
/// use entlog_core::Encoding;
/// use entlog_history::decode::decode_blob;
///
/// let text = decode_blob(b"caf\xe9", &[Encoding::Utf8, Encoding::Latin1], "locale.c").unwrap();
/// assert_eq!(text, "café");
/// assert!(decode_blob(b"caf\xe9", &[Encoding::Utf8], "locale.c").is_err());
/// ```
pub fn decode_blob(bytes: &[u8], encodings: &[Encoding], path: &str) -> Result<String, EntlogError> {
    for (attempt, encoding) in encodings.iter().enumerate() {
        if let Some(text) = encoding.decode(bytes) {
            if attempt > 0 {
                debug!(path, %encoding, "decoded with fallback encoding");
            }
            return Ok(text);
        }
    }
    Err(EntlogError::Decode {
        path: path.to_owned(),
    })
}
