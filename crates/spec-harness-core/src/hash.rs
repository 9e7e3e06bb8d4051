//! Content fingerprinting.
//!
//! Every content-addressed value in Spec Harness (whole-document hashes,
//! knowledge-card identity) is the lowercase hex SHA-256 of its UTF-8 bytes.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `text`: 64 lowercase characters.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
