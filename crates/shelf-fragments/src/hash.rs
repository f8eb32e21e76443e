//! Content hashing for payload file names.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
pub const CONTENT_HASH_LEN: usize = 16;

/// Compute the content hash used to name payload files.
///
/// # Hash Format
///
/// First [`CONTENT_HASH_LEN`] lowercase hex characters of SHA-256 over the
/// UTF-8 bytes of `content`.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(CONTENT_HASH_LEN);
    hash
}
