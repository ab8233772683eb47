//! Content hashing for duplicate-upload detection.
//!
//! Uploads are deduplicated by digest, not by filename: two byte-identical
//! files are the same upload no matter what they are called.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest over a full upload's bytes.
pub fn content_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("{digest:x}")
}
