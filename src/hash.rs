use md5::{Digest, Md5};
use std::fmt::Write;

use crate::types::ContentHash;

/// MD5 digest of `content` as lowercase hex.
///
/// The exact UTF-8 bytes are hashed with no normalization, so whitespace or
/// case differences produce distinct identities. MD5 keeps new identities
/// comparable with the `hash` fields already persisted in day files.
pub fn content_hash(content: &str) -> ContentHash {
    let digest = Md5::digest(content.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
