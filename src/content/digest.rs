/// Content digests
///
/// A digest is SHA-256 over the UTF-8 bytes of the content, rendered as
/// `0x` followed by 64 lowercase hex characters.
use sha2::{Digest, Sha256};

/// Total length of a rendered digest, including the `0x` prefix
pub const DIGEST_HEX_LEN: usize = 66;

/// Compute the registry digest of a piece of content
pub fn content_digest(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    format!("0x{}", hex::encode(hash))
}

/// Check that `content` hashes to `expected`
///
/// The comparison ignores hex case. Anything that is not a well-formed
/// digest never matches.
pub fn verify_content(content: &str, expected: &str) -> bool {
    if !is_digest(expected) {
        return false;
    }
    content_digest(content).eq_ignore_ascii_case(expected)
}

/// Whether `value` has the fixed `0x` + 64 hex digit shape
pub fn is_digest(value: &str) -> bool {
    is_prefixed_hex(value, DIGEST_HEX_LEN)
}

/// Whether `value` is exactly `len` chars, `0x`-prefixed, with a hex body
pub(crate) fn is_prefixed_hex(value: &str, len: usize) -> bool {
    value.len() == len
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}
