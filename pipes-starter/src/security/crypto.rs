// Cryptographic utilities

use sha2::{Digest, Sha256};

/// Number of digest bytes kept for a config reference (64 bits -> 16 hex chars).
pub const CONFIG_HASH_BYTES: usize = 8;

/// SHA-256 hex digest (lowercase).
pub fn sha256_hex(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Short content reference for a serialized configuration.
///
/// SHA-256 over the UTF-8 bytes, truncated to the first 8 bytes, rendered as lowercase hex.
/// A dedupe fingerprint, not a security boundary.
pub fn config_hash(serialized: &str) -> String {
    let mut hex = sha256_hex(serialized.as_bytes());
    hex.truncate(CONFIG_HASH_BYTES * 2);
    hex
}

/// True iff `s` has the shape of a config reference (16 lowercase hex chars).
pub fn is_config_hash(s: &str) -> bool {
    s.len() == CONFIG_HASH_BYTES * 2 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
