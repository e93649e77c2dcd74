//! Content fingerprints for duplicate detection and cache keys.
//!
//! Identical inputs always produce the same digest, so a fingerprint doubles
//! as a "have we already paid for this exact request" key. Collision
//! resistance is delegated to SHA-256; the truncated 16-char form used in
//! cache keys only risks extra cache misses, never wrong results.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of two input texts joined by a fixed separator.
pub fn fingerprint(primary: &str, secondary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(primary.as_bytes());
    hasher.update(b":");
    hasher.update(secondary.as_bytes());
    hex_digest(hasher)
}

/// Fingerprint variant that mixes an extra salt (e.g. model + language) into
/// the digest. Used by operations whose cached result depends on more than
/// the two main texts.
pub fn fingerprint_salted(primary: &str, secondary: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(primary.as_bytes());
    hasher.update(b":");
    hasher.update(secondary.as_bytes());
    hex_digest(hasher)
}

/// First 16 hex chars of a digest, for human-scannable cache-key suffixes.
pub fn short(digest: &str) -> &str {
    &digest[..digest.len().min(16)]
}

fn hex_digest(hasher: Sha256) -> String {
    let bytes = hasher.finalize();
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
