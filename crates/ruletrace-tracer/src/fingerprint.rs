//! Fingerprints: the identity key for condition specs.
//!
//! A fingerprint is the SHA-1 digest of a canonical string, truncated to its
//! first 16 bytes and hex-encoded (32 lowercase characters). Specs are
//! authored and stored out of process, so the algorithm and truncation are
//! part of the external contract.

use sha1::{Digest, Sha1};

/// Number of digest bytes kept.
pub const FINGERPRINT_BYTES: usize = 16;

/// Fingerprint of `canonical`.
pub fn fingerprint(canonical: &str) -> String {
    let digest = Sha1::digest(canonical.as_bytes());
    let mut out = String::with_capacity(FINGERPRINT_BYTES * 2);
    for byte in &digest[..FINGERPRINT_BYTES] {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        // sha1("") = da39a3ee5e6b4b0d3255bfef95601890afd80709
        assert_eq!(fingerprint(""), "da39a3ee5e6b4b0d3255bfef95601890");
        // sha1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        assert_eq!(fingerprint("abc"), "a9993e364706816aba3e25717850c26c");
    }

    #[test]
    fn fixed_length_lowercase_hex() {
        let fp = fingerprint("user.Id == comment.UserId");
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(fp, fingerprint("user.Id == comment.UserId"));
        assert_ne!(fp, fingerprint("user.Id != comment.UserId"));
    }
}
