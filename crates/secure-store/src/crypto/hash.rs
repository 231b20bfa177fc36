//! SHA-256 integrity hashing and random tokens

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hex-encoded SHA-256 of a plaintext value
pub fn integrity_hash(plaintext: &[u8]) -> String {
    hex::encode(Sha256::digest(plaintext))
}

/// Compare a recorded hash against the hash of `plaintext` in constant time
pub fn verify_integrity(plaintext: &[u8], expected: &str) -> bool {
    let actual = integrity_hash(plaintext);
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Hex token of `len_bytes` random bytes from the OS RNG
pub fn generate_token(len_bytes: usize) -> String {
    let mut bytes = vec![0u8; len_bytes];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_hash_known_vector() {
        assert_eq!(
            integrity_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_integrity() {
        let hash = integrity_hash(b"{\"a\":1}");
        assert!(verify_integrity(b"{\"a\":1}", &hash));
        assert!(!verify_integrity(b"{\"a\":2}", &hash));
        assert!(!verify_integrity(b"{\"a\":1}", "deadbeef"));
    }

    #[test]
    fn test_generate_token() {
        let a = generate_token(32);
        let b = generate_token(32);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
