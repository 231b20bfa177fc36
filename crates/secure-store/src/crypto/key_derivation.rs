//! Encryption key derivation
//!
//! Three schemes:
//! - app secret: `secret || input`, zero-padded or truncated to 32 bytes
//! - passphrase: Argon2id master key
//! - sub-key: SHA-256(master || input), one key per storage key or key domain

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::EncryptionKey;
use crate::error::{Result, StoreError};

/// Parameters for Argon2id key derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB (default: 65536 = 64MB)
    pub memory_cost: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Generate a cryptographically secure random salt
pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).to_string()
}

/// Derive a key from an embedded application secret
///
/// The secret ships inside the client, so this is obfuscation rather than
/// confidentiality. With a secret of 32 bytes or more the `input` is
/// truncated away and every record shares one key.
pub fn derive_from_app_secret(secret: &str, input: &str) -> Result<EncryptionKey> {
    if secret.is_empty() {
        return Err(StoreError::KeyDerivationError(
            "Application secret is empty".to_string(),
        ));
    }

    let mut key_bytes = [0u8; 32];
    for (slot, byte) in key_bytes
        .iter_mut()
        .zip(secret.bytes().chain(input.bytes()))
    {
        *slot = byte;
    }

    Ok(EncryptionKey::new(key_bytes))
}

/// Derive a 256-bit master key from a passphrase using Argon2id
pub fn derive_from_passphrase(
    passphrase: &str,
    salt: &str,
    params: Option<KeyDerivationParams>,
) -> Result<EncryptionKey> {
    let params = params.unwrap_or_default();

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| StoreError::KeyDerivationError(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let salt = SaltString::from_b64(salt)
        .map_err(|e| StoreError::KeyDerivationError(format!("Invalid salt: {}", e)))?;

    let password_hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| StoreError::KeyDerivationError(e.to_string()))?;

    let hash = password_hash
        .hash
        .ok_or_else(|| StoreError::KeyDerivationError("No hash output".to_string()))?;

    EncryptionKey::from_slice(hash.as_bytes())
        .ok_or_else(|| StoreError::KeyDerivationError("Hash output too short".to_string()))
}

/// Derive a per-input key from a master key
pub fn derive_subkey(master: &EncryptionKey, input: &str) -> EncryptionKey {
    let mut hasher = Sha256::new();
    hasher.update(master.as_bytes());
    hasher.update(input.as_bytes());
    EncryptionKey::new(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KeyDerivationParams {
        KeyDerivationParams {
            memory_cost: 8192, // 8 MB (faster for testing)
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_app_secret_pads_short_input() {
        let key = derive_from_app_secret("abc", "secure_x").unwrap();

        let mut expected = [0u8; 32];
        expected[..11].copy_from_slice(b"abcsecure_x");
        assert_eq!(key.as_bytes(), &expected);
    }

    #[test]
    fn test_app_secret_truncates_long_input() {
        let secret = "0123456789abcdef0123456789abcdef-extra";
        let a = derive_from_app_secret(secret, "secure_a").unwrap();
        let b = derive_from_app_secret(secret, "secure_b").unwrap();

        assert_eq!(a.as_bytes(), b"0123456789abcdef0123456789abcdef");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_app_secret_separates_short_secret_keys() {
        let a = derive_from_app_secret("short", "secure_a").unwrap();
        let b = derive_from_app_secret("short", "secure_b").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_empty_app_secret_rejected() {
        assert!(derive_from_app_secret("", "secure_a").is_err());
    }

    #[test]
    fn test_passphrase_deterministic() {
        let salt = generate_salt();

        let key1 = derive_from_passphrase("correct horse", &salt, Some(fast_params())).unwrap();
        let key2 = derive_from_passphrase("correct horse", &salt, Some(fast_params())).unwrap();
        let other = derive_from_passphrase("battery staple", &salt, Some(fast_params())).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_ne!(key1.as_bytes(), other.as_bytes());
    }

    #[test]
    fn test_invalid_salt_rejected() {
        let result = derive_from_passphrase("pw", "!!", Some(fast_params()));
        assert!(matches!(result, Err(StoreError::KeyDerivationError(_))));
    }

    #[test]
    fn test_subkeys_differ_per_input() {
        let master = EncryptionKey::new([9u8; 32]);

        let a = derive_subkey(&master, "secure_a");
        let b = derive_subkey(&master, "secure_b");

        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.as_bytes(), derive_subkey(&master, "secure_a").as_bytes());
    }
}
