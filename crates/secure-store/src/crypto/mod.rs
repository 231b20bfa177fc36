//! Cryptographic primitives for the secure store
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption with nonce-prefixed payloads
//! - SHA-256 integrity hashing of plaintext values
//! - Key derivation (embedded app secret, Argon2id passphrase, sub-keys)
//! - Secure memory handling with zeroize

mod encryption;
mod hash;
mod key_derivation;
mod secure_memory;

pub use encryption::{decrypt, decrypt_string, encrypt, encrypt_string, EncryptedPayload, NONCE_LEN};
pub use hash::{generate_token, integrity_hash, verify_integrity};
pub use key_derivation::{
    derive_from_app_secret, derive_from_passphrase, derive_subkey, generate_salt,
    KeyDerivationParams,
};
pub use secure_memory::{EncryptionKey, SecretString};
