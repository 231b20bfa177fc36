//! AES-256-GCM authenticated encryption
//!
//! Stored format: `base64(nonce || ciphertext || auth_tag)`
//! - Nonce: 12 bytes (96 bits), fresh from the OS RNG on every write
//! - Ciphertext: variable length
//! - Auth tag: 16 bytes, appended by aes-gcm

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};

use super::EncryptionKey;
use crate::error::{Result, StoreError};

/// Nonce length for AES-GCM
pub const NONCE_LEN: usize = 12;

const TAG_LEN: usize = 16;

/// Encrypted payload: nonce plus ciphertext with the auth tag appended
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    /// Per-write nonce (not secret)
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext followed by the 16-byte GCM tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Concatenate nonce and ciphertext
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a `nonce || ciphertext` buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(StoreError::DecryptionError(format!(
                "Payload too short: expected at least {} bytes, got {}",
                NONCE_LEN + TAG_LEN,
                bytes.len()
            )));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[..NONCE_LEN]);

        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_LEN..].to_vec(),
        })
    }

    /// Parse from the base64 storage format
    pub fn from_string(s: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| StoreError::DecryptionError(format!("Invalid base64 payload: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Display for EncryptedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&base64::engine::general_purpose::STANDARD.encode(self.to_bytes()))
    }
}

/// Encrypt plaintext using AES-256-GCM with a random nonce
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<EncryptedPayload> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| StoreError::EncryptionError(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| StoreError::EncryptionError(format!("Secure random unavailable: {}", e)))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| StoreError::EncryptionError(e.to_string()))?;

    Ok(EncryptedPayload { nonce, ciphertext })
}

/// Encrypt a string and return the base64 storage format
pub fn encrypt_string(plaintext: &str, key: &EncryptionKey) -> Result<String> {
    Ok(encrypt(plaintext.as_bytes(), key)?.to_string())
}

/// Decrypt and authenticate a payload
pub fn decrypt(payload: &EncryptedPayload, key: &EncryptionKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| StoreError::DecryptionError(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(&payload.nonce), payload.ciphertext.as_slice())
        .map_err(|e| StoreError::DecryptionError(e.to_string()))
}

/// Decrypt from the base64 storage format and return as string
pub fn decrypt_string(encoded: &str, key: &EncryptionKey) -> Result<String> {
    let payload = EncryptedPayload::from_string(encoded)?;
    let plaintext = decrypt(&payload, key)?;
    String::from_utf8(plaintext)
        .map_err(|e| StoreError::DecryptionError(format!("Invalid UTF-8: {}", e)))
}
