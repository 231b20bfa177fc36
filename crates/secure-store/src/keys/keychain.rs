//! OS keychain holder for the store master key
//!
//! Uses the system keychain:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use base64::Engine;
use keyring::Entry;
use tracing::{debug, info, warn};

use crate::crypto::EncryptionKey;
use crate::error::{Result, StoreError};

/// Default service name used for keychain entries
pub const DEFAULT_SERVICE: &str = "medicalcor-secure-store";

const MASTER_KEY_ACCOUNT: &str = "master-key";

/// Keeps one random 256-bit master key in the OS keychain
#[derive(Debug, Clone)]
pub struct KeychainKeyStore {
    service: String,
}

impl KeychainKeyStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, MASTER_KEY_ACCOUNT)
            .map_err(|e| StoreError::KeychainError(e.to_string()))
    }

    /// Test if the keychain is usable by round-tripping a throwaway entry
    pub fn is_available(&self) -> bool {
        match Entry::new(&self.service, "__test_availability__") {
            Ok(entry) => {
                if entry.set_password("test").is_ok() {
                    let _ = entry.delete_password();
                    true
                } else {
                    warn!("Keychain for {} is not available", self.service);
                    false
                }
            }
            Err(_) => false,
        }
    }

    /// Load the master key, generating and storing one on first use
    pub fn load_or_create(&self) -> Result<EncryptionKey> {
        let entry = self.entry()?;

        match entry.get_password() {
            Ok(encoded) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| StoreError::KeychainError(format!("Base64 decode error: {}", e)))?;
                debug!("Loaded master key from keychain ({})", self.service);
                EncryptionKey::from_slice(&bytes).ok_or_else(|| {
                    StoreError::KeychainError(format!(
                        "Stored master key has {} bytes, expected 32",
                        bytes.len()
                    ))
                })
            }
            Err(keyring::Error::NoEntry) => {
                let mut key_bytes = [0u8; 32];
                rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut key_bytes);
                let key = EncryptionKey::new(key_bytes);

                let encoded = base64::engine::general_purpose::STANDARD.encode(key.as_bytes());
                entry
                    .set_password(&encoded)
                    .map_err(|e| StoreError::KeychainError(e.to_string()))?;

                info!("Created new master key in keychain ({})", self.service);
                Ok(key)
            }
            Err(e) => Err(StoreError::KeychainError(e.to_string())),
        }
    }

    /// Delete the master key; every record encrypted under it becomes unreadable
    pub fn delete(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::KeychainError(e.to_string())),
        }
    }
}

impl Default for KeychainKeyStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}
