//! Where record encryption keys come from
//!
//! Every encrypted record is sealed with a key derived from a *derivation
//! input*: the namespaced storage key, or the policy's key domain when one is
//! set. [`KeyProvider`] turns that input into an [`EncryptionKey`] according
//! to its [`KeySource`].

mod keychain;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::crypto::{
    derive_from_app_secret, derive_from_passphrase, derive_subkey, EncryptionKey,
    KeyDerivationParams, SecretString,
};
use crate::error::{Result, StoreError};

pub use keychain::{KeychainKeyStore, DEFAULT_SERVICE};

/// Secret bundled with the client build
pub const DEFAULT_APP_SECRET: &str = "medicalcor-secure-storage-v1";

/// Origin of key material
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Embedded secret padded/truncated together with the derivation input.
    /// Anyone holding the client binary can recover it.
    AppSecret(SecretString),
    /// Argon2id master key from a user passphrase
    Passphrase {
        passphrase: SecretString,
        salt: String,
        params: KeyDerivationParams,
    },
    /// Random master key held in the OS keychain
    Keychain(KeychainKeyStore),
}

impl Default for KeySource {
    fn default() -> Self {
        KeySource::AppSecret(SecretString::new(DEFAULT_APP_SECRET))
    }
}

/// Derives per-record encryption keys, caching any master key
#[derive(Debug)]
pub struct KeyProvider {
    source: KeySource,
    master: OnceCell<EncryptionKey>,
}

impl KeyProvider {
    pub fn new(source: KeySource) -> Self {
        Self {
            source,
            master: OnceCell::new(),
        }
    }

    pub fn app_secret(secret: impl Into<String>) -> Self {
        Self::new(KeySource::AppSecret(SecretString::new(secret)))
    }

    pub fn passphrase(
        passphrase: impl Into<String>,
        salt: impl Into<String>,
        params: Option<KeyDerivationParams>,
    ) -> Self {
        Self::new(KeySource::Passphrase {
            passphrase: SecretString::new(passphrase),
            salt: salt.into(),
            params: params.unwrap_or_default(),
        })
    }

    pub fn keychain(service: impl Into<String>) -> Self {
        Self::new(KeySource::Keychain(KeychainKeyStore::new(service)))
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    /// Key for one derivation input
    pub async fn key_for(&self, input: &str) -> Result<EncryptionKey> {
        let master = match &self.source {
            KeySource::AppSecret(secret) => {
                return derive_from_app_secret(secret.expose(), input);
            }
            KeySource::Passphrase {
                passphrase,
                salt,
                params,
            } => {
                let (passphrase, salt, params) = (passphrase.clone(), salt.clone(), params.clone());
                self.master
                    .get_or_try_init(|| {
                        run_blocking(move || {
                            debug!("Deriving master key from passphrase");
                            derive_from_passphrase(passphrase.expose(), &salt, Some(params))
                        })
                    })
                    .await?
            }
            KeySource::Keychain(store) => {
                let store = store.clone();
                self.master
                    .get_or_try_init(|| run_blocking(move || store.load_or_create()))
                    .await?
            }
        };

        Ok(derive_subkey(master, input))
    }
}

/// Argon2 and keychain calls block; keep them off the async workers
async fn run_blocking<F>(f: F) -> Result<EncryptionKey>
where
    F: FnOnce() -> Result<EncryptionKey> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::KeyDerivationError(format!("Key task failed: {}", e)))?
}

impl Default for KeyProvider {
    fn default() -> Self {
        Self::new(KeySource::default())
    }
}
