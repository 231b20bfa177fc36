//! API key cache
//!
//! Holds third-party API keys (OpenAI and friends) as one provider -> key map
//! under the [`StoragePolicy::api_keys`] preset.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::crypto::SecretString;
use crate::error::{Result, StoreError};
use crate::store::{SecureStore, StoragePolicy};

/// Logical store key for the provider map
pub const API_KEYS_KEY: &str = "api_keys";

/// Display form of an API key: first 8 characters
pub fn mask_api_key(api_key: &str) -> String {
    let prefix: String = api_key.chars().take(8).collect();
    format!("{}...", prefix)
}

/// API key cache over a [`SecureStore`]
pub struct ApiKeyCache {
    store: Arc<SecureStore>,
    policy: StoragePolicy,
}

impl ApiKeyCache {
    pub fn new(store: Arc<SecureStore>) -> Self {
        Self::with_policy(store, StoragePolicy::api_keys())
    }

    pub fn with_policy(store: Arc<SecureStore>, policy: StoragePolicy) -> Self {
        Self { store, policy }
    }

    async fn load_all(&self) -> BTreeMap<String, String> {
        self.store.load_or_default(API_KEYS_KEY, &self.policy).await
    }

    /// Store `api_key` for `provider`, replacing any previous key
    pub async fn set(&self, provider: &str, api_key: &str) -> Result<()> {
        if provider.is_empty() || api_key.is_empty() {
            return Err(StoreError::storage_failure(
                API_KEYS_KEY,
                StoreError::InvalidKey("provider and key must not be empty".to_string()),
            ));
        }

        let mut keys = self.load_all().await;
        keys.insert(provider.to_string(), api_key.to_string());
        self.store.save(API_KEYS_KEY, &keys, &self.policy).await?;

        info!("Saved API key for {} ({})", provider, mask_api_key(api_key));
        Ok(())
    }

    /// The key for `provider`, if configured and not expired
    pub async fn get(&self, provider: &str) -> Option<SecretString> {
        self.load_all().await.remove(provider).map(SecretString::new)
    }

    /// Providers with a configured key and their masked keys
    pub async fn list_masked(&self) -> Vec<(String, String)> {
        self.load_all()
            .await
            .into_iter()
            .map(|(provider, key)| {
                let masked = mask_api_key(&key);
                (provider, masked)
            })
            .collect()
    }

    /// Forget the key for one provider
    pub async fn remove(&self, provider: &str) -> Result<()> {
        let mut keys = self.load_all().await;
        if keys.remove(provider).is_none() {
            return Ok(());
        }

        if keys.is_empty() {
            self.store.remove(API_KEYS_KEY).await?;
        } else {
            self.store.save(API_KEYS_KEY, &keys, &self.policy).await?;
        }

        info!("Removed API key for {}", provider);
        Ok(())
    }

    /// Forget every key
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(API_KEYS_KEY).await
    }
}
