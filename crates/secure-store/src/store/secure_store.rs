//! Encrypted, integrity-checked, expiring key-value store
//!
//! Reads never fail: a missing, expired, tampered or unreadable entry degrades
//! to the caller's default (deleting the entry where it is bad). Writes always
//! report failure, since silently losing a secret is worse than an error the
//! caller can surface.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::policy::StoragePolicy;
use super::record::{StorageKey, StoredRecord, DEFAULT_NAMESPACE};
use crate::clock::{Clock, SystemClock};
use crate::crypto::{decrypt_string, encrypt_string, integrity_hash, verify_integrity, SecretString};
use crate::error::{Result, StoreError};
use crate::keys::{KeyProvider, KeySource};
use crate::medium::{MemoryMedium, StorageMedium};

/// Outcome of a [`SecureStore::clear_expired`] sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Namespaced entries examined
    pub scanned: usize,
    /// Entries removed for exceeding `max_age`
    pub expired: usize,
    /// Entries removed because they did not parse as a record
    pub corrupt: usize,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired + self.corrupt
    }
}

/// Secure local store over a session medium and a durable medium
pub struct SecureStore {
    session: Arc<dyn StorageMedium>,
    durable: Arc<dyn StorageMedium>,
    keys: KeyProvider,
    clock: Arc<dyn Clock>,
    namespace: String,
}

impl SecureStore {
    pub fn builder() -> SecureStoreBuilder {
        SecureStoreBuilder::default()
    }

    /// Two in-memory mediums, the embedded app secret and the system clock
    pub fn in_memory() -> Self {
        Self::builder().build()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key_provider(&self) -> &KeyProvider {
        &self.keys
    }

    fn medium(&self, policy: &StoragePolicy) -> &Arc<dyn StorageMedium> {
        if policy.session_scoped {
            &self.session
        } else {
            &self.durable
        }
    }

    fn storage_key(&self, key: &str) -> Result<StorageKey> {
        StorageKey::new(&self.namespace, key)
    }

    fn derivation_input<'a>(storage_key: &'a StorageKey, policy: &'a StoragePolicy) -> &'a str {
        policy.key_domain.as_deref().unwrap_or(storage_key.as_str())
    }

    /// Load the value under `key`, or `default` when there is no usable value
    pub async fn load<T: DeserializeOwned>(&self, key: &str, policy: &StoragePolicy, default: T) -> T {
        let storage_key = match self.storage_key(key) {
            Ok(storage_key) => storage_key,
            Err(e) => {
                warn!("Refusing to load: {}", e);
                return default;
            }
        };

        let medium = self.medium(policy);
        let raw = match medium.get(storage_key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                warn!("Could not read {} from {}: {}", storage_key, medium.backend_name(), e);
                return default;
            }
        };

        match self.open_record(&storage_key, policy, &raw).await {
            Ok(value) => value,
            Err(StoreError::ExpiredEntry(_)) => {
                debug!("Entry {} expired, removing", storage_key);
                Self::discard(medium, &storage_key).await;
                default
            }
            Err(e) if e.is_crypto() => {
                warn!("Discarding {}: could not decrypt ({})", storage_key, e);
                Self::discard(medium, &storage_key).await;
                default
            }
            Err(e) => {
                warn!("Discarding unreadable entry {}: {}", storage_key, e);
                Self::discard(medium, &storage_key).await;
                default
            }
        }
    }

    /// [`load`](Self::load) with `T::default()` as the fallback
    pub async fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        key: &str,
        policy: &StoragePolicy,
    ) -> T {
        self.load(key, policy, T::default()).await
    }

    async fn open_record<T: DeserializeOwned>(
        &self,
        storage_key: &StorageKey,
        policy: &StoragePolicy,
        raw: &str,
    ) -> Result<T> {
        let record = StoredRecord::parse(raw)?;
        if record.is_expired(policy.max_age, self.clock.now_millis()) {
            return Err(StoreError::ExpiredEntry(storage_key.to_string()));
        }

        let StoredRecord {
            value,
            hash,
            encrypted,
            ..
        } = record;

        let plaintext = if encrypted {
            let key = self
                .keys
                .key_for(Self::derivation_input(storage_key, policy))
                .await?;
            SecretString::new(decrypt_string(&value, &key)?)
        } else {
            SecretString::new(value)
        };

        if let Some(expected) = hash {
            if !verify_integrity(plaintext.expose().as_bytes(), &expected) {
                return Err(StoreError::IntegrityMismatch(storage_key.to_string()));
            }
        }

        serde_json::from_str(plaintext.expose())
            .map_err(|e| StoreError::CorruptEntry(format!("{}: {}", storage_key, e)))
    }

    async fn discard(medium: &Arc<dyn StorageMedium>, storage_key: &StorageKey) {
        if let Err(e) = medium.remove(storage_key.as_str()).await {
            warn!("Could not remove {}: {}", storage_key, e);
        }
    }

    /// Serialize, optionally encrypt, and replace the record under `key`
    ///
    /// On failure the previous record, if any, is left as it was.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        policy: &StoragePolicy,
    ) -> Result<()> {
        self.write_record(key, value, policy)
            .await
            .map_err(|e| StoreError::storage_failure(key, e))
    }

    async fn write_record<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        policy: &StoragePolicy,
    ) -> Result<()> {
        let storage_key = self.storage_key(key)?;
        let plaintext = SecretString::new(serde_json::to_string(value)?);
        let timestamp = self.clock.now_millis();

        let record = if policy.encrypt {
            let enc_key = self
                .keys
                .key_for(Self::derivation_input(&storage_key, policy))
                .await?;
            StoredRecord {
                value: encrypt_string(plaintext.expose(), &enc_key)?,
                timestamp,
                hash: Some(integrity_hash(plaintext.expose().as_bytes())),
                encrypted: true,
            }
        } else {
            StoredRecord {
                value: plaintext.expose().to_string(),
                timestamp,
                hash: None,
                encrypted: false,
            }
        };

        let medium = self.medium(policy);
        medium.set(storage_key.as_str(), &record.to_json()?).await?;

        debug!(
            "Saved {} to {} (encrypted: {})",
            storage_key,
            medium.backend_name(),
            record.encrypted
        );
        Ok(())
    }

    /// Delete `key` from both mediums; missing keys are fine
    pub async fn remove(&self, key: &str) -> Result<()> {
        let storage_key = self.storage_key(key)?;

        self.session.remove(storage_key.as_str()).await?;
        self.durable.remove(storage_key.as_str()).await?;

        debug!("Removed {}", storage_key);
        Ok(())
    }

    /// Evict expired and unparsable entries in the policy's medium
    ///
    /// Only keys under this store's namespace are considered. A failed delete
    /// of one entry is logged and the sweep moves on.
    pub async fn clear_expired(&self, policy: &StoragePolicy) -> Result<SweepReport> {
        let medium = self.medium(policy);
        let now = self.clock.now_millis();
        let mut report = SweepReport::default();

        for raw_key in medium.keys().await? {
            if StorageKey::logical(&self.namespace, &raw_key).is_none() {
                continue;
            }
            report.scanned += 1;

            let raw = match medium.get(&raw_key).await {
                Ok(Some(raw)) => raw,
                // Removed since listing
                Ok(None) => continue,
                Err(e) => {
                    warn!("Sweep could not read {}: {}", raw_key, e);
                    continue;
                }
            };

            let corrupt = match StoredRecord::parse(&raw) {
                Ok(record) if record.is_expired(policy.max_age, now) => false,
                Ok(_) => continue,
                Err(_) => true,
            };

            match medium.remove(&raw_key).await {
                Ok(()) if corrupt => report.corrupt += 1,
                Ok(()) => report.expired += 1,
                Err(e) => warn!("Sweep could not remove {}: {}", raw_key, e),
            }
        }

        info!(
            "Swept {}: {} scanned, {} expired, {} corrupt",
            medium.backend_name(),
            report.scanned,
            report.expired,
            report.corrupt
        );
        Ok(report)
    }

    /// Whether a raw entry exists for `key`, without validating it
    pub async fn contains(&self, key: &str, policy: &StoragePolicy) -> Result<bool> {
        let storage_key = self.storage_key(key)?;
        Ok(self.medium(policy).get(storage_key.as_str()).await?.is_some())
    }

    /// Logical keys present in the policy's medium, sorted
    pub async fn keys(&self, policy: &StoragePolicy) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .medium(policy)
            .keys()
            .await?
            .iter()
            .filter_map(|raw| StorageKey::logical(&self.namespace, raw))
            .map(str::to_string)
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Builder wiring a [`SecureStore`]'s dependencies
///
/// Unset mediums default to fresh [`MemoryMedium`]s, the key source to the
/// embedded app secret and the clock to [`SystemClock`].
#[derive(Default)]
pub struct SecureStoreBuilder {
    session: Option<Arc<dyn StorageMedium>>,
    durable: Option<Arc<dyn StorageMedium>>,
    keys: Option<KeyProvider>,
    clock: Option<Arc<dyn Clock>>,
    namespace: Option<String>,
}

impl SecureStoreBuilder {
    pub fn session<M: StorageMedium + 'static>(mut self, medium: Arc<M>) -> Self {
        let medium: Arc<dyn StorageMedium> = medium;
        self.session = Some(medium);
        self
    }

    pub fn durable<M: StorageMedium + 'static>(mut self, medium: Arc<M>) -> Self {
        let medium: Arc<dyn StorageMedium> = medium;
        self.durable = Some(medium);
        self
    }

    pub fn key_source(mut self, source: KeySource) -> Self {
        self.keys = Some(KeyProvider::new(source));
        self
    }

    pub fn key_provider(mut self, provider: KeyProvider) -> Self {
        self.keys = Some(provider);
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: Arc<C>) -> Self {
        let clock: Arc<dyn Clock> = clock;
        self.clock = Some(clock);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn build(self) -> SecureStore {
        let session = self.session.unwrap_or_else(|| {
            let medium: Arc<dyn StorageMedium> = Arc::new(MemoryMedium::new());
            medium
        });
        let durable = self.durable.unwrap_or_else(|| {
            let medium: Arc<dyn StorageMedium> = Arc::new(MemoryMedium::new());
            medium
        });
        let clock = self.clock.unwrap_or_else(|| {
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            clock
        });

        SecureStore {
            session,
            durable,
            keys: self.keys.unwrap_or_default(),
            clock,
            namespace: self
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        }
    }
}
