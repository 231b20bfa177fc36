//! Store settings management
//!
//! Non-sensitive configuration kept in a plain JSON file next to the durable
//! medium. Missing files and missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::audit::{AuditLogger, DEFAULT_CAPACITY};
use crate::error::{Result, StoreError};
use crate::keys::{KeyProvider, DEFAULT_APP_SECRET, DEFAULT_SERVICE};
use crate::ratelimit::RateLimiter;
use crate::store::DEFAULT_NAMESPACE;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Which key source the store should use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum KeySourceSettings {
    /// Embedded app secret (obfuscation only)
    AppSecret { secret: String },
    /// Master key in the OS keychain under `service`
    Keychain { service: String },
}

impl Default for KeySourceSettings {
    fn default() -> Self {
        Self::AppSecret {
            secret: DEFAULT_APP_SECRET.to_string(),
        }
    }
}

impl KeySourceSettings {
    pub fn keychain() -> Self {
        Self::Keychain {
            service: DEFAULT_SERVICE.to_string(),
        }
    }

    pub fn to_provider(&self) -> KeyProvider {
        match self {
            Self::AppSecret { secret } => KeyProvider::app_secret(secret.clone()),
            Self::Keychain { service } => KeyProvider::keychain(service.clone()),
        }
    }
}

/// Rate limit defaults for callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

/// Store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Settings file version
    pub version: u32,
    /// Prefix for every store key in a medium
    pub namespace: String,
    pub key_source: KeySourceSettings,
    /// Audit log ring buffer size
    pub audit_capacity: usize,
    pub rate_limit: RateLimitSettings,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            version: 1,
            namespace: DEFAULT_NAMESPACE.to_string(),
            key_source: KeySourceSettings::default(),
            audit_capacity: DEFAULT_CAPACITY,
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl StoreSettings {
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit.max_requests,
            Duration::from_secs(self.rate_limit.window_secs),
        )
    }

    pub fn audit_logger(&self) -> AuditLogger {
        AuditLogger::new(self.audit_capacity)
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: StoreSettings,
}

impl SettingsManager {
    /// Load settings from `storage_dir`, using defaults when absent
    pub fn new(storage_dir: &Path) -> Result<Self> {
        Self::from_file(storage_dir.join(SETTINGS_FILE_NAME))
    }

    /// Load settings from an explicit file path
    pub fn from_file(settings_file: PathBuf) -> Result<Self> {
        let settings = Self::load_from_file(&settings_file)?;
        Ok(Self {
            settings_file,
            settings,
        })
    }

    fn load_from_file(path: &Path) -> Result<StoreSettings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(StoreSettings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: StoreSettings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        if let Some(parent) = self.settings_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    pub fn get(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut StoreSettings {
        &mut self.settings
    }

    /// Update settings and save
    pub async fn update(&mut self, settings: StoreSettings) -> Result<()> {
        self.settings = settings;
        self.save().await
    }

    /// Reset settings to defaults and delete settings file
    pub async fn reset(&mut self) -> Result<()> {
        self.settings = StoreSettings::default();

        if self.settings_file.exists() {
            tokio::fs::remove_file(&self.settings_file)
                .await
                .map_err(|e| StoreError::MediumError(e.to_string()))?;
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_settings_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path()).unwrap();

        let settings = manager.get();
        assert_eq!(settings.namespace, "secure_");
        assert_eq!(settings.audit_capacity, 1000);
        assert_eq!(settings.key_source, KeySourceSettings::default());
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut manager = SettingsManager::new(temp_dir.path()).unwrap();
            manager.get_mut().namespace = "mc_".to_string();
            manager.get_mut().key_source = KeySourceSettings::keychain();
            manager.get_mut().rate_limit.max_requests = 3;
            manager.save().await.unwrap();
        }

        {
            let manager = SettingsManager::new(temp_dir.path()).unwrap();
            assert_eq!(manager.get().namespace, "mc_");
            assert_eq!(manager.get().key_source, KeySourceSettings::keychain());
            assert_eq!(manager.get().rate_limiter().max_requests(), 3);
        }
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(SETTINGS_FILE_NAME),
            r#"{"auditCapacity": 50, "keySource": {"kind": "keychain", "service": "svc"}}"#,
        )
        .unwrap();

        let manager = SettingsManager::new(temp_dir.path()).unwrap();
        assert_eq!(manager.get().audit_capacity, 50);
        assert_eq!(manager.get().namespace, "secure_");
        assert_eq!(manager.get().audit_logger().capacity(), 50);
        assert_eq!(
            manager.get().key_source,
            KeySourceSettings::Keychain {
                service: "svc".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_reset() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path()).unwrap();
        manager.get_mut().audit_capacity = 5;
        manager.save().await.unwrap();

        manager.reset().await.unwrap();

        assert_eq!(manager.get(), &StoreSettings::default());
        assert!(!manager.path().exists());
    }
}
