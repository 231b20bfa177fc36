//! Durable JSON file medium
//!
//! Stores every entry in a single JSON file in the user's data directory.
//! Values are written as-is; encryption happens above this layer.

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::StorageMedium;
use crate::error::{Result, StoreError};

const STORE_FILE_NAME: &str = "secure-store.json";
const FILE_VERSION: u32 = 1;

/// File format for persistent storage
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: HashMap<String, String>,
}

/// Durable file-backed medium
pub struct FileMedium {
    /// Directory holding the store file
    storage_dir: PathBuf,
    /// In-memory copy of the file contents
    cache: RwLock<HashMap<String, String>>,
}

impl FileMedium {
    /// Open the medium in the default data directory
    pub fn new() -> Result<Self> {
        Self::with_dir(Self::default_dir()?)
    }

    /// Open the medium in a custom directory, loading any existing file
    pub fn with_dir(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)?;

        let entries = Self::read_file(&storage_dir.join(STORE_FILE_NAME))?;
        debug!(
            "File medium opened at {:?} with {} entries",
            storage_dir,
            entries.len()
        );

        Ok(Self {
            storage_dir,
            cache: RwLock::new(entries),
        })
    }

    /// Get the default storage directory
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("com", "medicalcor", "secure-store")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                StoreError::MediumError("Could not determine data directory".to_string())
            })
    }

    /// Get the storage directory path
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn file_path(&self) -> PathBuf {
        self.storage_dir.join(STORE_FILE_NAME)
    }

    fn read_file(path: &Path) -> Result<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let contents = std::fs::read_to_string(path)?;
        let file: StoreFile = serde_json::from_str(&contents)
            .map_err(|e| StoreError::MediumError(format!("Unreadable store file: {}", e)))?;

        if file.version != FILE_VERSION {
            return Err(StoreError::MediumError(format!(
                "Unsupported store file version {}",
                file.version
            )));
        }

        Ok(file.entries)
    }

    /// Write the whole map atomically using a temp file
    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let file = StoreFile {
            version: FILE_VERSION,
            entries: entries.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        let path = self.file_path();
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("Persisted {} entries to {:?}", entries.len(), path);
        Ok(())
    }
}

#[async_trait]
impl StorageMedium for FileMedium {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.write().await;
        let previous = cache.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&cache).await {
            // Keep memory consistent with what is on disk
            match previous {
                Some(old) => cache.insert(key.to_string(), old),
                None => cache.remove(key),
            };
            return Err(StoreError::MediumError(format!("Write failed: {}", e)));
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.write().await;

        if let Some(old) = cache.remove(key) {
            if let Err(e) = self.persist(&cache).await {
                cache.insert(key.to_string(), old);
                return Err(StoreError::MediumError(format!("Delete failed: {}", e)));
            }
        }

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.cache.read().await.keys().cloned().collect())
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "JSON File"
    }
}
