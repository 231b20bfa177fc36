//! Medium trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Trait for string key-value storage mediums
///
/// A `set` replaces the whole value for a key; readers observe either the
/// old value or the new one.
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// List every key currently in the medium
    async fn keys(&self) -> Result<Vec<String>>;

    /// Whether values survive a process restart
    fn is_persistent(&self) -> bool;

    /// Get a human-readable name for this medium
    fn backend_name(&self) -> &'static str;
}
