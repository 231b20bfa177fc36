//! On-medium record envelope and namespaced keys

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::clock::duration_millis;
use crate::error::{Result, StoreError};

/// Default namespace prefix for store entries
pub const DEFAULT_NAMESPACE: &str = "secure_";

/// JSON envelope written to the medium for one logical value
///
/// Self-describing: `encrypted` says whether `value` must be decrypted and a
/// present `hash` must match the plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Serialized JSON value, or base64 of `nonce || ciphertext` when encrypted
    pub value: String,
    /// Write time in epoch milliseconds
    pub timestamp: i64,
    /// Hex SHA-256 of the plaintext, set only for encrypted records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

impl StoredRecord {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| StoreError::CorruptEntry(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Age of the record at `now_millis`; records from the future have age zero
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.timestamp).max(0)
    }

    pub fn is_expired(&self, max_age: Option<Duration>, now_millis: i64) -> bool {
        match max_age {
            Some(max_age) => self.age_millis(now_millis) > duration_millis(max_age),
            None => false,
        }
    }
}

/// Namespaced medium key for a logical key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Build `namespace + logical_key`, rejecting empty or control-character keys
    pub fn new(namespace: &str, logical_key: &str) -> Result<Self> {
        if logical_key.is_empty() {
            return Err(StoreError::InvalidKey("key must not be empty".to_string()));
        }
        if logical_key.chars().any(char::is_control) {
            return Err(StoreError::InvalidKey(format!(
                "key {:?} contains control characters",
                logical_key
            )));
        }
        Ok(Self(format!("{}{}", namespace, logical_key)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip the namespace from a raw medium key
    pub fn logical<'a>(namespace: &str, raw: &'a str) -> Option<&'a str> {
        raw.strip_prefix(namespace).filter(|k| !k.is_empty())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
