//! Error types for secure-store

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Corrupt entry: {0}")]
    CorruptEntry(String),

    #[error("Entry expired: {0}")]
    ExpiredEntry(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Decryption failed: {0}")]
    DecryptionError(String),

    #[error("Integrity check failed for {0}")]
    IntegrityMismatch(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),

    #[error("Keychain error: {0}")]
    KeychainError(String),

    #[error("Storage medium error: {0}")]
    MediumError(String),

    #[error("Storage quota exceeded: {used} of {limit} bytes")]
    QuotaExceeded { used: usize, limit: usize },

    #[error("Could not save {key}: {source}")]
    StorageFailure {
        key: String,
        #[source]
        source: Box<StoreError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StoreError {
    /// Wrap a write-path error so callers see which key failed to persist
    pub fn storage_failure(key: &str, source: StoreError) -> Self {
        match source {
            // Already wrapped further down the call chain
            err @ StoreError::StorageFailure { .. } => err,
            other => StoreError::StorageFailure {
                key: key.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Whether this error came from the cryptographic layer
    pub fn is_crypto(&self) -> bool {
        matches!(
            self,
            StoreError::EncryptionError(_)
                | StoreError::DecryptionError(_)
                | StoreError::KeyDerivationError(_)
                | StoreError::KeychainError(_)
        )
    }
}
