//! # secure-store
//!
//! Client-side secure storage for the MedicalCor dashboard:
//! - Encrypted (AES-256-GCM), integrity-checked (SHA-256), expiring records
//! - Pluggable session and durable mediums
//! - API key and user session caches built on named policies
//! - In-memory rate limiting and a redacting audit log
//!
//! With the default key source the encryption key is derived from a secret
//! embedded in the client. That hides values from casual inspection of the
//! medium but is not confidentiality against anyone holding the build; use
//! the keychain key source where the platform offers one.

pub mod api_keys;
pub mod audit;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod medium;
pub mod ratelimit;
pub mod session;
pub mod settings;
pub mod store;

pub use api_keys::ApiKeyCache;
pub use audit::{AuditEntry, AuditLevel, AuditLogger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StoreError};
pub use keys::{KeyProvider, KeySource, KeychainKeyStore};
pub use medium::{FileMedium, MemoryMedium, StorageMedium};
pub use ratelimit::RateLimiter;
pub use session::{Session, SessionCache};
pub use settings::{KeySourceSettings, SettingsManager, StoreSettings};
pub use store::{SecureStore, SecureStoreBuilder, StorageKey, StoragePolicy, StoredRecord, SweepReport};
