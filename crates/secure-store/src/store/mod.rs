//! The secure local store
//!
//! - [`StoredRecord`]: self-describing JSON envelope written to a medium
//! - [`StoragePolicy`]: encryption, scope and expiry for a logical store
//! - [`SecureStore`]: `load` / `save` / `remove` / `clear_expired`

mod policy;
mod record;
mod secure_store;

pub use policy::StoragePolicy;
pub use record::{StorageKey, StoredRecord, DEFAULT_NAMESPACE};
pub use secure_store::{SecureStore, SecureStoreBuilder, SweepReport};
