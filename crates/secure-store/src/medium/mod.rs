//! Key-value mediums the secure store persists records into
//!
//! Two backends:
//! 1. In-memory (session scope, lives as long as the process)
//! 2. JSON file (durable scope)

mod file;
mod memory;
mod traits;

pub use file::FileMedium;
pub use memory::MemoryMedium;
pub use traits::StorageMedium;
