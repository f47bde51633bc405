//! Flat-file storage backend for the Ferry transfer service.
//!
//! A store is one directory of plain files, no sidecar metadata. The
//! service rebuilds everything else (resource registry, directory
//! snapshot) in memory from the directory contents at startup.

pub mod disk;
pub mod error;
pub mod memory;
pub mod traits;

pub use disk::DiskStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use traits::{validate_name, FileStore};
