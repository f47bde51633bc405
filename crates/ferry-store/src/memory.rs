use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_name, FileStore};

/// In-memory, HashMap-based store.
///
/// Intended for tests and embedding. Contents are held behind a `RwLock`
/// and cloned on read.
pub struct MemoryStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Number of files currently stored.
    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.files.read().expect("lock poisoned").is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("file_count", &self.len())
            .finish()
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        Ok(self.files.read().expect("lock poisoned").contains_key(name))
    }

    async fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        validate_name(name)?;
        self.files
            .read()
            .expect("lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn write(&self, name: &str, data: &[u8]) -> StoreResult<()> {
        validate_name(name)?;
        self.files
            .write()
            .expect("lock poisoned")
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<()> {
        validate_name(name)?;
        self.files
            .write()
            .expect("lock poisoned")
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn scan(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .files
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }
}
