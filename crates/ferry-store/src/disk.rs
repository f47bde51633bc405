use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_name, FileStore};

/// Directory-backed store: each key is one plain file under `root`.
///
/// The root directory is created at open time if it does not exist,
/// so a fresh server starts with an empty store.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            debug!(root = %root.display(), "creating storage directory");
            std::fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    /// The directory this store reads and writes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> StoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl std::fmt::Debug for DiskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStore").field("root", &self.root).finish()
    }
}

#[async_trait]
impl FileStore for DiskStore {
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, data: &[u8]) -> StoreResult<()> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<()> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn scan(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                // Non-UTF-8 names cannot travel over the text protocol.
                Err(raw) => debug!(name = ?raw, "skipping non-UTF-8 filename in scan"),
            }
        }
        names.sort();
        Ok(names)
    }
}
