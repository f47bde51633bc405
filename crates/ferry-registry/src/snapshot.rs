use std::sync::Mutex;

use tracing::debug;

use ferry_store::{FileStore, StoreResult};

use crate::rwlock::ReaderPreferringLock;

/// Cached directory listing served to list requests.
///
/// Listings join as sharers for the whole time they stream to the client;
/// a rebuild takes the lock exclusively, rescans storage, and replaces
/// the cached names wholesale. Rebuilds run after every committed upload
/// or delete, never after aborted ones, and never because of a listing
/// or download. The reader-preferring policy means back-to-back listings
/// can hold a rebuild off indefinitely, same as per-file readers do to
/// writers.
pub struct DirectorySnapshot {
    names: Mutex<Vec<String>>,
    lock: ReaderPreferringLock,
}

impl DirectorySnapshot {
    /// New snapshot with no names; call [`rebuild`] to populate it.
    ///
    /// [`rebuild`]: DirectorySnapshot::rebuild
    pub fn new() -> Self {
        Self {
            names: Mutex::new(Vec::new()),
            lock: ReaderPreferringLock::new(),
        }
    }

    /// Join the listing group and get the names to stream. The caller
    /// must hold membership until it is done talking to the client and
    /// then call [`end_listing`] on every exit path; rebuilds are held
    /// off for exactly that window.
    ///
    /// [`end_listing`]: DirectorySnapshot::end_listing
    pub async fn begin_listing(&self) -> Vec<String> {
        self.lock.begin_shared().await;
        self.names.lock().expect("lock poisoned").clone()
    }

    pub async fn end_listing(&self) {
        self.lock.end_shared().await;
    }

    /// Rescan storage and replace the cached names. Blocks behind any
    /// in-flight listings.
    pub async fn rebuild(&self, store: &dyn FileStore) -> StoreResult<()> {
        let _guard = self.lock.acquire_exclusive().await;
        let names = store.scan().await?;
        debug!(files = names.len(), "directory snapshot rebuilt");
        *self.names.lock().expect("lock poisoned") = names;
        Ok(())
    }

    /// Copy of the cached names, without joining the listing group.
    pub fn names(&self) -> Vec<String> {
        self.names.lock().expect("lock poisoned").clone()
    }
}

impl Default for DirectorySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirectorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySnapshot")
            .field("files", &self.names().len())
            .finish()
    }
}
