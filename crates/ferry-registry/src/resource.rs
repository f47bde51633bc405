use std::sync::Mutex;

use crate::rwlock::{ExclusiveGuard, ReaderPreferringLock};

/// Lifecycle of a resource, orthogonal to who currently holds access.
///
/// A delete announces itself by moving the resource to `PendingDelete`
/// before it ever waits for exclusive access; the move to `Deleted`
/// happens once the file is actually gone from storage. Either non-live
/// state makes downloads answer "not found" without touching storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifeState {
    Live,
    PendingDelete,
    Deleted,
}

/// Lifecycle flag plus the count of uploads that have announced intent
/// but do not yet hold exclusive access. Kept under one mutex so that
/// the eviction decision — deleted, and nobody mid-upload — is a single
/// atomic check.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    pub(crate) state: LifeState,
    pub(crate) pending_writers: usize,
}

/// Synchronization object bound one-to-one with a stored filename.
///
/// Downloads join as sharers, uploads and deletes take the file
/// exclusively; see [`ReaderPreferringLock`] for the priority policy.
/// The lifecycle mutex is always taken before any wait on the access
/// lock, never while holding it against the other order, and nothing
/// awaits while it is held.
#[derive(Debug)]
pub struct FileResource {
    name: String,
    pub(crate) lifecycle: Mutex<Lifecycle>,
    access: ReaderPreferringLock,
}

impl FileResource {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Mutex::new(Lifecycle {
                state: LifeState::Live,
                pending_writers: 0,
            }),
            access: ReaderPreferringLock::new(),
        }
    }

    /// The filename this resource guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Join the download group for this file. Pair with [`leave_readers`];
    /// the caller must reach it on every exit path.
    ///
    /// [`leave_readers`]: FileResource::leave_readers
    pub async fn join_readers(&self) {
        self.access.begin_shared().await;
    }

    pub async fn leave_readers(&self) {
        self.access.end_shared().await;
    }

    /// Take the file exclusively, for upload and delete.
    pub async fn lock_exclusive(&self) -> ExclusiveGuard<'_> {
        self.access.acquire_exclusive().await
    }

    /// Record that an upload intends to write, before it waits for
    /// exclusive access. A concurrent delete sees the announcement and
    /// leaves the resource registered for the upload to resurrect.
    pub fn announce_writer(&self) {
        self.lifecycle.lock().expect("lock poisoned").pending_writers += 1;
    }

    /// Retire an announcement; called once the upload holds the lock.
    pub fn retire_writer(&self) {
        let mut life = self.lifecycle.lock().expect("lock poisoned");
        debug_assert!(life.pending_writers > 0, "retire without announce");
        life.pending_writers -= 1;
    }

    /// Number of uploads currently announced but not yet holding the lock.
    pub fn pending_writers(&self) -> usize {
        self.lifecycle.lock().expect("lock poisoned").pending_writers
    }

    /// Whether the file is marked as going away (or gone). Downloads
    /// answer "not found" without touching storage when this is set.
    pub fn is_defunct(&self) -> bool {
        self.life_state() != LifeState::Live
    }

    pub fn life_state(&self) -> LifeState {
        self.lifecycle.lock().expect("lock poisoned").state
    }

    /// Announce a delete. Returns `false` if another delete already
    /// claimed this resource (in flight or completed), in which case the
    /// caller replies "not found" without waiting for the lock.
    pub fn begin_delete(&self) -> bool {
        let mut life = self.lifecycle.lock().expect("lock poisoned");
        match life.state {
            LifeState::Live => {
                life.state = LifeState::PendingDelete;
                true
            }
            LifeState::PendingDelete | LifeState::Deleted => false,
        }
    }

    /// Roll an announced delete back to live: the client declined the
    /// confirmation, the file turned out not to exist, or the transport
    /// died first. No-op unless the delete is still pending — an upload
    /// queued ahead of the delete may have resurrected the resource, and
    /// a committed delete stays committed.
    pub fn abort_delete(&self) {
        let mut life = self.lifecycle.lock().expect("lock poisoned");
        if life.state == LifeState::PendingDelete {
            life.state = LifeState::Live;
        }
    }

    /// The file is gone from storage.
    pub fn commit_delete(&self) {
        self.lifecycle.lock().expect("lock poisoned").state = LifeState::Deleted;
    }

    /// Mark the file live again. An upload commits (or fails after the
    /// existence check) with the flag cleared either way: the file is no
    /// longer known to be removed.
    pub fn resurrect(&self) {
        self.lifecycle.lock().expect("lock poisoned").state = LifeState::Live;
    }
}
