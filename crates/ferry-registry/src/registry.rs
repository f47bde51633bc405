use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::resource::{FileResource, LifeState};

/// Maps filename to its single live [`FileResource`].
///
/// Lookup-or-insert and removal each happen under one mutex, so two
/// connections racing on the same filename always end up sharing one
/// resource object. Entries are created lazily on first touch and removed
/// only by a committed delete, via [`evict_if_unclaimed`].
///
/// [`evict_if_unclaimed`]: ResourceRegistry::evict_if_unclaimed
pub struct ResourceRegistry {
    entries: Mutex<HashMap<String, Arc<FileResource>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the resource for `name`, creating and registering it if
    /// absent. Concurrent calls for the same name all receive the same
    /// allocation.
    pub fn get_or_create(&self, name: &str) -> Arc<FileResource> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        if let Some(resource) = entries.get(name) {
            return Arc::clone(resource);
        }
        debug!(file = name, "registering new resource");
        let resource = Arc::new(FileResource::new(name));
        entries.insert(name.to_string(), Arc::clone(&resource));
        resource
    }

    /// Drop the entry for this resource, but only if the registered
    /// object is this exact allocation. Returns `false` when the entry
    /// was already removed or replaced — a signal, not an error: the
    /// caller's reference is simply stale.
    pub fn remove(&self, resource: &Arc<FileResource>) -> bool {
        let mut entries = self.entries.lock().expect("lock poisoned");
        match entries.get(resource.name()) {
            Some(current) if Arc::ptr_eq(current, resource) => {
                entries.remove(resource.name());
                debug!(file = resource.name(), "resource evicted");
                true
            }
            _ => false,
        }
    }

    /// Eviction check for a committed delete: remove the resource iff it
    /// is fully deleted and no upload has announced intent for it. The
    /// check and the removal happen under the resource's lifecycle lock,
    /// so an announcement cannot interleave between them. A pending
    /// upload keeps the entry alive to resurrect; evicting underneath it
    /// would let a second resource be created for the same file and
    /// defeat the mutual exclusion entirely.
    pub fn evict_if_unclaimed(&self, resource: &Arc<FileResource>) -> bool {
        let life = resource.lifecycle.lock().expect("lock poisoned");
        if life.state == LifeState::Deleted && life.pending_writers == 0 {
            self.remove(resource)
        } else {
            debug!(
                file = resource.name(),
                pending = life.pending_writers,
                "eviction deferred, upload announced"
            );
            false
        }
    }

    /// Number of currently registered resources.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().expect("lock poisoned").is_empty()
    }

    /// Whether a resource is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().expect("lock poisoned").contains_key(name)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("entries", &self.len())
            .finish()
    }
}
