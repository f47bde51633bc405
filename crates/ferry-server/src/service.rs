use std::sync::Arc;

use ferry_registry::{DirectorySnapshot, ResourceRegistry};
use ferry_store::{FileStore, StoreResult};

use crate::config::ServerConfig;

/// Shared state reachable from every connection task: the storage
/// backend, the per-file resource registry, and the directory snapshot.
pub struct Service {
    config: ServerConfig,
    store: Arc<dyn FileStore>,
    registry: ResourceRegistry,
    snapshot: DirectorySnapshot,
}

impl Service {
    pub fn new(config: ServerConfig, store: Arc<dyn FileStore>) -> Self {
        Self {
            config,
            store,
            registry: ResourceRegistry::new(),
            snapshot: DirectorySnapshot::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn FileStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> &DirectorySnapshot {
        &self.snapshot
    }

    /// Rescan storage into the directory snapshot. Runs once at startup
    /// and after every committed upload or delete.
    pub async fn refresh_snapshot(&self) -> StoreResult<()> {
        self.snapshot.rebuild(self.store.as_ref()).await
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}
