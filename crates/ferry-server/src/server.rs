use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use ferry_store::DiskStore;

use crate::config::ServerConfig;
use crate::connection::serve_connection;
use crate::error::ServerResult;
use crate::service::Service;

/// The Ferry transfer server: binds, accepts, and runs one task per
/// connection against the shared [`Service`] state.
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the store, prime the directory snapshot, and serve until
    /// ctrl-c. In-flight connections are dropped at shutdown; the
    /// registry and snapshot are rebuilt from disk on the next start.
    pub async fn serve(self) -> ServerResult<()> {
        let store = Arc::new(DiskStore::open(&self.config.storage_root)?);
        info!(root = %store.root().display(), "storage opened");

        let service = Arc::new(Service::new(self.config.clone(), store));
        service.refresh_snapshot().await?;

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "listening");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (mut stream, peer) = accepted?;
                    info!(%peer, "connection accepted");
                    let service = Arc::clone(&service);
                    tokio::spawn(async move {
                        match serve_connection(&service, &mut stream).await {
                            Ok(status) => info!(%peer, %status, "connection finished"),
                            Err(e) => warn!(%peer, error = %e, "connection failed"),
                        }
                    });
                }
            }
        }
    }
}
