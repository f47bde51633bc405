use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,
    /// Directory holding the stored files; created at startup if missing.
    pub storage_root: PathBuf,
    /// Largest upload accepted, in bytes.
    pub max_file_size: u64,
    /// Longest filename accepted on the wire, in bytes.
    pub max_filename_len: usize,
    /// Seconds to wait for the next bytes from a silent client
    /// (confirmation byte, status, the next piece of content) before
    /// giving the connection up as dead. An idle bound per read, not a
    /// cap on total transfer time: content is length-prefixed, and a
    /// peer that keeps sending is never cut off.
    pub read_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:42069".parse().expect("valid literal"),
            storage_root: PathBuf::from("./recv"),
            max_file_size: 100 * 1024 * 1024,
            max_filename_len: 255,
            read_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load a config from a TOML file; absent keys fall back to defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
