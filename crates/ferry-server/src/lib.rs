//! TCP server for the Ferry transfer service.
//!
//! Accepts stream connections, reads a two-byte opcode and a filename,
//! and executes the requested operation — upload, download, delete, or
//! directory listing — on its own task while the listener stays
//! available to other clients. Per-file synchronization and resource
//! lifecycle live in `ferry-registry`; this crate supplies the wire
//! conversations around them.

pub mod config;
pub mod connection;
pub mod error;
pub mod ops;
pub mod server;
pub mod service;

pub use config::ServerConfig;
pub use error::{OpError, OpResult, ServerError, ServerResult};
pub use server::Server;
pub use service::Service;
