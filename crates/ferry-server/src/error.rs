use thiserror::Error;

/// Failure of a single client operation. Normal outcomes — file not
/// found, client declined a confirmation — are statuses, not errors;
/// these variants are the cases that end the conversation early. Each is
/// resolved within the connection task: logged, never propagated as a
/// process-level fault.
#[derive(Debug, Error)]
pub enum OpError {
    /// The peer violated the protocol or the transport failed mid-exchange.
    #[error("protocol error: {0}")]
    Protocol(#[from] ferry_protocol::ProtocolError),

    /// The storage backend failed.
    #[error("store error: {0}")]
    Store(#[from] ferry_store::StoreError),
}

/// Result alias for per-connection operations.
pub type OpResult<T> = Result<T, OpError>;

/// Errors from running the server itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] ferry_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
