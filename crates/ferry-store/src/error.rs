use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named file is not present in the store.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The filename is not acceptable as a store key.
    #[error("invalid filename {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
