use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

/// Longest filename a store will accept, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Storage backend: one flat namespace of files.
///
/// All implementations must satisfy these invariants:
/// - `write` replaces the whole file; there are no partial updates.
/// - `scan` returns plain files only, sorted by name, no recursion.
/// - Every method validates the filename before touching storage;
///   a name that fails [`validate_name`] never reaches the backend.
/// - All I/O errors are propagated, never silently ignored.
///
/// The trait does no locking of its own. Callers serialize access per
/// file through the resource registry; the store is a dumb byte sink.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Whether the named file currently exists.
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Read the whole file. Returns `NotFound` if absent.
    async fn read(&self, name: &str) -> StoreResult<Vec<u8>>;

    /// Create or replace the file with the given contents.
    async fn write(&self, name: &str, data: &[u8]) -> StoreResult<()>;

    /// Remove the file. Returns `NotFound` if absent.
    async fn remove(&self, name: &str) -> StoreResult<()>;

    /// List all stored filenames, sorted.
    async fn scan(&self) -> StoreResult<Vec<String>>;
}

/// Validate a client-supplied filename before it is used as a store key.
///
/// The store is a single flat directory; anything that could escape it
/// (separators, parent references) or that no filesystem accepts (NUL,
/// empty, oversized) is rejected.
pub fn validate_name(name: &str) -> StoreResult<()> {
    let fail = |reason| {
        Err(StoreError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return fail("empty");
    }
    if name.len() > MAX_NAME_LEN {
        return fail("too long");
    }
    if name.contains(['/', '\\']) {
        return fail("contains path separator");
    }
    if name.contains('\0') {
        return fail("contains NUL");
    }
    if name == "." || name == ".." {
        return fail("directory reference");
    }
    Ok(())
}
