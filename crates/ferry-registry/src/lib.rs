//! Per-file concurrency controller and resource-lifecycle registry.
//!
//! Every stored file is represented by at most one live [`FileResource`],
//! handed out by the [`ResourceRegistry`]. A resource mediates access with
//! a readers-writers discipline that deliberately prefers readers:
//! downloads of the same file run concurrently, while uploads and deletes
//! take the file exclusively. A coarser [`DirectorySnapshot`] coordinates
//! directory listings against listing rebuilds with the same discipline.
//!
//! The lifecycle side tracks deletion: a delete announces itself on the
//! resource before it ever waits for exclusive access, so queued readers
//! and writers learn the file is going away early. A deleted resource is
//! evicted from the registry only once no upload has announced intent for
//! it; an upload that was already waiting resurrects the entry instead.

pub mod registry;
pub mod resource;
pub mod rwlock;
pub mod snapshot;

pub use registry::ResourceRegistry;
pub use resource::{FileResource, LifeState};
pub use rwlock::{ExclusiveGuard, ReaderPreferringLock};
pub use snapshot::DirectorySnapshot;
