use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

/// Readers-writers lock with strict reader priority.
///
/// This is the first-sharer-acquires / last-sharer-releases pattern: the
/// whole group of concurrent sharers holds the single exclusive permit
/// together. While the group is non-empty, a newly arriving sharer only
/// bumps the counter and is admitted immediately, ahead of any writer
/// queued on the permit. Writers therefore have no bounded wait while
/// sharers keep arriving; that starvation policy is intentional and parts
/// of the service depend on its observable behavior, so do not swap this
/// for a fair or write-preferring lock.
///
/// Shared access is bracketed with explicit [`begin_shared`] /
/// [`end_shared`] calls because the release must run even when the
/// critical section performs fallible I/O; callers route every exit path
/// through `end_shared`. Exclusive access is an RAII guard.
///
/// [`begin_shared`]: ReaderPreferringLock::begin_shared
/// [`end_shared`]: ReaderPreferringLock::end_shared
pub struct ReaderPreferringLock {
    sharers: Mutex<usize>,
    exclusive: Semaphore,
}

/// Exclusive hold on a [`ReaderPreferringLock`], released on drop.
pub struct ExclusiveGuard<'a> {
    _permit: SemaphorePermit<'a>,
}

impl ReaderPreferringLock {
    pub fn new() -> Self {
        Self {
            sharers: Mutex::new(0),
            exclusive: Semaphore::new(1),
        }
    }

    /// Join the shared group, blocking while a writer holds the lock.
    ///
    /// The counter mutex is held across the permit acquisition on purpose:
    /// sharers arriving behind the first one queue on the counter, not on
    /// the permit, and flow in as soon as the first sharer gets through.
    pub async fn begin_shared(&self) {
        let mut count = self.sharers.lock().await;
        if *count == 0 {
            self.exclusive
                .acquire()
                .await
                .expect("semaphore closed")
                .forget();
        }
        *count += 1;
    }

    /// Leave the shared group; the last sharer out releases the writers.
    pub async fn end_shared(&self) {
        let mut count = self.sharers.lock().await;
        debug_assert!(*count > 0, "end_shared without begin_shared");
        *count -= 1;
        if *count == 0 {
            self.exclusive.add_permits(1);
        }
    }

    /// Take the lock exclusively, blocking behind the current sharer group
    /// or writer. Released when the guard drops.
    pub async fn acquire_exclusive(&self) -> ExclusiveGuard<'_> {
        let permit = self.exclusive.acquire().await.expect("semaphore closed");
        ExclusiveGuard { _permit: permit }
    }

    /// Current number of sharers, for diagnostics.
    pub async fn sharer_count(&self) -> usize {
        *self.sharers.lock().await
    }
}

impl Default for ReaderPreferringLock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReaderPreferringLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderPreferringLock")
            .field("available", &self.exclusive.available_permits())
            .finish()
    }
}
