//! Progress counters shared by the listing and deletion workers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`ProgressCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Object versions discovered by the listing workers.
    pub found: u64,
    /// Object versions the store confirmed as deleted.
    pub deleted: u64,
    /// Object versions given up on after all retries.
    pub failed: u64,
}

impl ProgressSnapshot {
    /// Versions found but neither deleted nor given up on yet.
    pub fn outstanding(&self) -> u64 {
        self.found.saturating_sub(self.deleted + self.failed)
    }
}

/// Monotonically increasing counters, safe to bump from many workers.
///
/// Workers receive an `Arc<ProgressCounters>` at construction; nothing reads
/// or writes the counters except through `increment_*` and `snapshot`.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    found: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_found(&self, n: u64) {
        self.found.fetch_add(n, Ordering::SeqCst);
    }

    pub fn increment_deleted(&self, n: u64) {
        self.deleted.fetch_add(n, Ordering::SeqCst);
    }

    pub fn increment_failed(&self, n: u64) {
        self.failed.fetch_add(n, Ordering::SeqCst);
    }

    /// Read all counters.
    ///
    /// `deleted` and `failed` are read before `found` so that a snapshot
    /// taken while workers are running still satisfies
    /// `deleted + failed <= found`.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let deleted = self.deleted.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let found = self.found.load(Ordering::SeqCst);
        ProgressSnapshot {
            found,
            deleted,
            failed,
        }
    }
}
