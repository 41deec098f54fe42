//! Feature-gated acquisition counters.
//!
//! When the `lock-metrics` feature is enabled, every critical section counts
//! how each acquisition was granted and how often its wait event was raced.
//! When disabled, recording compiles to nothing and snapshots are all zero.

/// Snapshot of a critical section's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStatsSnapshot {
    /// Acquisitions granted by the -1 → 0 increment.
    pub uncontended: u64,
    /// Nested acquisitions by the current owner.
    pub reentrant: u64,
    /// Acquisitions granted after waiting on the event.
    pub contended: u64,
    /// Waits that expired without ownership.
    pub timeouts: u64,
    /// Wait events published into the state.
    pub events_published: u64,
    /// Wait events built by a thread that lost the publication race.
    pub events_discarded: u64,
}

impl LockStatsSnapshot {
    /// Every successful acquisition, whatever the path.
    #[must_use]
    pub const fn acquisitions(&self) -> u64 {
        self.uncontended + self.reentrant + self.contended
    }
}

// ── Feature-gated implementation ──────────────────────────────────────────

#[cfg(feature = "lock-metrics")]
mod inner {
    use super::LockStatsSnapshot;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Relaxed counters, one per acquisition path.
    #[derive(Debug, Default)]
    pub struct LockStats {
        uncontended: AtomicU64,
        reentrant: AtomicU64,
        contended: AtomicU64,
        timeouts: AtomicU64,
        events_published: AtomicU64,
        events_discarded: AtomicU64,
    }

    impl LockStats {
        #[inline]
        pub fn uncontended(&self) {
            self.uncontended.fetch_add(1, Ordering::Relaxed);
        }

        #[inline]
        pub fn reentrant(&self) {
            self.reentrant.fetch_add(1, Ordering::Relaxed);
        }

        #[inline]
        pub fn contended(&self) {
            self.contended.fetch_add(1, Ordering::Relaxed);
        }

        #[inline]
        pub fn timeout(&self) {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }

        #[inline]
        pub fn event_published(&self) {
            self.events_published.fetch_add(1, Ordering::Relaxed);
        }

        #[inline]
        pub fn event_discarded(&self) {
            self.events_discarded.fetch_add(1, Ordering::Relaxed);
        }

        pub fn snapshot(&self) -> LockStatsSnapshot {
            LockStatsSnapshot {
                uncontended: self.uncontended.load(Ordering::Relaxed),
                reentrant: self.reentrant.load(Ordering::Relaxed),
                contended: self.contended.load(Ordering::Relaxed),
                timeouts: self.timeouts.load(Ordering::Relaxed),
                events_published: self.events_published.load(Ordering::Relaxed),
                events_discarded: self.events_discarded.load(Ordering::Relaxed),
            }
        }
    }
}

// ── No-op implementation (feature disabled) ───────────────────────────────

#[cfg(not(feature = "lock-metrics"))]
mod inner {
    use super::LockStatsSnapshot;

    /// Zero-sized stand-in (metrics disabled).
    #[derive(Debug, Default)]
    pub struct LockStats;

    impl LockStats {
        #[inline]
        pub fn uncontended(&self) {}

        #[inline]
        pub fn reentrant(&self) {}

        #[inline]
        pub fn contended(&self) {}

        #[inline]
        pub fn timeout(&self) {}

        #[inline]
        pub fn event_published(&self) {}

        #[inline]
        pub fn event_discarded(&self) {}

        pub fn snapshot(&self) -> LockStatsSnapshot {
            LockStatsSnapshot::default()
        }
    }
}

pub(crate) use inner::LockStats;
