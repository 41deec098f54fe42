//! "Is the runtime tearing down?" probes consulted by `enter` and `leave`.
//!
//! Once a process starts its final shutdown, threads that owned a critical
//! section may already have been killed without releasing it. A critical
//! section whose probe reports teardown skips all synchronization so that the
//! last surviving thread can never deadlock on such a lock. This is only
//! sound while a single thread remains runnable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

static PROCESS_TEARDOWN: AtomicBool = AtomicBool::new(false);

/// Marks the whole process as tearing down.
///
/// Every [`CriticalSection`](super::CriticalSection) using [`ProcessTeardown`]
/// stops synchronizing from this point on. There is no way back.
pub fn begin_process_teardown() {
    if !PROCESS_TEARDOWN.swap(true, Ordering::SeqCst) {
        tracing::warn!("process teardown started; critical sections now bypass locking");
    }
}

/// Returns true once [`begin_process_teardown`] has been called.
#[must_use]
pub fn process_teardown_in_progress() -> bool {
    PROCESS_TEARDOWN.load(Ordering::Acquire)
}

/// Source of the teardown predicate.
pub trait TeardownProbe: Send + Sync {
    /// Returns true if synchronization must be skipped.
    fn in_progress(&self) -> bool;
}

/// Reads the process-wide flag set by [`begin_process_teardown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTeardown;

impl TeardownProbe for ProcessTeardown {
    #[inline]
    fn in_progress(&self) -> bool {
        process_teardown_in_progress()
    }
}

/// Never reports teardown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTeardown;

impl TeardownProbe for NoTeardown {
    #[inline]
    fn in_progress(&self) -> bool {
        false
    }
}

/// A cloneable flag scoped to whoever holds a clone.
#[derive(Debug, Clone, Default)]
pub struct TeardownFlag(Arc<AtomicBool>);

impl TeardownFlag {
    /// Creates a cleared flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag for every clone.
    pub fn begin(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TeardownProbe for TeardownFlag {
    #[inline]
    fn in_progress(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl<F> TeardownProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn in_progress(&self) -> bool {
        self()
    }
}
