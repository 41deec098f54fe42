//! Shared state of one critical section.
//!
//! # Counter convention
//!
//! `counter` holds `n - 1`, where `n` is the number of threads that have
//! incremented it and not yet decremented it: the owner, every thread blocked
//! waiting for it, and every waiter that gave up (timed out) while its slot
//! was still counted. [`UNLOCKED`] (`-1`) therefore means "nobody", and the
//! thread whose increment observes `-1` becomes the sole owner without any
//! kernel interaction.
//!
//! Abandoned slots are never given back, so the counter is 64 bits wide and
//! all arithmetic on it wraps.
//!
//! `owner` and `recursion` are only written by the thread that currently holds
//! the lock. Other threads read `owner` only to compare it with their own
//! identity, which can never match a value they did not write themselves.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};

use super::identity::ThreadIdentity;
use super::set_once::SetOnce;

/// Counter value meaning no thread owns or waits for the lock.
pub const UNLOCKED: i64 = -1;

/// Atomic fields of a critical section plus its lazily created wait event.
#[derive(Debug)]
pub struct LockState<E> {
    pub(crate) counter: AtomicI64,
    pub(crate) owner: AtomicU64,
    pub(crate) recursion: AtomicU32,
    pub(crate) event: SetOnce<E>,
}

impl<E> LockState<E> {
    /// Fresh state: unlocked, unowned, no event.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicI64::new(UNLOCKED),
            owner: AtomicU64::new(ThreadIdentity::NONE),
            recursion: AtomicU32::new(0),
            event: SetOnce::new(),
        }
    }

    /// Records `me` as the owner with a depth of one.
    #[inline]
    pub(crate) fn claim(&self, me: ThreadIdentity) {
        self.owner.store(me.as_u64(), Ordering::Relaxed);
        self.recursion.store(1, Ordering::Relaxed);
    }

    /// Returns true if `me` is the recorded owner.
    #[inline]
    pub(crate) fn is_owner(&self, me: ThreadIdentity) -> bool {
        self.owner.load(Ordering::Relaxed) == me.as_u64()
    }

    /// Current recorded owner.
    #[must_use]
    pub fn owner(&self) -> Option<ThreadIdentity> {
        ThreadIdentity::from_raw(self.owner.load(Ordering::Relaxed))
    }

    /// Point-in-time copy of every field, for diagnostics.
    ///
    /// Fields are read independently, so a snapshot taken while other
    /// threads are entering or leaving may mix two moments.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            counter: self.counter.load(Ordering::Acquire),
            owner: self.owner(),
            recursion: self.recursion.load(Ordering::Relaxed),
            has_event: self.event.is_set(),
        }
    }
}

impl<E> Default for LockState<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of a [`LockState`] at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Raw counter; [`UNLOCKED`] when free.
    pub counter: i64,
    /// Recorded owner, if any.
    pub owner: Option<ThreadIdentity>,
    /// Unmatched `enter` calls by the owner.
    pub recursion: u32,
    /// Whether the wait event has been created.
    pub has_event: bool,
}

impl StateSnapshot {
    /// Threads counted as owning or waiting (including timed-out slots).
    #[must_use]
    pub const fn contenders(&self) -> i64 {
        self.counter.wrapping_sub(UNLOCKED)
    }

    /// True if the counter is at its unlocked sentinel.
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.counter == UNLOCKED
    }

    /// Checks the owner/recursion invariant: depth is positive exactly when an
    /// owner is recorded.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        (self.recursion > 0) == self.owner.is_some()
    }
}
