//! Per-thread identity recorded as the owner of a critical section.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: ThreadIdentity = ThreadIdentity::allocate();
}

/// Identifies one OS thread for the lifetime of the process.
///
/// Identities are never reused, so a stale owner value can never match a
/// thread that starts later. The raw value `0` is reserved for "no owner".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadIdentity(NonZeroU64);

impl ThreadIdentity {
    /// Raw value stored in the owner slot when nobody holds the lock.
    pub(crate) const NONE: u64 = 0;

    fn allocate() -> Self {
        let raw = NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Returns the identity of the calling thread.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(|id| *id)
    }

    /// Returns the raw value stored in lock state.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.get()
    }

    /// Decodes a raw owner slot value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}
