//! How long `enter` may block on a contended critical section.

use std::time::{Duration, Instant};

/// Wait policy for [`CriticalSection::enter`](super::CriticalSection::enter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeout {
    /// Never block; fail with `TimedOut` if another thread owns the lock.
    NoWait,
    /// Block until ownership is granted.
    #[default]
    Infinite,
    /// Block for at most this long.
    After(Duration),
}

impl Timeout {
    /// Millisecond value that means "wait forever" in [`Timeout::from_millis`].
    pub const INFINITE_MILLIS: u32 = u32::MAX;

    /// Decodes the millisecond convention: `0` is no wait and
    /// [`Self::INFINITE_MILLIS`] is infinite.
    #[must_use]
    pub const fn from_millis(ms: u32) -> Self {
        match ms {
            0 => Self::NoWait,
            Self::INFINITE_MILLIS => Self::Infinite,
            ms => Self::After(Duration::from_millis(ms as u64)),
        }
    }

    /// Returns true if this timeout never blocks.
    #[must_use]
    pub const fn is_no_wait(&self) -> bool {
        match self {
            Self::NoWait => true,
            Self::Infinite => false,
            Self::After(d) => d.is_zero(),
        }
    }

    /// Absolute deadline for a wait that starts at `now`.
    ///
    /// `None` means the wait is unbounded, which includes bounded durations too
    /// large to represent as an `Instant`.
    #[must_use]
    pub fn deadline(&self, now: Instant) -> Option<Instant> {
        match self {
            Self::NoWait => Some(now),
            Self::Infinite => None,
            Self::After(d) => now.checked_add(*d),
        }
    }

    /// Converts a remaining wait to `poll(2)` milliseconds.
    ///
    /// Rounds up so a bounded wait never returns before its deadline, and maps
    /// an unbounded wait to `-1`.
    #[must_use]
    pub fn poll_millis(remaining: Option<Duration>) -> i32 {
        let Some(remaining) = remaining else {
            return -1;
        };
        let nanos = remaining.as_nanos();
        let millis = nanos.div_ceil(1_000_000);
        i32::try_from(millis).unwrap_or(i32::MAX)
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::After(d)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Self::Infinite, Self::After)
    }
}
