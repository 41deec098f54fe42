//! Circular log used as a mutual-exclusion oracle.
//!
//! Each append derives the new entry from the previous one, so two threads
//! appending at once leave a pair of neighbours that break the relation
//! `log[i + 1] == log[i] + STEP + (i + 1)`. The log is only meaningful when
//! every access happens under the lock being tested; the atomics keep a broken
//! lock from being undefined behaviour, not from being detected.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Constant part of the difference between neighbouring entries.
pub const STEP: i64 = 17;

/// Mask applied to the wall-clock seed of slot 0.
pub const SEED_MASK: i64 = 0x00FF_FFFF;

/// Low 24 bits of the current wall-clock time in milliseconds.
#[must_use]
pub fn wall_clock_seed() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| (since.as_millis() as i64) & SEED_MASK)
}

/// A pair of neighbouring entries that does not satisfy the log relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    /// Index of the second entry of the pair.
    pub index: usize,
    /// Value the relation requires there.
    pub expected: i64,
    /// Value found.
    pub actual: i64,
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "log[{}] = {}, expected {}",
            self.index, self.actual, self.expected
        )
    }
}

/// Fixed-capacity log of derived entries.
pub struct SharedLog {
    slots: Box<[AtomicI64]>,
    next: AtomicUsize,
}

impl SharedLog {
    /// Creates a zeroed log with `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| AtomicI64::new(0)).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entries written since the last wrap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    /// True if nothing has been written since the last wrap.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zeroes every slot and rewinds to the start.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
        self.next.store(0, Ordering::Relaxed);
    }

    /// Appends the next entry. Slot 0 takes `seed()`; every other slot is
    /// derived from its predecessor. The log wraps to slot 0 when full.
    ///
    /// Must be called under the lock guarding this log.
    pub fn append(&self, seed: impl FnOnce() -> i64) {
        if self.slots.is_empty() {
            return;
        }
        let index = self.next.load(Ordering::Relaxed);
        let value = match index {
            0 => seed(),
            _ => self.slots[index - 1].load(Ordering::Relaxed) + STEP + index as i64,
        };
        self.slots[index].store(value, Ordering::Relaxed);
        let next = index + 1;
        self.next
            .store(if next == self.slots.len() { 0 } else { next }, Ordering::Relaxed);
    }

    /// Checks every neighbouring pair written since the last wrap.
    ///
    /// Must be called under the lock guarding this log.
    pub fn verify(&self) -> Result<(), Inconsistency> {
        let len = self.len().min(self.slots.len());
        for index in 1..len {
            let expected = self.slots[index - 1].load(Ordering::Relaxed) + STEP + index as i64;
            let actual = self.slots[index].load(Ordering::Relaxed);
            if actual != expected {
                return Err(Inconsistency {
                    index,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Copy of the slots written since the last wrap.
    #[must_use]
    pub fn entries(&self) -> Vec<i64> {
        self.slots[..self.len().min(self.slots.len())]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn overwrite(&self, index: usize, value: i64) {
        self.slots[index].store(value, Ordering::Relaxed);
    }
}

impl fmt::Debug for SharedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLog")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
