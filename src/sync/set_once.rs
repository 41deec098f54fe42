//! Lock-free publish-once slot.
//!
//! [`SetOnce`] holds at most one heap-allocated value for its whole life.
//! Any number of threads may build a candidate concurrently; exactly one
//! candidate is published with a single compare-and-swap and every loser gets
//! its candidate back to dispose of. Readers only ever see a fully
//! constructed value.
//!
//! Unlike `OnceLock`, losers are never blocked while the winner is being
//! built, which matters when the slot backs the wait object of a lock: the
//! value cannot be created under the lock it is meant to implement.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// A slot that can be filled exactly once, racing without blocking.
pub struct SetOnce<T> {
    ptr: AtomicPtr<T>,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: the slot owns a `Box<T>`; moving the slot moves the box.
unsafe impl<T: Send> Send for SetOnce<T> {}
// SAFETY: shared access hands out `&T` to many threads and may drop a `T`
// built on another thread, so `T` must be both `Send` and `Sync`.
unsafe impl<T: Send + Sync> Sync for SetOnce<T> {}

impl<T> SetOnce<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
            _owns: PhantomData,
        }
    }

    /// Returns the published value, if any.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        let current = self.ptr.load(Ordering::Acquire);
        // SAFETY: a non-null pointer was produced by `Box::into_raw` in
        // `publish` and stays valid until `take` or drop, both of which need
        // `&mut self`.
        unsafe { current.as_ref() }
    }

    /// Returns true once a value has been published.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    /// Tries to publish `value`.
    ///
    /// Returns `Ok` with the published value if this call won, or `Err` with
    /// the value that won earlier together with the rejected candidate.
    pub fn publish(&self, value: T) -> Result<&T, (&T, T)> {
        let candidate = Box::into_raw(Box::new(value));
        match self.ptr.compare_exchange(
            ptr::null_mut(),
            candidate,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // SAFETY: `candidate` is now owned by the slot and lives until
            // `take` or drop.
            Ok(_) => Ok(unsafe { &*candidate }),
            Err(winner) => {
                // SAFETY: the swap failed, so `candidate` was never shared and
                // we still own it; `winner` is non-null and owned by the slot.
                let rejected = unsafe { Box::from_raw(candidate) };
                Err((unsafe { &*winner }, *rejected))
            }
        }
    }

    /// Returns the published value, building and publishing one if needed.
    ///
    /// `init` may run on several threads at once. Every value that loses the
    /// race is passed to `discard`.
    pub fn get_or_try_publish<E>(
        &self,
        init: impl FnOnce() -> Result<T, E>,
        discard: impl FnOnce(T),
    ) -> Result<&T, E> {
        if let Some(existing) = self.get() {
            return Ok(existing);
        }
        let value = init()?;
        match self.publish(value) {
            Ok(published) => Ok(published),
            Err((winner, rejected)) => {
                discard(rejected);
                Ok(winner)
            }
        }
    }

    /// Removes the published value, leaving the slot empty.
    pub fn take(&mut self) -> Option<T> {
        let current = std::mem::replace(self.ptr.get_mut(), ptr::null_mut());
        if current.is_null() {
            None
        } else {
            // SAFETY: exclusive access; the pointer came from `Box::into_raw`.
            Some(*unsafe { Box::from_raw(current) })
        }
    }
}

impl<T> Default for SetOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SetOnce<T> {
    fn drop(&mut self) {
        drop(self.take());
    }
}

impl<T: fmt::Debug> fmt::Debug for SetOnce<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SetOnce").field(&self.get()).finish()
    }
}
