//! Wait/notify objects backing the slow path of a critical section.
//!
//! A [`WaitBackend`] manufactures [`WaitEvent`]s. An event behaves like an
//! auto-reset kernel event:
//!
//! - `notify_one` latches a signal that stays pending until a waiter consumes
//!   it. Whether repeated notifies collapse or accumulate is up to the
//!   backend; a critical section never has more than one outstanding.
//! - `wait` consumes the latched signal (returning immediately if one is
//!   pending) or blocks until one arrives or the timeout expires.
//! - A wait that expires at the same moment a signal arrives either consumes
//!   the signal and reports [`WaitStatus::Signaled`], or leaves it latched for
//!   the next waiter. A signal is never lost.
//!
//! # Implementations
//!
//! - [`ParkingBackend`]: portable, built on `parking_lot` primitives.
//! - [`EventFdBackend`]: Linux `eventfd(2)` kernel object (Linux only).
//! - [`ScriptedBackend`]: in-memory backend that counts live events and can
//!   inject failures; used by tests and simulations.

mod parking;
mod scripted;

#[cfg(target_os = "linux")]
mod eventfd;

#[cfg(target_os = "linux")]
pub use eventfd::{EventFdBackend, EventFdEvent};
pub use parking::{ParkingBackend, ParkingEvent};
pub use scripted::{ScriptedBackend, ScriptedCounters, ScriptedEvent};

use super::Timeout;
use crate::error::Result;

/// Outcome of a successful call to [`WaitEvent::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitStatus {
    /// A signal was consumed.
    Signaled,
    /// The timeout expired without a signal.
    TimedOut,
}

impl WaitStatus {
    /// Returns true if a signal was consumed.
    #[must_use]
    pub const fn is_signaled(self) -> bool {
        matches!(self, Self::Signaled)
    }
}

/// A single auto-reset wait/notify object.
pub trait WaitEvent: Send + Sync {
    /// Blocks until signaled or until `timeout` expires.
    fn wait(&self, timeout: Timeout) -> Result<WaitStatus>;

    /// Latches one signal, waking at most one blocked waiter.
    fn notify_one(&self) -> Result<()>;

    /// Releases the underlying resources, reporting any failure.
    ///
    /// Dropping an event also releases it, but silently.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Factory for [`WaitEvent`]s.
pub trait WaitBackend: Send + Sync {
    /// The event type produced by this backend.
    type Event: WaitEvent;

    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Creates a new, unsignaled event.
    ///
    /// Fails with `ResourceExhausted` when the object cannot be allocated.
    fn create_event(&self) -> Result<Self::Event>;
}

impl<B: WaitBackend> WaitBackend for std::sync::Arc<B> {
    type Event = B::Event;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_event(&self) -> Result<Self::Event> {
        (**self).create_event()
    }
}
