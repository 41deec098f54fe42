//! In-memory backend with live-object accounting and failure injection.
//!
//! [`ScriptedBackend`] wraps [`ParkingEvent`] and records how many events
//! were created, how many are still alive, and how many waits and notifies
//! were issued. Tests use it to check the "at most one live event" guarantee
//! and to drive the error paths of a critical section without touching the OS.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use super::{ParkingEvent, WaitBackend, WaitEvent, WaitStatus};
use crate::error::{Error, ErrorKind, Result};
use crate::sync::Timeout;

/// Counters shared between a [`ScriptedBackend`] and all its events.
#[derive(Debug, Default)]
pub struct ScriptedCounters {
    created: AtomicUsize,
    live: AtomicUsize,
    closed: AtomicUsize,
    waits: AtomicUsize,
    notifies: AtomicUsize,
}

impl ScriptedCounters {
    /// Events successfully created so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Events created and not yet closed or dropped.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Events released through an explicit `close`.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Calls to `wait` on any event.
    #[must_use]
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }

    /// Calls to `notify_one` on any event.
    #[must_use]
    pub fn notifies(&self) -> usize {
        self.notifies.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_create: AtomicBool,
    fail_wait: AtomicBool,
    fail_notify: AtomicBool,
    fail_close: AtomicBool,
}

/// Backend producing [`ScriptedEvent`]s. Cloning shares counters and faults.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    counters: Arc<ScriptedCounters>,
    faults: Arc<Faults>,
    rendezvous: Option<Arc<Barrier>>,
}

impl ScriptedBackend {
    /// Creates a backend with no faults armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every creator wait until `parties` creations are in flight
    /// before returning, forcing them to race on publication.
    #[must_use]
    pub fn with_creation_rendezvous(mut self, parties: usize) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Shared counters.
    #[must_use]
    pub fn counters(&self) -> &ScriptedCounters {
        &self.counters
    }

    /// Arms or disarms creation failure (`ResourceExhausted`).
    pub fn fail_create(&self, fail: bool) {
        self.faults.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Arms or disarms wait failure (`BackendFailure`).
    pub fn fail_wait(&self, fail: bool) {
        self.faults.fail_wait.store(fail, Ordering::SeqCst);
    }

    /// Arms or disarms notify failure (`BackendFailure`).
    pub fn fail_notify(&self, fail: bool) {
        self.faults.fail_notify.store(fail, Ordering::SeqCst);
    }

    /// Arms or disarms close failure (`BackendFailure`).
    pub fn fail_close(&self, fail: bool) {
        self.faults.fail_close.store(fail, Ordering::SeqCst);
    }
}

impl WaitBackend for ScriptedBackend {
    type Event = ScriptedEvent;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn create_event(&self) -> Result<ScriptedEvent> {
        if self.faults.fail_create.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::ResourceExhausted)
                .with_message("scripted event creation failure"));
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        let event = ScriptedEvent {
            inner: ParkingEvent::new(),
            counters: Arc::clone(&self.counters),
            faults: Arc::clone(&self.faults),
            released: false,
        };
        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.wait();
        }
        Ok(event)
    }
}

/// Event produced by [`ScriptedBackend`].
#[derive(Debug)]
pub struct ScriptedEvent {
    inner: ParkingEvent,
    counters: Arc<ScriptedCounters>,
    faults: Arc<Faults>,
    released: bool,
}

impl WaitEvent for ScriptedEvent {
    fn wait(&self, timeout: Timeout) -> Result<WaitStatus> {
        self.counters.waits.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_wait.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::BackendFailure).with_message("scripted wait failure"));
        }
        self.inner.wait(timeout)
    }

    fn notify_one(&self) -> Result<()> {
        self.counters.notifies.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_notify.load(Ordering::SeqCst) {
            return Err(
                Error::new(ErrorKind::BackendFailure).with_message("scripted notify failure")
            );
        }
        self.inner.notify_one()
    }

    fn close(mut self) -> Result<()> {
        self.released = true;
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_close.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::BackendFailure).with_message("scripted close failure"));
        }
        Ok(())
    }
}

impl Drop for ScriptedEvent {
    fn drop(&mut self) {
        if !self.released {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
