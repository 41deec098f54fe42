//! Recursive user-mode critical section.
//!
//! [`CriticalSection`] tracks ownership, recursion and contention itself and
//! only touches its wait backend when a thread has to block.
//!
//! # Paths
//!
//! - **Fast path**: `enter` increments the counter; if it was [`UNLOCKED`] the
//!   caller owns the lock. A nested `enter` by the owner only bumps the
//!   recursion depth. Neither touches the backend.
//! - **Slow path**: any other caller fetches (creating on first use) the wait
//!   event and blocks on it. `leave` by the last level of the owner wakes one
//!   waiter whenever the counter shows anyone else is still counted.
//!
//! Ownership is handed directly to the woken thread: while a wake is pending
//! the counter never returns to [`UNLOCKED`], so newcomers queue behind it.
//! Which queued thread consumes the wake is up to the backend; there is no
//! FIFO guarantee.
//!
//! # Timeouts
//!
//! A waiter that gives up keeps its counter slot. The next release then
//! latches a wake that nobody is blocked on, and the next contender consumes
//! it. The lock stays exclusive but no longer returns to the fast path.
//!
//! # Example
//!
//! ```
//! use critsect::sync::{CriticalSection, Timeout};
//!
//! let section = CriticalSection::new();
//! section.enter(Timeout::Infinite)?;
//! section.enter(Timeout::NoWait)?; // reentrant
//! section.leave();
//! section.leave();
//!
//! {
//!     let _guard = section.lock()?;
//!     // exclusive here
//! }
//! section.delete()?;
//! # Ok::<(), critsect::Error>(())
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::backend::{ParkingBackend, WaitBackend, WaitEvent, WaitStatus};
use super::identity::ThreadIdentity;
use super::state::{LockState, StateSnapshot, UNLOCKED};
use super::stats::{LockStats, LockStatsSnapshot};
use super::teardown::{ProcessTeardown, TeardownProbe};
use super::Timeout;
use crate::error::{Error, Result};

/// How a successful `enter` obtained the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Acquisition {
    /// The lock was free.
    Uncontended,
    /// The caller already owned it.
    Reentrant,
    /// The caller waited for a wake.
    Contended,
    /// Teardown is in progress; nothing was synchronized.
    TeardownBypass,
}

impl Acquisition {
    /// True if the backend was not involved.
    #[must_use]
    pub const fn is_fast_path(self) -> bool {
        matches!(self, Self::Uncontended | Self::Reentrant)
    }
}

/// A recursive, non-fair, blocking mutual-exclusion lock.
pub struct CriticalSection<B: WaitBackend = ParkingBackend, P: TeardownProbe = ProcessTeardown> {
    state: LockState<B::Event>,
    backend: B,
    teardown: P,
    bypass_reported: AtomicBool,
    stats: LockStats,
}

impl CriticalSection {
    /// Creates a critical section on the portable backend. The wait event is
    /// created on first contention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(ParkingBackend, ProcessTeardown)
    }
}

impl Default for CriticalSection {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: WaitBackend, P: TeardownProbe> CriticalSection<B, P> {
    /// Creates a critical section with an explicit backend and teardown probe.
    /// The wait event is created on first contention.
    #[must_use]
    pub fn with_backend(backend: B, teardown: P) -> Self {
        Self {
            state: LockState::new(),
            backend,
            teardown,
            bypass_reported: AtomicBool::new(false),
            stats: LockStats::default(),
        }
    }

    /// Creates a critical section, optionally creating its wait event now.
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if `eager_event` is set and the backend
    /// cannot allocate an event.
    pub fn initialize(backend: B, teardown: P, eager_event: bool) -> Result<Self> {
        let section = Self::with_backend(backend, teardown);
        if eager_event {
            section.wait_event()?;
        }
        Ok(section)
    }

    /// Acquires the lock, blocking for at most `timeout` if another thread
    /// owns it.
    ///
    /// Every `Ok` must be matched by exactly one [`leave`](Self::leave) on
    /// the same thread.
    ///
    /// # Errors
    ///
    /// - `TimedOut`: the lock was not acquired; do not call `leave`.
    /// - `ResourceExhausted`: the wait event could not be created.
    /// - `BackendFailure`: waiting on the event failed.
    ///
    /// In every error case the caller does not hold the lock.
    pub fn enter(&self, timeout: Timeout) -> Result<Acquisition> {
        if self.teardown.in_progress() {
            self.report_bypass();
            return Ok(Acquisition::TeardownBypass);
        }

        let me = ThreadIdentity::current();
        let previous = self.state.counter.fetch_add(1, Ordering::AcqRel);
        if previous == UNLOCKED {
            self.state.claim(me);
            self.stats.uncontended();
            return Ok(Acquisition::Uncontended);
        }

        if self.state.is_owner(me) {
            self.state.recursion.fetch_add(1, Ordering::Relaxed);
            self.stats.reentrant();
            return Ok(Acquisition::Reentrant);
        }

        self.enter_contended(me, timeout)
    }

    #[cold]
    fn enter_contended(&self, me: ThreadIdentity, timeout: Timeout) -> Result<Acquisition> {
        tracing::trace!(thread = %me, ?timeout, "critical section contended");
        let event = self.wait_event()?;
        let started = Instant::now();
        match event.wait(timeout)? {
            WaitStatus::Signaled => {
                self.state.claim(me);
                self.stats.contended();
                tracing::trace!(thread = %me, waited = ?started.elapsed(), "ownership handed over");
                Ok(Acquisition::Contended)
            }
            WaitStatus::TimedOut => {
                self.stats.timeout();
                let waited = started.elapsed();
                tracing::debug!(thread = %me, ?timeout, ?waited, "wait for critical section timed out");
                Err(Error::timed_out(waited))
            }
        }
    }

    /// Releases one level of ownership.
    ///
    /// The calling thread must hold the lock through a successful
    /// [`enter`](Self::enter); this is not checked in release builds. When the
    /// last level is released and other threads are counted, one of them is
    /// woken.
    ///
    /// If the wait event cannot be created or signaled at that point the
    /// process is aborted: continuing would leave a waiter blocked forever.
    pub fn leave(&self) {
        if self.teardown.in_progress() {
            return;
        }

        let depth = self.state.recursion.load(Ordering::Relaxed);
        debug_assert!(depth > 0, "leave without a matching enter");
        let remaining = depth.wrapping_sub(1);
        self.state.recursion.store(remaining, Ordering::Relaxed);
        if remaining > 0 {
            self.state.counter.fetch_sub(1, Ordering::Release);
            return;
        }

        self.state.owner.store(ThreadIdentity::NONE, Ordering::Relaxed);
        let after = self.state.counter.fetch_sub(1, Ordering::AcqRel).wrapping_sub(1);
        if after > UNLOCKED {
            self.wake_one();
        }
    }

    #[cold]
    fn wake_one(&self) {
        let event = match self.wait_event() {
            Ok(event) => event,
            Err(err) => fail_fast(&err),
        };
        if let Err(err) = event.notify_one() {
            fail_fast(&err);
        }
    }

    /// Releases the wait event, if one was ever created.
    ///
    /// Taking `self` by value means no thread can still hold or wait for the
    /// lock.
    ///
    /// # Errors
    ///
    /// Returns `BackendFailure` if the backend fails to close the event.
    pub fn delete(mut self) -> Result<()> {
        match self.state.event.take() {
            None => Ok(()),
            Some(event) => {
                tracing::debug!(backend = self.backend.name(), "closing wait event");
                event.close()
            }
        }
    }

    /// Returns the wait event, creating and publishing it on first use.
    ///
    /// Concurrent first callers each build an event; exactly one is published
    /// and the others are closed here.
    fn wait_event(&self) -> Result<&B::Event> {
        let mut built = false;
        let mut lost_race = false;
        let event = self.state.event.get_or_try_publish(
            || {
                built = true;
                self.backend.create_event()
            },
            |rejected| {
                lost_race = true;
                self.stats.event_discarded();
                tracing::debug!(
                    backend = self.backend.name(),
                    "wait event lost the creation race; discarding"
                );
                if let Err(err) = rejected.close() {
                    tracing::warn!(error = %err, "failed to close discarded wait event");
                }
            },
        )?;
        if built && !lost_race {
            self.stats.event_published();
            tracing::debug!(backend = self.backend.name(), "wait event created");
        }
        Ok(event)
    }

    #[cold]
    fn report_bypass(&self) {
        if !self.bypass_reported.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                backend = self.backend.name(),
                "teardown in progress; critical section no longer synchronizes"
            );
        }
    }

    /// Acquires the lock, waiting as long as needed, and returns a guard that
    /// releases it on drop.
    ///
    /// # Errors
    ///
    /// See [`enter`](Self::enter).
    pub fn lock(&self) -> Result<SectionGuard<'_, B, P>> {
        self.lock_with(Timeout::Infinite)
    }

    /// Acquires the lock only if that does not require waiting.
    ///
    /// # Errors
    ///
    /// `TimedOut` if another thread owns the lock. See [`enter`](Self::enter).
    pub fn try_lock(&self) -> Result<SectionGuard<'_, B, P>> {
        self.lock_with(Timeout::NoWait)
    }

    /// Acquires the lock, waiting for at most `timeout`.
    ///
    /// # Errors
    ///
    /// See [`enter`](Self::enter).
    pub fn lock_timeout(&self, timeout: Duration) -> Result<SectionGuard<'_, B, P>> {
        self.lock_with(Timeout::After(timeout))
    }

    /// Acquires the lock under an arbitrary [`Timeout`] and returns a guard.
    ///
    /// # Errors
    ///
    /// See [`enter`](Self::enter).
    pub fn lock_with(&self, timeout: Timeout) -> Result<SectionGuard<'_, B, P>> {
        let acquisition = self.enter(timeout)?;
        Ok(SectionGuard {
            section: self,
            acquisition,
            _not_send: PhantomData,
        })
    }

    /// True if the calling thread owns the lock.
    #[must_use]
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.state.is_owner(ThreadIdentity::current())
    }

    /// Unmatched `enter` calls by the calling thread; `0` if it is not the
    /// owner.
    #[must_use]
    pub fn recursion_depth(&self) -> u32 {
        if self.is_owned_by_current_thread() {
            self.state.recursion.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// True once the wait event exists.
    #[must_use]
    pub fn has_wait_event(&self) -> bool {
        self.state.event.is_set()
    }

    /// Diagnostic copy of the lock state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Acquisition counters (all zero unless `lock-metrics` is enabled).
    #[must_use]
    pub fn stats(&self) -> LockStatsSnapshot {
        self.stats.snapshot()
    }

    /// The wait backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: WaitBackend, P: TeardownProbe> fmt::Debug for CriticalSection<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriticalSection")
            .field("backend", &self.backend.name())
            .field("state", &self.state.snapshot())
            .finish()
    }
}

#[cold]
#[inline(never)]
fn fail_fast(err: &Error) -> ! {
    tracing::error!(error = %err, "failed to wake a critical section waiter; aborting");
    std::process::abort()
}

/// Holds one level of a [`CriticalSection`]; releases it on drop.
///
/// Not `Send`: the level must be released by the thread that acquired it.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct SectionGuard<'a, B: WaitBackend = ParkingBackend, P: TeardownProbe = ProcessTeardown> {
    section: &'a CriticalSection<B, P>,
    acquisition: Acquisition,
    _not_send: PhantomData<*const ()>,
}

impl<B: WaitBackend, P: TeardownProbe> SectionGuard<'_, B, P> {
    /// How the lock was obtained.
    #[must_use]
    pub fn acquisition(&self) -> Acquisition {
        self.acquisition
    }
}

impl<B: WaitBackend, P: TeardownProbe> Drop for SectionGuard<'_, B, P> {
    fn drop(&mut self) {
        if self.acquisition != Acquisition::TeardownBypass {
            self.section.leave();
        }
    }
}

impl<B: WaitBackend, P: TeardownProbe> fmt::Debug for SectionGuard<'_, B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionGuard")
            .field("acquisition", &self.acquisition)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sync::backend::ScriptedBackend;
    use crate::sync::teardown::{NoTeardown, TeardownFlag};
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn scripted() -> (ScriptedBackend, CriticalSection<ScriptedBackend, NoTeardown>) {
        let backend = ScriptedBackend::new();
        let section = CriticalSection::with_backend(backend.clone(), NoTeardown);
        (backend, section)
    }

    #[test]
    fn uncontended_enter_takes_fast_path() {
        init_test("uncontended_enter_takes_fast_path");
        let (backend, section) = scripted();
        let acquisition = section.enter(Timeout::Infinite).expect("enter");
        crate::assert_with_log!(
            acquisition == Acquisition::Uncontended,
            "acquisition",
            Acquisition::Uncontended,
            acquisition
        );
        assert!(section.is_owned_by_current_thread());
        assert_eq!(section.recursion_depth(), 1);
        section.leave();

        let snap = section.snapshot();
        assert!(snap.is_unlocked());
        assert!(snap.is_consistent());
        crate::assert_with_log!(
            backend.counters().created() == 0,
            "no event on the fast path",
            0usize,
            backend.counters().created()
        );
        crate::test_complete!("uncontended_enter_takes_fast_path");
    }

    #[test]
    fn reentrant_enter_needs_matching_leaves() {
        init_test("reentrant_enter_needs_matching_leaves");
        let section = Arc::new(CriticalSection::with_backend(ParkingBackend, NoTeardown));
        assert_eq!(section.enter(Timeout::NoWait).expect("first"), Acquisition::Uncontended);
        assert_eq!(section.enter(Timeout::NoWait).expect("second"), Acquisition::Reentrant);
        assert_eq!(section.recursion_depth(), 2);

        section.leave();
        assert_eq!(section.recursion_depth(), 1);
        let other = Arc::clone(&section);
        let still_held = thread::spawn(move || other.enter(Timeout::NoWait))
            .join()
            .expect("thread panicked");
        crate::assert_with_log!(
            still_held.as_ref().is_err_and(Error::is_timeout),
            "held after one of two leaves",
            "TimedOut",
            still_held
        );

        section.leave();
        assert!(!section.is_owned_by_current_thread());
        crate::test_complete!("reentrant_enter_needs_matching_leaves");
    }

    #[test]
    fn no_wait_on_held_lock_times_out_without_touching_owner() {
        init_test("no_wait_on_held_lock_times_out_without_touching_owner");
        let (_backend, section) = scripted();
        let section = Arc::new(section);
        section.enter(Timeout::Infinite).expect("enter");
        let owner = section.snapshot().owner;

        let other = Arc::clone(&section);
        let started = Instant::now();
        let result = thread::spawn(move || other.enter(Timeout::NoWait))
            .join()
            .expect("thread panicked");
        let err = result.expect_err("must not acquire");
        assert_eq!(err.kind(), ErrorKind::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(1));
        crate::assert_with_log!(
            section.snapshot().owner == owner,
            "owner unchanged",
            owner,
            section.snapshot().owner
        );
        assert!(section.is_owned_by_current_thread());
        section.leave();
        crate::test_complete!("no_wait_on_held_lock_times_out_without_touching_owner");
    }

    #[test]
    fn bounded_wait_expires() {
        init_test("bounded_wait_expires");
        let section = Arc::new(CriticalSection::with_backend(ParkingBackend, NoTeardown));
        let _guard = section.lock().expect("lock");
        let other = Arc::clone(&section);
        let started = Instant::now();
        let result = thread::spawn(move || {
            other
                .lock_timeout(Duration::from_millis(30))
                .map(|g| g.acquisition())
        })
        .join()
        .expect("thread panicked");
        assert!(result.is_err_and(|e| e.is_timeout()));
        assert!(started.elapsed() >= Duration::from_millis(30));
        crate::test_complete!("bounded_wait_expires");
    }

    #[test]
    fn contended_waiter_gets_ownership_on_leave() {
        init_test("contended_waiter_gets_ownership_on_leave");
        let (backend, section) = scripted();
        let section = Arc::new(section);
        section.enter(Timeout::Infinite).expect("enter");

        let other = Arc::clone(&section);
        let waiter = thread::spawn(move || {
            let acquisition = other.enter(Timeout::Infinite).expect("waiter enter");
            let owned = other.is_owned_by_current_thread();
            other.leave();
            (acquisition, owned)
        });
        while section.snapshot().contenders() < 2 {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(10));
        section.leave();

        let (acquisition, owned) = waiter.join().expect("waiter panicked");
        assert_eq!(acquisition, Acquisition::Contended);
        assert!(owned);
        assert!(section.snapshot().is_unlocked());
        assert_eq!(backend.counters().created(), 1);
        assert_eq!(backend.counters().notifies(), 1);
        crate::test_complete!("contended_waiter_gets_ownership_on_leave");
    }

    #[test]
    fn timed_out_slot_keeps_lock_exclusive() {
        init_test("timed_out_slot_keeps_lock_exclusive");
        let section = Arc::new(CriticalSection::with_backend(ParkingBackend, NoTeardown));
        section.enter(Timeout::Infinite).expect("enter");

        let other = Arc::clone(&section);
        let timed_out = thread::spawn(move || other.enter(Timeout::NoWait))
            .join()
            .expect("thread panicked");
        assert!(timed_out.is_err_and(|e| e.is_timeout()));

        // The abandoned slot turns the release into a latched wake.
        section.leave();
        let snap = section.snapshot();
        assert_eq!(snap.owner, None);
        assert_eq!(snap.contenders(), 1);

        let other = Arc::clone(&section);
        let acquisition = thread::spawn(move || {
            let acquisition = other.enter(Timeout::NoWait).expect("latched wake");
            other.leave();
            acquisition
        })
        .join()
        .expect("thread panicked");
        assert_eq!(acquisition, Acquisition::Contended);

        // Still exclusive: a second contender is refused while one holds it.
        let _guard = section.lock().expect("lock");
        let other = Arc::clone(&section);
        let refused = thread::spawn(move || other.enter(Timeout::NoWait))
            .join()
            .expect("thread panicked");
        assert!(refused.is_err_and(|e| e.is_timeout()));
        crate::test_complete!("timed_out_slot_keeps_lock_exclusive");
    }

    #[test]
    fn counter_wraps_after_abandoned_slots_saturate_it() {
        init_test("counter_wraps_after_abandoned_slots_saturate_it");
        let (backend, section) = scripted();
        let section = Arc::new(section);
        section.enter(Timeout::Infinite).expect("enter");
        section.state.counter.store(i64::MAX, Ordering::SeqCst);

        let other = Arc::clone(&section);
        let timed_out = thread::spawn(move || other.enter(Timeout::NoWait))
            .join()
            .expect("thread panicked");
        assert!(timed_out.is_err_and(|e| e.is_timeout()));
        assert_eq!(section.snapshot().counter, i64::MIN);

        section.leave();
        let snap = section.snapshot();
        assert_eq!(snap.owner, None);
        assert_eq!(snap.counter, i64::MAX);
        assert_eq!(backend.counters().notifies(), 1);

        let other = Arc::clone(&section);
        let acquisition = thread::spawn(move || {
            let acquisition = other.enter(Timeout::NoWait).expect("latched wake");
            other.leave();
            acquisition
        })
        .join()
        .expect("thread panicked");
        crate::assert_with_log!(
            acquisition == Acquisition::Contended,
            "handoff across the wrap",
            Acquisition::Contended,
            acquisition
        );
        assert_eq!(backend.counters().notifies(), 2);
        crate::test_complete!("counter_wraps_after_abandoned_slots_saturate_it");
    }

    #[test]
    fn racing_first_contenders_publish_one_event() {
        init_test("racing_first_contenders_publish_one_event");
        const RACERS: usize = 6;
        let backend = ScriptedBackend::new().with_creation_rendezvous(RACERS);
        let section = Arc::new(CriticalSection::with_backend(backend.clone(), NoTeardown));
        section.enter(Timeout::Infinite).expect("enter");

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let section = Arc::clone(&section);
                thread::spawn(move || section.enter(Timeout::NoWait))
            })
            .collect();
        for handle in handles {
            let result = handle.join().expect("racer panicked");
            assert!(result.is_err_and(|e| e.is_timeout()));
        }

        crate::assert_with_log!(
            backend.counters().created() == RACERS,
            "every racer built an event",
            RACERS,
            backend.counters().created()
        );
        crate::assert_with_log!(
            backend.counters().live() == 1,
            "exactly one live event",
            1usize,
            backend.counters().live()
        );
        #[cfg(feature = "lock-metrics")]
        {
            let stats = section.stats();
            assert_eq!(stats.events_published, 1);
            assert_eq!(stats.events_discarded, (RACERS - 1) as u64);
        }

        section.leave();
        let section = Arc::into_inner(section).expect("sole owner");
        section.delete().expect("delete");
        assert_eq!(backend.counters().live(), 0);
        crate::test_complete!("racing_first_contenders_publish_one_event");
    }

    #[test]
    fn eager_initialize_creates_event() {
        init_test("eager_initialize_creates_event");
        let backend = ScriptedBackend::new();
        let section = CriticalSection::initialize(backend.clone(), NoTeardown, true)
            .expect("initialize");
        assert!(section.has_wait_event());
        assert_eq!(backend.counters().live(), 1);
        section.delete().expect("delete");
        assert_eq!(backend.counters().live(), 0);
        assert_eq!(backend.counters().closed(), 1);
        crate::test_complete!("eager_initialize_creates_event");
    }

    #[test]
    fn eager_initialize_reports_exhaustion() {
        init_test("eager_initialize_reports_exhaustion");
        let backend = ScriptedBackend::new();
        backend.fail_create(true);
        let err = CriticalSection::initialize(backend.clone(), NoTeardown, true)
            .expect_err("creation must fail");
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

        let lazy = CriticalSection::initialize(backend, NoTeardown, false);
        assert!(lazy.is_ok());
        crate::test_complete!("eager_initialize_reports_exhaustion");
    }

    #[test]
    fn contended_enter_reports_exhaustion() {
        init_test("contended_enter_reports_exhaustion");
        let (backend, section) = scripted();
        let section = Arc::new(section);
        section.enter(Timeout::Infinite).expect("enter");
        backend.fail_create(true);

        let other = Arc::clone(&section);
        let result = thread::spawn(move || other.enter(Timeout::Infinite))
            .join()
            .expect("thread panicked");
        assert!(result.is_err_and(|e| e.is_resource_exhausted()));
        assert!(section.is_owned_by_current_thread());

        backend.fail_create(false);
        section.leave();
        crate::test_complete!("contended_enter_reports_exhaustion");
    }

    #[test]
    fn wait_failure_surfaces_as_backend_failure() {
        init_test("wait_failure_surfaces_as_backend_failure");
        let (backend, section) = scripted();
        let section = Arc::new(section);
        section.enter(Timeout::Infinite).expect("enter");
        backend.fail_wait(true);

        let other = Arc::clone(&section);
        let result = thread::spawn(move || other.enter(Timeout::Infinite))
            .join()
            .expect("thread panicked");
        let err = result.expect_err("wait must fail");
        assert_eq!(err.kind(), ErrorKind::BackendFailure);
        backend.fail_wait(false);
        section.leave();
        crate::test_complete!("wait_failure_surfaces_as_backend_failure");
    }

    #[test]
    fn delete_without_event_is_ok() {
        init_test("delete_without_event_is_ok");
        let (backend, section) = scripted();
        section.enter(Timeout::Infinite).expect("enter");
        section.leave();
        assert!(!section.has_wait_event());
        section.delete().expect("delete");
        assert_eq!(backend.counters().closed(), 0);
        crate::test_complete!("delete_without_event_is_ok");
    }

    #[test]
    fn delete_reports_close_failure() {
        init_test("delete_reports_close_failure");
        let backend = ScriptedBackend::new();
        let section =
            CriticalSection::initialize(backend.clone(), NoTeardown, true).expect("initialize");
        backend.fail_close(true);
        let err = section.delete().expect_err("close must fail");
        assert_eq!(err.kind(), ErrorKind::BackendFailure);
        crate::test_complete!("delete_reports_close_failure");
    }

    #[test]
    fn teardown_bypasses_held_lock() {
        init_test("teardown_bypasses_held_lock");
        let flag = TeardownFlag::new();
        let section = Arc::new(CriticalSection::with_backend(ParkingBackend, flag.clone()));

        // Another thread takes the lock and "dies" without releasing it.
        let other = Arc::clone(&section);
        thread::spawn(move || {
            other.enter(Timeout::Infinite).expect("enter");
        })
        .join()
        .expect("thread panicked");

        flag.begin();
        let acquisition = section.enter(Timeout::Infinite).expect("bypass");
        assert_eq!(acquisition, Acquisition::TeardownBypass);
        let before = section.snapshot();
        section.leave();
        assert_eq!(section.snapshot(), before);

        let guard = section.lock().expect("bypass guard");
        assert_eq!(guard.acquisition(), Acquisition::TeardownBypass);
        drop(guard);
        assert_eq!(section.snapshot(), before);
        crate::test_complete!("teardown_bypasses_held_lock");
    }

    #[test]
    fn guard_releases_on_drop() {
        init_test("guard_releases_on_drop");
        let section = CriticalSection::with_backend(ParkingBackend, NoTeardown);
        {
            let outer = section.lock().expect("outer");
            let inner = section.try_lock().expect("inner");
            assert_eq!(outer.acquisition(), Acquisition::Uncontended);
            assert_eq!(inner.acquisition(), Acquisition::Reentrant);
            assert_eq!(section.recursion_depth(), 2);
        }
        assert!(section.snapshot().is_unlocked());
        assert_eq!(section.recursion_depth(), 0);
        crate::test_complete!("guard_releases_on_drop");
    }

    #[test]
    fn threads_never_overlap() {
        init_test("threads_never_overlap");
        const THREADS: usize = 4;
        const ITERATIONS: usize = 2_000;
        let section = Arc::new(CriticalSection::with_backend(ParkingBackend, NoTeardown));
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let section = Arc::clone(&section);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..ITERATIONS {
                        let _guard = section.lock().expect("lock");
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker panicked");
        }
        let snap = section.snapshot();
        crate::assert_with_log!(snap.is_unlocked(), "unlocked at end", UNLOCKED, snap.counter);
        crate::test_complete!("threads_never_overlap");
    }

    #[test]
    fn debug_output_names_backend() {
        let section = CriticalSection::new();
        let dbg = format!("{section:?}");
        assert!(dbg.contains("CriticalSection"));
        assert!(dbg.contains("parking"));
        let guard = section.lock().expect("lock");
        assert!(format!("{guard:?}").contains("Uncontended"));
    }

    #[test]
    fn acquisition_paths() {
        assert!(Acquisition::Uncontended.is_fast_path());
        assert!(Acquisition::Reentrant.is_fast_path());
        assert!(!Acquisition::Contended.is_fast_path());
        assert!(!Acquisition::TeardownBypass.is_fast_path());
    }
}
