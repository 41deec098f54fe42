//! The recursive critical section and the pieces it is built from.
//!
//! # Layout
//!
//! - [`CriticalSection`]: the lock itself, with raw `enter`/`leave` and a
//!   [`SectionGuard`] RAII wrapper.
//! - [`LockState`]: counter, owner, recursion and the lazily created event.
//! - [`backend`]: the wait-event capability ([`WaitBackend`] / [`WaitEvent`])
//!   and its implementations.
//! - [`TeardownProbe`]: decides when synchronization is bypassed during
//!   process shutdown.
//!
//! # Guarantees
//!
//! - At most one thread owns the lock; the owner may re-enter freely.
//! - No kernel object exists until the first contention (unless created
//!   eagerly), and at most one is ever published per lock.
//! - Acquisition is not fair.

pub mod backend;
mod critical_section;
mod identity;
mod set_once;
mod state;
mod stats;
mod teardown;
mod timeout;

pub use backend::{ParkingBackend, WaitBackend, WaitEvent, WaitStatus};
pub use critical_section::{Acquisition, CriticalSection, SectionGuard};
pub use identity::ThreadIdentity;
pub use set_once::SetOnce;
pub use state::{LockState, StateSnapshot, UNLOCKED};
pub use stats::LockStatsSnapshot;
pub use teardown::{
    NoTeardown, ProcessTeardown, TeardownFlag, TeardownProbe, begin_process_teardown,
    process_teardown_in_progress,
};
pub use timeout::Timeout;
