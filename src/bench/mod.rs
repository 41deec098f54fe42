//! Comparison driver: times [`CriticalSection`](crate::CriticalSection)
//! against a native recursive mutex under a consistency checker.
//!
//! Each run is an explicit state object graph (lock, [`SharedLog`], flags)
//! owned by the caller and lent to scoped worker threads; nothing here is
//! global.

pub mod driver;
mod lockable;
mod log;

pub use driver::{
    ComparisonReport, DriverError, RunReport, compare, run, run_custom, run_native,
};
pub use lockable::{LockKind, Lockable, NativeLock};
pub use log::{Inconsistency, SEED_MASK, STEP, SharedLog, wall_clock_seed};
