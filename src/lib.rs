//! A recursive, non-fair, user-mode critical section.
//!
//! Uncontended and reentrant acquisitions are a single atomic increment. A
//! kernel-backed wait event is created only when a thread actually has to
//! block, published race-free, and used to hand ownership to one waiter at a
//! time.
//!
//! # Modules
//!
//! - [`sync`]: [`CriticalSection`], its state, wait backends and teardown
//!   probes.
//! - [`config`]: lock and benchmark-driver configuration with layered
//!   loading.
//! - [`bench`]: the comparison driver that runs the critical section against
//!   a native recursive mutex under a consistency checker.
//! - [`cli`]: exit codes and output formats of the `critsect` binary.
//!
//! # Example
//!
//! ```
//! use critsect::CriticalSection;
//!
//! let section = CriticalSection::new();
//! let guard = section.lock()?;
//! assert!(section.is_owned_by_current_thread());
//! drop(guard);
//! # Ok::<(), critsect::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use config::{
    BackendKind, ConfigError, ConfigLoader, CritsectConfig, DriverConfig, DriverProfile, LockConfig,
};
pub use error::{Error, ErrorKind, Recoverability, Result};
pub use sync::{Acquisition, CriticalSection, SectionGuard, Timeout};
