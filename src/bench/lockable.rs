//! The two locks under comparison, behind one interface.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ConfigError;
use crate::error::Result;
use crate::sync::{CriticalSection, TeardownProbe, WaitBackend};

/// A recursive lock the driver can time.
pub trait Lockable: Send + Sync {
    /// Which implementation this is.
    fn kind(&self) -> LockKind;

    /// Runs `f` while holding the lock.
    ///
    /// # Errors
    ///
    /// Returns the lock's acquisition error; `f` is not run in that case.
    fn with_lock<R>(&self, f: impl FnOnce() -> R) -> Result<R>;
}

/// Identifies a [`Lockable`] in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// [`NativeLock`].
    Native,
    /// [`CriticalSection`].
    Custom,
}

impl LockKind {
    /// Wording used in the human-readable report.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Native => "built-in",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::Custom => "custom",
        })
    }
}

impl FromStr for LockKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "builtin" | "built-in" => Ok(Self::Native),
            "custom" => Ok(Self::Custom),
            _ => Err(ConfigError::Parse(format!("unknown lock: {s}"))),
        }
    }
}

/// The platform's recursive mutex, used as the baseline.
#[derive(Default)]
pub struct NativeLock {
    inner: parking_lot::ReentrantMutex<()>,
}

impl NativeLock {
    /// Creates an unlocked mutex.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: parking_lot::const_reentrant_mutex(()),
        }
    }
}

impl fmt::Debug for NativeLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLock")
            .field("locked", &self.inner.is_locked())
            .finish()
    }
}

impl Lockable for NativeLock {
    fn kind(&self) -> LockKind {
        LockKind::Native
    }

    fn with_lock<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let _guard = self.inner.lock();
        Ok(f())
    }
}

impl<B: WaitBackend, P: TeardownProbe> Lockable for CriticalSection<B, P> {
    fn kind(&self) -> LockKind {
        LockKind::Custom
    }

    fn with_lock<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let _guard = self.lock()?;
        Ok(f())
    }
}
