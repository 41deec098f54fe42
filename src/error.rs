//! Error types and error handling strategy for critsect.
//!
//! Every fallible operation on a [`CriticalSection`](crate::sync::CriticalSection)
//! returns [`Result<T>`], whose error carries an [`ErrorKind`]:
//!
//! - **ResourceExhausted**: the wait backend could not allocate its kernel
//!   object. Surfaced from eager initialization or from the first contended
//!   `enter`. Never retried automatically.
//! - **TimedOut**: a bounded wait expired without acquiring the lock. Expected
//!   in normal operation; the caller does not hold the lock and must not
//!   `leave` it.
//! - **BackendFailure**: the wait backend reported an error while waiting or
//!   closing. On the wake path this kind never propagates: `leave` aborts the
//!   process instead (see [`crate::sync::CriticalSection::leave`]).
//! - **InvalidState**: the backend was driven into a state it does not
//!   support.
//!
//! # Recovery Classification
//!
//! All errors can be classified by [`Recoverability`]:
//! - `Transient`: temporary failure, safe to retry
//! - `Permanent`: do not retry

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Kernel wait object creation failed (e.g. descriptor table exhaustion).
    ResourceExhausted,
    /// A bounded wait expired before ownership was granted.
    TimedOut,
    /// The wait backend failed while waiting, waking, or closing.
    BackendFailure,
    /// The wait backend was used in a way it does not support.
    InvalidState,
}

impl ErrorKind {
    /// Returns the recoverability classification for this error kind.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        match self {
            Self::TimedOut => Recoverability::Transient,
            Self::ResourceExhausted | Self::BackendFailure | Self::InvalidState => {
                Recoverability::Permanent
            }
        }
    }

    /// Returns true if this error is typically retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.recoverability(), Recoverability::Transient)
    }
}

/// Classification of error recoverability for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recoverability {
    /// Temporary failure that may succeed on retry.
    Transient,
    /// Permanent failure that will not succeed on retry.
    Permanent,
}

impl Recoverability {
    /// Returns true if this error is safe to retry.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns true if this error should never be retried.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// The main error type for critsect operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if a bounded wait expired.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::TimedOut)
    }

    /// Returns true if the backend could not allocate a wait object.
    #[must_use]
    pub const fn is_resource_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::ResourceExhausted)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the recoverability classification.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        self.kind.recoverability()
    }

    /// Returns true if this error is typically retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Creates a timeout error for a wait that lasted `waited`.
    #[must_use]
    pub fn timed_out(waited: std::time::Duration) -> Self {
        Self::new(ErrorKind::TimedOut)
            .with_message(format!("lock not acquired within {waited:?}"))
    }

    /// Creates a resource exhaustion error from the OS error that caused it.
    #[must_use]
    pub fn resource_exhausted(what: &str, cause: std::io::Error) -> Self {
        Self::new(ErrorKind::ResourceExhausted)
            .with_message(format!("failed to create {what}"))
            .with_source(cause)
    }

    /// Creates a backend failure error.
    #[must_use]
    pub fn backend(operation: &str, cause: std::io::Error) -> Self {
        Self::new(ErrorKind::BackendFailure)
            .with_message(format!("wait backend {operation} failed"))
            .with_source(cause)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A specialized Result type for critsect operations.
pub type Result<T> = core::result::Result<T, Error>;
