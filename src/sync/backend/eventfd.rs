//! Linux `eventfd(2)` wait objects.
//!
//! Each event is one kernel eventfd opened in semaphore mode and
//! non-blocking:
//!
//! - `notify_one` writes `1`, incrementing the kernel counter.
//! - `wait` reads, which atomically decrements the counter by one or fails
//!   with `EAGAIN` when it is zero; in that case the thread blocks in
//!   `poll(2)` until the descriptor becomes readable or the deadline passes.
//!
//! Because the decrement is done by the kernel, two racing waiters can never
//! both consume one signal. The lock never has more than one wake
//! outstanding, so the counter stays at 0 or 1 and behaves like an auto-reset
//! event.
//!
//! # Safety
//!
//! This module uses `unsafe` to call `eventfd`, `read`, `write`, `poll` and
//! `close` through libc. The descriptor is owned by an `OwnedFd` for its
//! whole life, so every raw call sees a valid, open descriptor.

#![allow(unsafe_code)]

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::time::Instant;

use super::{WaitBackend, WaitEvent, WaitStatus};
use crate::error::{Error, Result};
use crate::sync::Timeout;

/// Backend producing [`EventFdEvent`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFdBackend;

impl WaitBackend for EventFdBackend {
    type Event = EventFdEvent;

    fn name(&self) -> &'static str {
        "eventfd"
    }

    fn create_event(&self) -> Result<EventFdEvent> {
        EventFdEvent::new()
    }
}

/// A kernel eventfd used as an auto-reset event.
#[derive(Debug)]
pub struct EventFdEvent {
    fd: OwnedFd,
}

impl EventFdEvent {
    /// Opens a new, unsignaled eventfd.
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if the kernel refuses the descriptor
    /// (`EMFILE`, `ENFILE`, `ENOMEM`, ...).
    pub fn new() -> Result<Self> {
        let flags = libc::EFD_CLOEXEC | libc::EFD_NONBLOCK | libc::EFD_SEMAPHORE;
        // SAFETY: `eventfd` takes no pointers; a negative return is handled below.
        let raw = unsafe { libc::eventfd(0, flags) };
        if raw < 0 {
            return Err(Error::resource_exhausted(
                "eventfd",
                io::Error::last_os_error(),
            ));
        }
        // SAFETY: `raw` is a freshly opened descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(Self { fd })
    }

    fn raw(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Consumes one signal if available without blocking.
    fn try_consume(&self) -> io::Result<bool> {
        let mut value: u64 = 0;
        loop {
            // SAFETY: the descriptor is open while `self` lives and `value` is a
            // writable, properly aligned 8-byte buffer, as eventfd reads require.
            let n = unsafe {
                libc::read(
                    self.raw(),
                    std::ptr::from_mut(&mut value).cast::<libc::c_void>(),
                    std::mem::size_of::<u64>(),
                )
            };
            if n == std::mem::size_of::<u64>() as isize {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::WouldBlock => return Ok(false),
                io::ErrorKind::Interrupted => {}
                _ => return Err(err),
            }
        }
    }

    /// Blocks until readable or until `timeout_ms` elapses.
    fn poll_readable(&self, timeout_ms: i32) -> io::Result<()> {
        let mut pfd = libc::pollfd {
            fd: self.raw(),
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `pfd` is a single valid `pollfd` on the stack and `nfds` is 1.
        let rc = unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl WaitEvent for EventFdEvent {
    fn wait(&self, timeout: Timeout) -> Result<WaitStatus> {
        let deadline = timeout.deadline(Instant::now());
        loop {
            if self.try_consume().map_err(|e| Error::backend("read", e))? {
                return Ok(WaitStatus::Signaled);
            }
            let remaining = match deadline {
                None => None,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(WaitStatus::TimedOut);
                    }
                    Some(deadline - now)
                }
            };
            // Readable may still lose to another waiter; loop and re-read.
            self.poll_readable(Timeout::poll_millis(remaining))
                .map_err(|e| Error::backend("poll", e))?;
        }
    }

    fn notify_one(&self) -> Result<()> {
        let value: u64 = 1;
        loop {
            // SAFETY: the descriptor is open while `self` lives and `value` is a
            // readable 8-byte buffer, as eventfd writes require.
            let n = unsafe {
                libc::write(
                    self.raw(),
                    std::ptr::from_ref(&value).cast::<libc::c_void>(),
                    std::mem::size_of::<u64>(),
                )
            };
            if n == std::mem::size_of::<u64>() as isize {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(Error::backend("write", err));
            }
        }
    }

    fn close(self) -> Result<()> {
        let raw = self.fd.into_raw_fd();
        // SAFETY: ownership of `raw` was released by `into_raw_fd`; it is
        // closed exactly once here.
        if unsafe { libc::close(raw) } < 0 {
            return Err(Error::backend("close", io::Error::last_os_error()));
        }
        Ok(())
    }
}
