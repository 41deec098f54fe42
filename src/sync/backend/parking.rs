//! Portable auto-reset event built on `parking_lot`.

use parking_lot::{Condvar, Mutex};
use std::time::Instant;

use super::{WaitBackend, WaitEvent, WaitStatus};
use crate::error::Result;
use crate::sync::Timeout;

/// Backend producing [`ParkingEvent`]s. Creation cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParkingBackend;

impl WaitBackend for ParkingBackend {
    type Event = ParkingEvent;

    fn name(&self) -> &'static str {
        "parking"
    }

    fn create_event(&self) -> Result<ParkingEvent> {
        Ok(ParkingEvent::new())
    }
}

/// Auto-reset event: a latched flag guarded by a mutex plus a condvar.
#[derive(Debug, Default)]
pub struct ParkingEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl ParkingEvent {
    /// Creates an unsignaled event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitEvent for ParkingEvent {
    fn wait(&self, timeout: Timeout) -> Result<WaitStatus> {
        let mut signaled = self.signaled.lock();
        match timeout.deadline(Instant::now()) {
            None => {
                while !*signaled {
                    self.cond.wait(&mut signaled);
                }
            }
            Some(deadline) => {
                while !*signaled {
                    if self.cond.wait_until(&mut signaled, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        // Checked under the mutex, so a signal racing the deadline is consumed.
        if *signaled {
            *signaled = false;
            Ok(WaitStatus::Signaled)
        } else {
            Ok(WaitStatus::TimedOut)
        }
    }

    fn notify_one(&self) -> Result<()> {
        *self.signaled.lock() = true;
        self.cond.notify_one();
        Ok(())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
