//! Exit Records
//!
//! A one-shot completion carrying a process's exit status from the child,
//! which publishes it exactly once, to the parent, which collects it at most
//! once. The record is reference-counted so it outlives whichever side goes
//! away first.
//!
//! # Wakeup Protocol
//! ```text
//!   waiter                          publisher
//!   ------                          ---------
//!   register self as waiter         store status (once)
//!   re-check status                 take registered waiter
//!   park                            unpark waiter
//! ```
//! Either the waiter's re-check sees the status, or the publisher sees the
//! registration and unparks it. `Threads::park` keeps a pending unpark, so a
//! wake that lands between the re-check and `park` is not lost.

use spin::{Mutex, Once};

use super::Pid;
use crate::services::Threads;

/// Exit status of a terminated process.
pub type ExitStatus = i32;

/// Status published by one process for its parent.
#[derive(Debug)]
pub struct ExitRecord {
    pid: Pid,
    status: Once<ExitStatus>,
    waiter: Mutex<Option<Pid>>,
}

impl ExitRecord {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            status: Once::new(),
            waiter: Mutex::new(None),
        }
    }

    /// Pid of the process this record describes.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The published status, if the process has exited.
    pub fn status(&self) -> Option<ExitStatus> {
        self.status.get().copied()
    }

    /// Publish `status` and wake the registered waiter.
    ///
    /// Only the first publication takes effect; the status never changes
    /// afterwards. Returns the status that is now recorded.
    pub fn publish(&self, status: ExitStatus, threads: &dyn Threads) -> ExitStatus {
        let recorded = *self.status.call_once(|| status);
        if let Some(waiter) = self.waiter.lock().take() {
            log::trace!("exit record {}: waking {}", self.pid, waiter);
            threads.unpark(waiter);
        }
        recorded
    }

    /// Block `waiter` until a status is published, then return it.
    pub fn wait(&self, waiter: Pid, threads: &dyn Threads) -> ExitStatus {
        loop {
            if let Some(status) = self.status() {
                return status;
            }

            *self.waiter.lock() = Some(waiter);

            if let Some(status) = self.status() {
                self.waiter.lock().take();
                return status;
            }

            threads.park();
        }
    }
}
