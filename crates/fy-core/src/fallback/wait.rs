//! Bounded wait for something to appear in the page.
//!
//! The host observes DOM mutations and reports each look; the wait settles
//! on the first success, on timeout, or on cancellation. Once settled it
//! ignores further reports so the host can disconnect its observer.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Pending,
    Found,
    TimedOut,
    Cancelled,
}

#[derive(Debug)]
pub struct BoundedWait {
    timeout: Duration,
    status: WaitStatus,
}

impl BoundedWait {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            status: WaitStatus::Pending,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn status(&self) -> WaitStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == WaitStatus::Pending
    }

    /// Report one look at the page, `elapsed` since the wait began.
    pub fn observe(&mut self, found: bool, elapsed: Duration) -> WaitStatus {
        if self.is_pending() {
            if found {
                self.status = WaitStatus::Found;
            } else if elapsed >= self.timeout {
                self.status = WaitStatus::TimedOut;
            }
        }
        self.status
    }

    /// The host's timeout timer fired.
    pub fn expire(&mut self) -> WaitStatus {
        if self.is_pending() {
            self.status = WaitStatus::TimedOut;
        }
        self.status
    }

    pub fn cancel(&mut self) {
        if self.is_pending() {
            self.status = WaitStatus::Cancelled;
        }
    }
}
