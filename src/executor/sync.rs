//! Completion barriers for the local executor
//!
//! A [`WaitGroup`] counts outstanding tasks. Each dispatched task holds a
//! [`WaitTicket`]; dropping the ticket marks the task finished, on every exit
//! path including panics. Waiters block until the count returns to zero.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counter of outstanding tasks with a blocking "all done" signal
#[derive(Debug, Default)]
pub struct WaitGroup {
    outstanding: AtomicUsize,
    signals: AtomicUsize,
    lock: Mutex<()>,
    idle: Condvar,
}

impl WaitGroup {
    /// Creates an empty wait group
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one outstanding task and returns the ticket that releases it
    #[must_use]
    pub fn enter(self: &Arc<Self>) -> WaitTicket {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        WaitTicket {
            group: Arc::clone(self),
        }
    }

    fn leave(&self) {
        let previous =
            self.outstanding
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            // Only the transition to zero signals.
            Ok(1) => {
                let _guard = self.lock.lock();
                self.signals.fetch_add(1, Ordering::AcqRel);
                self.idle.notify_all();
            }
            Ok(_) => {}
            Err(_) => tracing::warn!("Wait group released more tickets than it issued"),
        }
    }

    /// Blocks until no task is outstanding
    pub fn wait(&self) {
        let mut guard = self.lock.lock();
        while self.outstanding.load(Ordering::Acquire) != 0 {
            self.idle.wait(&mut guard);
        }
    }

    /// Blocks until no task is outstanding or `timeout` elapses.
    ///
    /// Returns true if the group drained.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while self.outstanding.load(Ordering::Acquire) != 0 {
            if self.idle.wait_until(&mut guard, deadline).timed_out() {
                return self.outstanding.load(Ordering::Acquire) == 0;
            }
        }
        true
    }

    /// Number of tasks currently outstanding
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Number of times the count dropped from one to zero
    #[must_use]
    pub fn signals(&self) -> usize {
        self.signals.load(Ordering::Acquire)
    }
}

/// Outstanding-task registration; releases its [`WaitGroup`] on drop
#[derive(Debug)]
pub struct WaitTicket {
    group: Arc<WaitGroup>,
}

impl Drop for WaitTicket {
    fn drop(&mut self) {
        self.group.leave();
    }
}
