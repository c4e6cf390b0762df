//! Small hand-rolled synchronization primitives.
//!
//! Grounded on the teacher crate's own style of wrapping `std::sync`
//! primitives in a thin domain type (`VersionedTx`, `TxBarrier`) rather than
//! reaching for an async runtime. This crate has no async dependency
//! anywhere; none is introduced here either.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A counting semaphore with a bounded-wait acquire, used for the device
/// transmit-ready and transmit-suspend signals (spec.md §4.E, §4.I).
pub struct Semaphore {
    count: Mutex<u32>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(initial: u32) -> Self {
        Semaphore {
            count: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    /// Posts one permit, waking a single waiter.
    pub fn release(&self) {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        *count += 1;
        self.cond.notify_one();
    }

    /// Blocks until a permit is available or `timeout` elapses. Returns
    /// `true` if a permit was acquired.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        loop {
            if *count > 0 {
                *count -= 1;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, result) = self
                .cond
                .wait_timeout(count, deadline - now)
                .expect("semaphore mutex poisoned");
            count = guard;
            if result.timed_out() && *count == 0 {
                return false;
            }
        }
    }

    /// Non-blocking acquire attempt, used by tests and by call sites that
    /// must never suspend (none in this crate's core paths, since
    /// `DevTxRdyWait` always uses a bounded timeout, but kept for symmetry
    /// with a real semaphore API).
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    pub fn available(&self) -> u32 {
        *self.count.lock().expect("semaphore mutex poisoned")
    }
}
