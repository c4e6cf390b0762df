//! The global network lock (spec.md §5).
//!
//! A single mutex guarding all mutable network state. Every public API
//! entry except `isr_handler`, `rx_task_signal`, `tx_dealloc_task_post`, and
//! `get` acquires it on entry and releases on every exit path — in Rust
//! that's simply "holds the `MutexGuard` for the duration of the function",
//! so there is no separate release bookkeeping to get wrong.
//!
//! In debug builds the lock additionally enforces P8 ("no ISR-callable
//! entry ever pends on the global lock") at runtime: the three ISR-callable
//! entry points wrap their body in [`IsrGuard`], and acquiring the lock
//! while that guard is live panics immediately instead of deadlocking.

use std::cell::Cell;
use std::sync::{Mutex, MutexGuard};

thread_local! {
    static IN_ISR_CONTEXT: Cell<bool> = const { Cell::new(false) };
}

/// RAII marker for "this thread is currently executing code on behalf of an
/// interrupt service routine". Held for the duration of `isr_handler`,
/// `rx_task_signal`, and `tx_dealloc_task_post`.
pub struct IsrGuard {
    _private: (),
}

impl IsrGuard {
    pub fn enter() -> Self {
        IN_ISR_CONTEXT.with(|f| {
            debug_assert!(!f.get(), "re-entrant ISR context");
            f.set(true);
        });
        IsrGuard { _private: () }
    }
}

impl Drop for IsrGuard {
    fn drop(&mut self) {
        IN_ISR_CONTEXT.with(|f| f.set(false));
    }
}

fn in_isr_context() -> bool {
    IN_ISR_CONTEXT.with(|f| f.get())
}

/// A mutex that refuses (by panicking, in debug builds) to be acquired from
/// within an [`IsrGuard`] scope.
pub struct NetLock<T> {
    inner: Mutex<T>,
}

impl<T> NetLock<T> {
    pub fn new(value: T) -> Self {
        NetLock {
            inner: Mutex::new(value),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        if cfg!(debug_assertions) && in_isr_context() {
            panic!("attempted to acquire the global network lock from ISR context");
        }
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
