//! Statistics Counters (spec.md §4.B).
//!
//! Every counter is an unsigned value touched under "the process
//! critical-section primitive". In a hosted translation of an
//! interrupt-disable/re-enable pair, that primitive is a single atomic RMW:
//! the counter itself is the critical section, so ISR and task code can
//! both touch it without taking the global lock (see spec.md §5: "Fields
//! that may be read in ISR context... are always read inside the
//! critical-section primitive").

use std::sync::atomic::{AtomicU32, Ordering};

/// A bounded-saturating atomic counter: `inc` never wraps past `u32::MAX`,
/// `dec` never wraps below zero.
#[derive(Debug, Default)]
pub struct Counter(AtomicU32);

impl Counter {
    pub const fn new() -> Self {
        Counter(AtomicU32::new(0))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: u32) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.set(0);
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, delta: u32) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            Some(v.saturating_add(delta))
        });
    }

    pub fn dec(&self) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            Some(v.saturating_sub(1))
        });
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        Counter(AtomicU32::new(self.get()))
    }
}

/// A counter that additionally remembers its value at the previous tick and
/// a derived per-second rate, recomputed by the link-state monitor's
/// periodic tick (spec.md §4.B, §4.H).
#[derive(Debug, Default)]
pub struct PerfCtr {
    pub current: Counter,
    prev: AtomicU32,
    rate_per_sec: AtomicU32,
}

impl PerfCtr {
    pub const fn new() -> Self {
        PerfCtr {
            current: Counter::new(),
            prev: AtomicU32::new(0),
            rate_per_sec: AtomicU32::new(0),
        }
    }

    /// Recomputes `rate_per_sec` from how much `current` moved since the
    /// last call, given the elapsed period in milliseconds.
    pub fn tick(&self, period_ms: u64) {
        let now = self.current.get();
        let prev = self.prev.swap(now, Ordering::Relaxed);
        let delta = now.saturating_sub(prev);
        let rate = if period_ms == 0 {
            0
        } else {
            ((delta as u64).saturating_mul(1000) / period_ms) as u32
        };
        self.rate_per_sec.store(rate, Ordering::Relaxed);
    }

    pub fn rate_per_sec(&self) -> u32 {
        self.rate_per_sec.load(Ordering::Relaxed)
    }
}

/// Per-interface counters named directly from spec.md's component table
/// and receive/transmit pipeline descriptions (§4.C, §4.D, §4.E).
#[derive(Debug, Default)]
pub struct IfStats {
    pub rx_pkt_ctr: Counter,
    pub rx_octet_ctr: Counter,
    pub rx_dis_ctr: Counter,
    pub tx_pkt_ctr: Counter,
    pub tx_octet_ctr: Counter,
    pub tx_pkt_dis_ctr: Counter,
    pub dev_tx_rdy_ctr: Counter,
    pub dev_tx_rdy_timeout_ctr: Counter,
    pub perf_rx: PerfCtr,
    pub perf_tx: PerfCtr,
}

impl IfStats {
    pub fn tick(&self, period_ms: u64) {
        self.perf_rx.tick(period_ms);
        self.perf_tx.tick(period_ms);
    }
}

/// Crate-wide aggregate counters, the ambient complement to per-interface
/// stats (see SPEC_FULL.md "Receive Pipeline — additions").
#[derive(Debug, Default)]
pub struct GlobalStats {
    pub rx_task_pkt_ctr: Counter,
    pub rx_discarded: Counter,
    pub tx_dealloc_signalled: Counter,
}
