//! Load Balancer (spec.md §4.I): rx-count and tx-suspend signalling shared
//! between the Rx pipeline and stream-protocol transmit paths, so a
//! high-rate transmitter cannot starve the Rx worker or vice versa.
//!
//! Operates on [`crate::core::IsrSignals`] rather than on `Interface`
//! directly: these are the fields spec.md §5 says ISR context touches, so
//! they live in a side table reachable without the global lock.

use crate::core::IsrSignals;

/// ISR-side: bump the interface's queued-packet count.
pub fn rx_pkt_inc(signals: &IsrSignals) {
    signals.rx_pkt_ctr.inc();
}

/// Rx-worker-side: the matching decrement once a packet finishes
/// processing.
pub fn rx_pkt_dec(signals: &IsrSignals) {
    signals.rx_pkt_ctr.dec();
}

/// `RxPktIsAvail(if, checkCount)`: true iff more packets are queued than
/// `check_count`. Callers pass an increasing `check_count` to make their
/// own backoff monotone (spec.md §4.I).
pub fn rx_pkt_is_avail(signals: &IsrSignals, check_count: u32) -> bool {
    signals.rx_pkt_ctr.get() > check_count
}

/// `TxSuspend(if)`: a stream transmitter that has observed rx activity
/// cooperatively yields. Increments the suspend counter, blocks on the
/// suspend semaphore for the interface's configured timeout, then
/// decrements regardless of whether it was woken or timed out (spec.md
/// §4.I "Failure semantics: timeouts are silent").
///
/// Must be called with the global lock **not** held — it suspends the
/// calling thread.
pub fn tx_suspend(signals: &IsrSignals) {
    signals.tx_suspend_ctr.inc();
    let _woken = signals.tx_suspend_sem.acquire_timeout(signals.tx_suspend_timeout);
    signals.tx_suspend_ctr.dec();
}

/// Posts the transmit-suspend semaphore once per currently suspended
/// transmitter (spec.md §4.I "Wake-up"). Called by the Rx worker after it
/// finishes a packet.
pub fn wake_suspended_transmitters(signals: &IsrSignals) {
    let n = signals.tx_suspend_ctr.get();
    for _ in 0..n {
        signals.tx_suspend_sem.release();
    }
}
