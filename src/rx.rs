//! Receive Pipeline (spec.md §4.D).
//!
//! Two actors share a bounded ring of interface numbers: the device ISR
//! posts (`rx_task_signal`, never blocks), a dedicated worker thread pends
//! (blocking `recv`) and does the actual demux under the global lock. The
//! ring is `std::sync::mpsc::sync_channel`, a direct translation of "SPSC
//! bounded queue with atomic post/pend" (spec.md §9 Design Notes) using
//! only the standard library.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use log::warn;

use crate::balance;
use crate::buf::header::{BufFlags, BufType, HeaderHandle, ProtoTag};
use crate::core::{NetCore, NetState};
use crate::error::NetError;
use crate::iface::IfNbr;
use crate::lock::IsrGuard;

/// The ISR → worker half of the Rx ring.
pub struct RxRingTx {
    tx: SyncSender<IfNbr>,
}

/// The worker-owned receive half.
pub struct RxRingRx {
    rx: Receiver<IfNbr>,
}

pub fn ring(capacity: usize) -> (RxRingTx, RxRingRx) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (RxRingTx { tx }, RxRingRx { rx })
}

impl RxRingTx {
    /// `RxTaskSignal(ifNbr)`. ISR-callable: wrapped in [`IsrGuard`] so that
    /// in debug builds any accidental attempt to touch the global lock from
    /// here panics immediately (P8) instead of deadlocking a real system.
    /// Touches only the global `rx_task_pkt_ctr` and the per-interface
    /// `IsrSignals` slot, both lock-free (see `core::IsrSignals`).
    pub fn rx_task_signal(&self, core: &NetCore, if_nbr: IfNbr) -> Result<(), NetError> {
        let _guard = IsrGuard::enter();
        match self.tx.try_send(if_nbr) {
            Ok(()) => {
                core.stats().rx_task_pkt_ctr.inc();
                if let Ok(signals) = core.signals(if_nbr) {
                    balance::rx_pkt_inc(signals);
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(NetError::RxQFull),
            Err(TrySendError::Disconnected(_)) => Err(NetError::RxQSignalFault),
        }
    }
}

/// Runs the Rx worker loop until the ring's sender side is dropped. Spawned
/// once by [`NetCore::start_workers`] onto its own OS thread, mirroring the
/// teacher's `rx::spawn`/`StackInterfaceThread::spawn` pattern of one
/// long-lived thread per cooperating actor rather than a task pool.
pub fn worker_loop(core: Arc<NetCore>, rx_ring: RxRingRx) {
    while let Ok(if_nbr) = rx_ring.rx.recv() {
        process_one(&core, if_nbr);
        std::thread::yield_now();
    }
}

fn process_one(core: &NetCore, if_nbr: IfNbr) {
    let mut state = core.lock();

    core.stats().rx_task_pkt_ctr.dec();
    if let Ok(iface) = state.iface_table.get(if_nbr) {
        iface.stats.rx_pkt_ctr.inc();
    }

    let result = if if_nbr.is_loopback() {
        process_loopback(&mut state)
    } else {
        process_device(&mut state, if_nbr)
    };

    if let Err(e) = result {
        if !e.is_benign() {
            core.stats().rx_discarded.inc();
            if let Ok(iface) = state.iface_table.get(if_nbr) {
                iface.stats.rx_dis_ctr.inc();
            }
            warn!("rx discard on if {:?}: {}", if_nbr, e);
        }
    }

    if let Ok(signals) = core.signals(if_nbr) {
        balance::rx_pkt_dec(signals);
        if state.config.load_balance_enabled {
            balance::wake_suspended_transmitters(signals);
        }
    }
}

fn process_loopback(state: &mut NetState) -> Result<(), NetError> {
    let h = state.loopback_rx.get(&mut state.pools).ok_or(NetError::LoopbackDisabled)?;
    let iface = state.iface_table.get_mut(IfNbr::LOOPBACK)?;
    iface.if_vtbl.rx(&mut state.pools, h)
}

fn process_device(state: &mut NetState, if_nbr: IfNbr) -> Result<(), NetError> {
    let frame = {
        let iface = state.iface_table.get_mut(if_nbr)?;
        let dev = iface.dev_vtbl.as_mut().ok_or(NetError::NullFn)?;
        dev.rx()?
    };
    let Some(bytes) = frame else {
        return Ok(());
    };
    let len = bytes.len();
    let rx_base_ix = 0usize;

    let (h, ix_offset) = state.pools.get(if_nbr, BufType::RxLarge, len, rx_base_ix, BufFlags::RX_REMOTE)?;
    let result = demux_device_frame(state, if_nbr, h, ix_offset, len, &bytes);
    if let Err(e) = &result {
        if !e.is_benign() {
            let _ = state.free_buf(h);
        }
    }
    result
}

fn demux_device_frame(
    state: &mut NetState,
    if_nbr: IfNbr,
    h: HeaderHandle,
    ix_offset: usize,
    len: usize,
    bytes: &[u8],
) -> Result<(), NetError> {
    let data = state.pools.header(h).ok_or(NetError::NullPtr)?.data;
    state.pools.data_mut(data)?[ix_offset..ix_offset + len].copy_from_slice(bytes);
    if let Some(hdr) = state.pools.header_mut(h) {
        hdr.tot_len = len as u32;
        hdr.data_len = len as u32;
        hdr.ix.link = ix_offset as u16;
        hdr.proto_tag = ProtoTag::IfFrame;
    }
    let iface = state.iface_table.get_mut(if_nbr)?;
    iface.stats.rx_octet_ctr.add(len as u32);
    iface.if_vtbl.rx(&mut state.pools, h)
}
