//! Transmit Pipeline (spec.md §4.E).

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use log::warn;

use crate::buf::header::{BufFlags, BufType, DataHandle, HeaderHandle, LayerIx, ProtoTag};
use crate::core::{NetCore, NetState};
use crate::error::{NetError, NetResult};
use crate::iface::{IfNbr, LinkState};
use crate::lock::IsrGuard;

/// The ISR → dealloc-worker half of the transmit-completion ring. Carries
/// a bare data-area handle, not a header, matching spec.md §4.E's device
/// completion ISR posting "the bare data-area pointer (not a header)".
pub struct TxDeallocRingTx {
    tx: SyncSender<DataHandle>,
}

pub struct TxDeallocRingRx {
    rx: Receiver<DataHandle>,
}

pub fn dealloc_ring(capacity: usize) -> (TxDeallocRingTx, TxDeallocRingRx) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (TxDeallocRingTx { tx }, TxDeallocRingRx { rx })
}

impl TxDeallocRingTx {
    /// `TxDeallocTaskPost(dataPtr)`. ISR-callable.
    pub fn tx_dealloc_task_post(&self, data: DataHandle) -> NetResult<()> {
        let _guard = IsrGuard::enter();
        match self.tx.try_send(data) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NetError::TxDeallocQFull),
            Err(TrySendError::Disconnected(_)) => Err(NetError::TxDeallocQSignalFault),
        }
    }
}

/// Public `Tx(bufList)` entry: submits each buffer in the caller's list in
/// order. Translated as a plain slice rather than an intrusive list walk —
/// once submitted nothing downstream needs these buffers linked to each
/// other, so there is no reason to spend one of a header's three link-field
/// pairs on a transient, caller-owned chain (see DESIGN.md).
pub fn tx(core: &NetCore, if_tx: IfNbr, bufs: &[HeaderHandle]) -> Vec<NetResult<()>> {
    bufs.iter().map(|&h| tx_one(core, if_tx, h)).collect()
}

/// Submits a single buffer through the full prepare → device hand-off
/// pipeline (spec.md §4.E).
pub fn tx_one(core: &NetCore, if_tx: IfNbr, h: HeaderHandle) -> NetResult<()> {
    let mut state = core.lock();

    let up = state
        .iface_table
        .get(if_tx)
        .map(|iface| iface.link == LinkState::Up)
        .unwrap_or(false);
    if !up {
        let _ = state.free_buf(h);
        if let Ok(iface) = state.iface_table.get_mut(if_tx) {
            iface.stats.tx_pkt_dis_ctr.inc();
        }
        return Err(NetError::LinkDown);
    }

    if if_tx.is_loopback() {
        return tx_loopback(&mut state, core, h);
    }

    if let Err(e) = validate_tx_pkt(&state, h) {
        discard(&mut state, if_tx, h);
        return Err(e);
    }

    let frame_result = {
        let iface = state.iface_table.get_mut(if_tx)?;
        iface.if_vtbl.tx(&mut state.pools, h)
    };
    if let Err(e) = frame_result {
        if e == NetError::TxAddrPend {
            // Non-fatal: the packet now belongs to address resolution.
            return Ok(());
        }
        discard(&mut state, if_tx, h);
        return Err(e);
    }

    let dev_tx_rdy_timeout = state.config.dev_tx_rdy_timeout;
    drop(state);

    let signals = core.signals(if_tx)?;
    let ready = signals.dev_tx_rdy_sem.acquire_timeout(dev_tx_rdy_timeout);

    let mut state = core.lock();
    if !ready {
        discard(&mut state, if_tx, h);
        if let Ok(iface) = state.iface_table.get_mut(if_tx) {
            iface.stats.dev_tx_rdy_timeout_ctr.inc();
        }
        return Err(NetError::TxRdyTimeout);
    }
    if let Ok(iface) = state.iface_table.get_mut(if_tx) {
        iface.stats.dev_tx_rdy_ctr.inc();
    }

    if let Some(hdr) = state.pools.header_mut(h) {
        hdr.flags.insert(BufFlags::TX_LOCK);
    }
    let NetState { pools, inflight, .. } = &mut *state;
    inflight.push_back(pools, h);

    let (start, end, data) = {
        let hdr = state.pools.header(h).ok_or(NetError::NullPtr)?;
        let start = if LayerIx::is_none_ix(hdr.ix.link) { 0 } else { hdr.ix.link as usize };
        (start, hdr.tot_len as usize, hdr.data)
    };
    let bytes = state.pools.data(data)?.get(start..end).ok_or(NetError::InvalidBufLen)?.to_vec();

    let send_result = {
        let iface = state.iface_table.get_mut(if_tx)?;
        let dev = iface.dev_vtbl.as_mut().ok_or(NetError::NullFn)?;
        dev.tx(&bytes)
    };

    match send_result {
        Ok(()) => {
            if let Ok(iface) = state.iface_table.get_mut(if_tx) {
                iface.stats.tx_pkt_ctr.inc();
                iface.stats.tx_octet_ctr.add((end - start) as u32);
            }
            Ok(())
        }
        Err(e) => {
            let NetState { pools, inflight, .. } = &mut *state;
            inflight.remove(pools, h);
            if let Some(hdr) = pools.header_mut(h) {
                hdr.flags.remove(BufFlags::TX_LOCK);
            }
            discard(&mut state, if_tx, h);
            Err(e)
        }
    }
}

fn discard(state: &mut NetState, if_tx: IfNbr, h: HeaderHandle) {
    let _ = state.free_buf(h);
    if let Ok(iface) = state.iface_table.get_mut(if_tx) {
        iface.stats.tx_pkt_dis_ctr.inc();
    }
}

/// Step 3.a: buffer type must be a Tx pool, the innermost protocol tag
/// must be one this path frames, and the matching header index must have
/// been set.
fn validate_tx_pkt(state: &NetState, h: HeaderHandle) -> NetResult<()> {
    let hdr = state.pools.header(h).ok_or(NetError::NullPtr)?;
    if !matches!(hdr.buf_type, BufType::TxLarge | BufType::TxSmall) {
        return Err(NetError::InvalidBufType);
    }
    match hdr.proto_tag {
        ProtoTag::IfEther | ProtoTag::IfFrame | ProtoTag::Arp => {
            if LayerIx::is_none_ix(hdr.ix.link) {
                return Err(NetError::InvalidBufIx);
            }
        }
        ProtoTag::IPv4 | ProtoTag::IPv6 => {
            if LayerIx::is_none_ix(hdr.ix.net) {
                return Err(NetError::InvalidBufIx);
            }
        }
        _ => return Err(NetError::InvalidProtocol),
    }
    Ok(())
}

fn tx_loopback(state: &mut NetState, core: &NetCore, h: HeaderHandle) -> NetResult<()> {
    let result = crate::loopback::tx(&mut state.pools, h);
    let len = state.pools.header(h).map(|hdr| hdr.data_len).unwrap_or(0);
    let _ = state.free_buf(h);

    let new_h = match result {
        Ok(new_h) => new_h,
        Err(e) => {
            if let Ok(iface) = state.iface_table.get_mut(IfNbr::LOOPBACK) {
                iface.stats.tx_pkt_dis_ctr.inc();
            }
            return Err(e);
        }
    };

    state.loopback_rx.add(&mut state.pools, new_h);
    if let Ok(iface) = state.iface_table.get_mut(IfNbr::LOOPBACK) {
        iface.stats.tx_pkt_ctr.inc();
        iface.stats.tx_octet_ctr.add(len);
    }
    let _ = core.rx_ring().rx_task_signal(core, IfNbr::LOOPBACK);
    Ok(())
}

/// Runs the transmit-dealloc worker loop until the ring's sender side is
/// dropped: pops a data-area handle, finds the matching in-flight buffer
/// by identity, removes it, clears `TxLock`, frees header and data area.
pub fn dealloc_worker_loop(core: Arc<NetCore>, ring: TxDeallocRingRx) {
    while let Ok(data) = ring.rx.recv() {
        let mut state = core.lock();
        core.stats().tx_dealloc_signalled.inc();
        match state.inflight.find_by_data(&state.pools, data) {
            Some(h) => {
                let NetState { pools, inflight, .. } = &mut *state;
                inflight.remove(pools, h);
                if let Some(hdr) = pools.header_mut(h) {
                    hdr.flags.remove(BufFlags::TX_LOCK);
                }
                if state.free_buf(h).is_err() {
                    warn!("tx dealloc: free_buf failed for an in-flight buffer");
                }
            }
            None => {
                warn!("tx dealloc: no in-flight buffer matches the completed data area");
            }
        }
    }
}
