//! Loopback Interface (spec.md §4.G), grounded on `net_if_loopback.c`'s
//! `NetIF_Loopback_RxQ_*`/`NetIF_Loopback_Tx`/`_Rx` pair: a FIFO receive
//! queue private to interface 0, fed synchronously by `tx` on the same
//! interface rather than by a device ISR.

use crate::buf::header::{BufFlags, BufHeader, BufType, HeaderHandle, ListLink, ProtoTag};
use crate::buf::list::LinkedHeaderList;
use crate::buf::BufPools;
use crate::error::{NetError, NetResult};
use crate::iface::IfNbr;

fn get_link(hdr: &BufHeader) -> ListLink {
    hdr.secondary
}

fn set_link(hdr: &mut BufHeader, link: ListLink) {
    hdr.secondary = link;
}

/// The loopback interface's private receive FIFO (`NetIF_Loopback_RxQ_*`).
#[derive(Default)]
pub struct LoopbackRxQ {
    list: LinkedHeaderList,
}

impl LoopbackRxQ {
    pub fn new() -> Self {
        LoopbackRxQ {
            list: LinkedHeaderList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn add(&mut self, pools: &mut BufPools, h: HeaderHandle) {
        self.list.push_back(pools, h, get_link, set_link);
        if let Some(hdr) = pools.header_mut(h) {
            hdr.flags.insert(BufFlags::IN_LOOPBACK_Q);
        }
    }

    /// `NetIF_Loopback_RxQ_Get`: pops the head, the only removal path the
    /// Rx worker uses in the steady state.
    pub fn get(&mut self, pools: &mut BufPools) -> Option<HeaderHandle> {
        let h = self.list.pop_front(pools, get_link, set_link)?;
        if let Some(hdr) = pools.header_mut(h) {
            hdr.flags.remove(BufFlags::IN_LOOPBACK_Q);
        }
        Some(h)
    }

    /// `NetIF_Loopback_RxQ_Unlink`: removes `h` wherever it sits in the
    /// FIFO, used when a buffer still queued here is force-freed.
    pub fn unlink(&mut self, pools: &mut BufPools, h: HeaderHandle) {
        if let Some(hdr) = pools.header(h) {
            if !hdr.flags.contains(BufFlags::IN_LOOPBACK_Q) {
                return;
            }
        } else {
            return;
        }
        self.list.remove(pools, h, get_link, set_link);
        if let Some(hdr) = pools.header_mut(h) {
            hdr.flags.remove(BufFlags::IN_LOOPBACK_Q);
        }
    }
}

/// `NetIF_Loopback_Tx`: copies `tx_buf`'s payload into a fresh Rx buffer,
/// enqueues it on the loopback FIFO, frees the original buffer inline (no
/// dealloc worker involved — loopback never sets `TxLock`), and returns the
/// handle that `RxTaskSignal(Loopback)` should be posted for.
///
/// Only `IPv4`/`IPv6` are accepted as the tag to carry over; anything else
/// is `InvalidProtocol` and the source buffer is freed by the caller.
pub fn tx(pools: &mut BufPools, tx_buf: HeaderHandle) -> NetResult<HeaderHandle> {
    let (src_tag, src_data, src_ix, payload_len) = {
        let hdr = pools.header(tx_buf).ok_or(NetError::NullPtr)?;
        if !matches!(hdr.proto_tag, ProtoTag::IPv4 | ProtoTag::IPv6) {
            return Err(NetError::InvalidProtocol);
        }
        let ix_net = hdr.ix.net;
        if crate::buf::header::LayerIx::is_none_ix(ix_net) {
            return Err(NetError::InvalidBufIx);
        }
        let len = hdr.data_len.saturating_sub(u32::from(ix_net)) as usize;
        (hdr.proto_tag, hdr.data, ix_net, len)
    };

    let (new_h, ix_offset) = pools.get(
        IfNbr::LOOPBACK,
        BufType::RxLarge,
        payload_len,
        0,
        BufFlags::empty(),
    )?;
    let dst_data = pools.header(new_h).ok_or(NetError::NullPtr)?.data;

    if let Err(e) = pools.data_copy(dst_data, ix_offset, src_data, src_ix as usize, payload_len) {
        let _ = pools.release(new_h);
        return Err(e);
    }

    if let Some(hdr) = pools.header_mut(new_h) {
        hdr.tot_len = payload_len as u32;
        hdr.data_len = payload_len as u32;
        hdr.ix = crate::buf::header::LayerIx {
            link: crate::buf::header::NONE_IX,
            net: ix_offset as u16,
            transport: crate::buf::header::NONE_IX,
            app: crate::buf::header::NONE_IX,
        };
        hdr.proto_tag = src_tag;
    }

    Ok(new_h)
}
