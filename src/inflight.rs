//! Transmit In-Flight List (spec.md §4.F): buffers whose data areas are
//! owned by device hardware pending a transmit-completion interrupt.

use crate::buf::header::{BufFlags, BufHeader, DataHandle, HeaderHandle, ListLink};
use crate::buf::list::LinkedHeaderList;
use crate::buf::BufPools;

fn get_link(hdr: &BufHeader) -> ListLink {
    hdr.tx_link
}

fn set_link(hdr: &mut BufHeader, link: ListLink) {
    hdr.tx_link = link;
}

/// O(1) insert at tail, O(1) remove anywhere, O(n) lookup by data-area
/// identity (§4.F rationale: device completion is typically in order and
/// the list is bounded by the configured Tx buffer count, so a hash table
/// would waste memory for no benefit).
#[derive(Default)]
pub struct InFlightList {
    list: LinkedHeaderList,
}

impl InFlightList {
    pub fn new() -> Self {
        InFlightList {
            list: LinkedHeaderList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Inserts `h` at the tail and sets `IN_INFLIGHT` (invariant I2: the
    /// buffer must stay here for as long as `TxLock` is set).
    pub fn push_back(&mut self, pools: &mut BufPools, h: HeaderHandle) {
        self.list.push_back(pools, h, get_link, set_link);
        if let Some(hdr) = pools.header_mut(h) {
            hdr.flags.insert(BufFlags::IN_INFLIGHT);
        }
    }

    /// Removes `h` and clears `IN_INFLIGHT`. No-op if `h` is not a member.
    pub fn remove(&mut self, pools: &mut BufPools, h: HeaderHandle) {
        if let Some(hdr) = pools.header(h) {
            if !hdr.flags.contains(BufFlags::IN_INFLIGHT) {
                return;
            }
        } else {
            return;
        }
        self.list.remove(pools, h, get_link, set_link);
        if let Some(hdr) = pools.header_mut(h) {
            hdr.flags.remove(BufFlags::IN_INFLIGHT);
        }
    }

    /// Linear search by the data area's arena handle, the Rust-shaped
    /// analogue of the original "lookup by data-area pointer identity"
    /// (spec.md §9 Design Notes).
    pub fn find_by_data(&self, pools: &BufPools, data: DataHandle) -> Option<HeaderHandle> {
        self.list.find_by(pools, get_link, |hdr| hdr.data == data)
    }
}
