//! The buffer header: bookkeeping for one packet (spec.md §3 "Buffer").

use crate::iface::IfNbr;

/// Sentinel value for a protocol-layer index that has not been set.
pub const NONE_IX: u16 = u16::MAX;

/// Tag identifying which pool a buffer's data area was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufType {
    None,
    Buf,
    RxLarge,
    TxLarge,
    TxSmall,
}

/// Tag identifying the innermost populated protocol header in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtoTag {
    None,
    Link,
    IfFrame,
    IfEther,
    Arp,
    IPv4,
    ICMPv4,
    Igmp,
    UDPv4,
    TCPv4,
    IPv6,
    ICMPv6,
    UDPv6,
    TCPv6,
    App,
    Sock,
}

bitflags::bitflags! {
    /// Per-buffer flag bits. `IN_LOOPBACK_Q`/`IN_INFLIGHT` are membership
    /// bits set by whichever list currently owns the buffer; the rest are
    /// the flags named directly in spec.md §3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufFlags: u16 {
        /// Buffer was received on a remote (non-loopback) interface.
        const RX_REMOTE     = 1 << 0;
        /// Buffer's data area is owned by device hardware pending a
        /// transmit-completion interrupt. See invariant I2.
        const TX_LOCK       = 1 << 1;
        /// Buffer is linked into the loopback receive FIFO (`secondary`).
        const IN_LOOPBACK_Q = 1 << 2;
        /// Buffer is linked into the global transmit in-flight list
        /// (`tx_link`).
        const IN_INFLIGHT   = 1 << 3;
    }
}

/// The four protocol-layer start offsets a buffer tracks as it ascends the
/// stack. A value of [`NONE_IX`] means that layer has not been parsed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerIx {
    pub link: u16,
    pub net: u16,
    pub transport: u16,
    pub app: u16,
}

impl LayerIx {
    pub fn none() -> Self {
        LayerIx {
            link: NONE_IX,
            net: NONE_IX,
            transport: NONE_IX,
            app: NONE_IX,
        }
    }

    pub fn is_none_ix(ix: u16) -> bool {
        ix == NONE_IX
    }
}

/// One doubly-linked list slot: the previous/next header in whichever list
/// currently uses this field. Three independent pairs exist on every header
/// (`primary`, `secondary`, `tx_link`) because spec.md §3 allows a buffer to
/// sit on a protocol queue, an interface queue, and the transmit in-flight
/// list all at the same time (invariant I5 bounds each to at most one).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListLink {
    pub prev: Option<HeaderHandle>,
    pub next: Option<HeaderHandle>,
}

/// Arena index into the header pool. Cheap to copy, never dereferenced
/// directly — always resolved through [`crate::buf::pool::BufPools`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderHandle(pub u32);

/// Arena index into one of the typed data-area pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataHandle {
    pub if_nbr: IfNbr,
    pub kind: BufType,
    pub index: u32,
}

/// One packet: a header plus the handle of its backing data area.
///
/// Mutated only by the task currently holding it (spec.md §5); this crate
/// enforces that socially (one owner at a time via the pool APIs), not with
/// a runtime lock per buffer — the global network lock already serializes
/// every path that can reach a header.
#[derive(Debug, Clone)]
pub struct BufHeader {
    pub if_nbr: IfNbr,
    pub buf_type: BufType,
    pub tot_len: u32,
    pub data_len: u32,
    pub ix: LayerIx,
    pub proto_tag: ProtoTag,
    pub flags: BufFlags,
    pub primary: ListLink,
    pub secondary: ListLink,
    pub tx_link: ListLink,
    pub data: DataHandle,
}

impl BufHeader {
    pub(crate) fn new(if_nbr: IfNbr, buf_type: BufType, data: DataHandle, flags: BufFlags) -> Self {
        BufHeader {
            if_nbr,
            buf_type,
            tot_len: 0,
            data_len: 0,
            ix: LayerIx::none(),
            proto_tag: ProtoTag::None,
            flags,
            primary: ListLink::default(),
            secondary: ListLink::default(),
            tx_link: ListLink::default(),
            data,
        }
    }

    /// Invariant I4: `tot_len >= data_len`, and each non-sentinel layer
    /// index is ordered and within `data_len`.
    pub fn check_len_invariant(&self) -> bool {
        if self.tot_len < self.data_len {
            return false;
        }
        let idxs = [self.ix.link, self.ix.net, self.ix.transport, self.ix.app];
        let mut last = 0u16;
        for &ix in &idxs {
            if ix == NONE_IX {
                continue;
            }
            if ix < last || u32::from(ix) >= self.data_len {
                return false;
            }
            last = ix;
        }
        true
    }
}
