//! Interface Table (spec.md §4.C) and the external vtable surface (§6) that
//! every interface and device driver implements.

pub mod table;

pub use table::{IfTable, Interface};

use crate::buf::pool::DataPoolConfig;
use crate::buf::header::HeaderHandle;
use crate::buf::BufPools;
use crate::error::NetResult;

/// Dense interface number. Id 0 is always loopback (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IfNbr(pub u8);

impl IfNbr {
    pub const LOOPBACK: IfNbr = IfNbr(0);

    pub fn is_loopback(self) -> bool {
        self == IfNbr::LOOPBACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfType {
    None,
    Loopback,
    Ethernet,
    WiFi,
    Ppp,
    Serial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

/// A hardware address of up to 6 octets (Ethernet-sized; shorter addresses
/// such as loopback's empty address just use fewer of them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HwAddr {
    pub len: u8,
    pub octets: [u8; 6],
}

impl HwAddr {
    pub fn empty() -> Self {
        HwAddr::default()
    }

    pub fn new(octets: &[u8]) -> Self {
        let mut buf = [0u8; 6];
        let len = octets.len().min(6);
        buf[..len].copy_from_slice(&octets[..len]);
        HwAddr {
            len: len as u8,
            octets: buf,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.octets[..self.len as usize]
    }
}

/// Which hardware ISR fired; interpreted by the owning driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsrType {
    Rx,
    Tx,
    Other(u8),
}

/// I/O control options, opaque to the core (spec.md §6).
pub enum IoCtrlOpt<'a> {
    LinkStateGet(&'a mut bool),
    LinkStateGetInfo(&'a mut dyn std::any::Any),
    LinkStateUpdate,
}

/// What data-area pools an interface wants, reported from `IfVtbl::add`.
#[derive(Debug, Clone, Copy)]
pub struct BufPoolCfg {
    pub rx_large: Option<DataPoolConfig>,
    pub tx_large: Option<DataPoolConfig>,
    pub tx_small: Option<DataPoolConfig>,
}

/// Per-interface capability vtable (spec.md §6 "Interface vtable").
///
/// `rx`/`tx` are the link-layer demux/framing steps: `rx` hands a freshly
/// populated buffer to whatever consumes it above the interface layer (an
/// out-of-scope external collaborator in production; the `testing` module's
/// `RecordingIf` just records the buffer for assertions), and `tx` writes
/// link-layer framing before the transmit pipeline hands the buffer to the
/// device.
pub trait IfVtbl: Send {
    fn add(&mut self) -> NetResult<BufPoolCfg>;
    fn start(&mut self) -> NetResult<()>;
    fn stop(&mut self) -> NetResult<()>;
    fn rx(&mut self, pools: &mut BufPools, buf: HeaderHandle) -> NetResult<()>;
    fn tx(&mut self, pools: &mut BufPools, buf: HeaderHandle) -> NetResult<()>;

    fn addr_hw_get(&self) -> NetResult<HwAddr>;
    fn addr_hw_set(&mut self, addr: HwAddr) -> NetResult<()>;
    fn addr_hw_is_valid(&self, addr: &HwAddr) -> bool;

    fn addr_multicast_add(&mut self, _addr: HwAddr) -> NetResult<()> {
        Err(crate::error::NetError::InvalidCfg)
    }
    fn addr_multicast_remove(&mut self, _addr: HwAddr) -> NetResult<()> {
        Err(crate::error::NetError::InvalidCfg)
    }
    fn addr_multicast_protocol_to_hw(&self, _proto_addr: &[u8]) -> NetResult<HwAddr> {
        Err(crate::error::NetError::InvalidCfg)
    }
    fn supports_multicast(&self) -> bool {
        false
    }

    fn buf_pool_cfg_validate(&self, cfg: &BufPoolCfg) -> NetResult<()> {
        let _ = cfg;
        Ok(())
    }
    fn mtu_set(&mut self, mtu: u16) -> NetResult<()>;
    fn get_pkt_size_hdr(&self) -> u16;
    fn get_pkt_size_min(&self) -> u16;
    fn get_pkt_size_max(&self) -> u16;

    fn isr_handler(&mut self, isr_type: IsrType);
    fn io_ctrl(&mut self, opt: IoCtrlOpt) -> NetResult<()>;
}

/// Device-driver vtable (spec.md §6 "Device vtable").
pub trait DevVtbl: Send {
    fn init(&mut self) -> NetResult<()>;
    fn teardown(&mut self) -> NetResult<()>;
    /// Returns the next fully received frame, if any is ready.
    fn rx(&mut self) -> NetResult<Option<Vec<u8>>>;
    fn tx(&mut self, data: &[u8]) -> NetResult<()>;
}
