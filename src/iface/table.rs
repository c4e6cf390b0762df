//! The interface registry itself (spec.md §4.C).
//!
//! Note: the rx-packet counter, tx-suspend counter, and the two semaphores
//! named in spec.md §3's Interface data model live on
//! [`crate::core::IsrSignals`] instead of here, in a side table `NetCore`
//! allocates once at construction and never grows — those four fields are
//! the ones spec.md §5 says ISRs touch directly ("RxPktInc / field reads
//! under the critical-section primitive"), so they cannot sit behind the
//! same `Vec` this table itself grows under the main lock. See DESIGN.md.

use std::sync::Arc;

use super::{BufPoolCfg, DevVtbl, HwAddr, IfNbr, IfType, IfVtbl, IoCtrlOpt, IsrType, LinkState};
use crate::buf::BufPools;
use crate::error::{NetError, NetResult};
use crate::stats::IfStats;

/// Callback invoked on a link-state transition, with the global lock
/// released (spec.md §4.H, §6).
pub type LinkSubscriberFn = Arc<dyn Fn(IfNbr, LinkState) + Send + Sync>;

struct Subscriber {
    f: LinkSubscriberFn,
    refcount: u32,
}

/// One registered network interface (spec.md §3 "Interface").
pub struct Interface {
    pub id: IfNbr,
    pub if_type: IfType,
    pub init: bool,
    pub enabled: bool,
    pub link: LinkState,
    pub link_prev: LinkState,
    pub mtu: u16,
    pub if_vtbl: Box<dyn IfVtbl>,
    pub dev_vtbl: Option<Box<dyn DevVtbl>>,
    pub stats: IfStats,
    subscribers: Vec<Subscriber>,
}

/// The interface registry: append-only, dense ids, id 0 always loopback.
pub struct IfTable {
    entries: Vec<Interface>,
}

impl Default for IfTable {
    fn default() -> Self {
        Self::new()
    }
}

impl IfTable {
    pub fn new() -> Self {
        IfTable {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `Add(ifVtbl, devVtbl, ...) -> ifNbr`. Board-support/config blobs from
    /// the original C API collapse into whatever `if_vtbl`/`dev_vtbl`
    /// closed over at construction time — see DESIGN.md.
    pub fn add(
        &mut self,
        if_type: IfType,
        mut if_vtbl: Box<dyn IfVtbl>,
        dev_vtbl: Option<Box<dyn DevVtbl>>,
        max_interfaces: usize,
        pools: &mut BufPools,
    ) -> NetResult<IfNbr> {
        let next_id = self.entries.len();
        if next_id >= max_interfaces.min(u8::MAX as usize + 1) {
            return Err(NetError::InvalidIf);
        }
        let id = IfNbr(next_id as u8);

        if id.is_loopback() != (if_type == IfType::Loopback) {
            return Err(NetError::InvalidCfg);
        }
        if !id.is_loopback() && dev_vtbl.is_none() {
            return Err(NetError::NullFn);
        }

        let cfg = if_vtbl.add()?;
        if_vtbl.buf_pool_cfg_validate(&cfg)?;

        pools.register_interface(id, cfg.rx_large, cfg.tx_large, cfg.tx_small);

        let iface = Interface {
            id,
            if_type,
            init: true,
            enabled: false,
            link: LinkState::Down,
            link_prev: LinkState::Down,
            mtu: if_vtbl.get_pkt_size_max(),
            if_vtbl,
            dev_vtbl,
            stats: IfStats::default(),
            subscribers: Vec::new(),
        };
        self.entries.push(iface);
        Ok(id)
    }

    pub fn start(&mut self, if_nbr: IfNbr) -> NetResult<()> {
        let iface = self.get_mut(if_nbr)?;
        if iface.enabled {
            return Err(NetError::InvalidState);
        }
        iface.if_vtbl.start()?;
        if let Some(dev) = iface.dev_vtbl.as_mut() {
            if let Err(e) = dev.init() {
                let _ = iface.if_vtbl.stop();
                return Err(e);
            }
        }
        iface.enabled = true;
        if iface.if_type == IfType::Loopback {
            iface.link = LinkState::Up;
            iface.link_prev = LinkState::Up;
        }
        Ok(())
    }

    pub fn stop(&mut self, if_nbr: IfNbr) -> NetResult<()> {
        let iface = self.get_mut(if_nbr)?;
        if !iface.enabled {
            return Err(NetError::InvalidState);
        }
        iface.if_vtbl.stop()?;
        if let Some(dev) = iface.dev_vtbl.as_mut() {
            let _ = dev.teardown();
        }
        iface.enabled = false;
        iface.link = LinkState::Down;
        Ok(())
    }

    pub fn get(&self, if_nbr: IfNbr) -> NetResult<&Interface> {
        self.entries.get(if_nbr.0 as usize).ok_or(NetError::InvalidIf)
    }

    pub fn get_mut(&mut self, if_nbr: IfNbr) -> NetResult<&mut Interface> {
        self.entries.get_mut(if_nbr.0 as usize).ok_or(NetError::InvalidIf)
    }

    /// First enabled, initialised, non-loopback interface; loopback as a
    /// fallback.
    pub fn get_default(&self) -> NetResult<IfNbr> {
        for iface in self.entries.iter().skip(1) {
            if iface.init && iface.enabled {
                return Ok(iface.id);
            }
        }
        if !self.entries.is_empty() {
            return Ok(IfNbr::LOOPBACK);
        }
        Err(NetError::InvalidIf)
    }

    pub fn link_state(&self, if_nbr: IfNbr) -> NetResult<LinkState> {
        Ok(self.get(if_nbr)?.link)
    }

    pub fn link_state_subscribe(&mut self, if_nbr: IfNbr, f: LinkSubscriberFn) -> NetResult<()> {
        let iface = self.get_mut(if_nbr)?;
        if let Some(sub) = iface.subscribers.iter_mut().find(|s| Arc::ptr_eq(&s.f, &f)) {
            sub.refcount += 1;
        } else {
            iface.subscribers.push(Subscriber { f, refcount: 1 });
        }
        Ok(())
    }

    pub fn link_state_unsubscribe(&mut self, if_nbr: IfNbr, f: &LinkSubscriberFn) -> NetResult<()> {
        let iface = self.get_mut(if_nbr)?;
        if let Some(pos) = iface.subscribers.iter().position(|s| Arc::ptr_eq(&s.f, f)) {
            iface.subscribers[pos].refcount -= 1;
            if iface.subscribers[pos].refcount == 0 {
                iface.subscribers.remove(pos);
            }
        }
        Ok(())
    }

    /// Snapshot of the current subscriber callbacks, cloned out so the
    /// caller (the link-state monitor) can invoke them without holding the
    /// table borrow — the global lock is released around each call as
    /// spec.md §4.H requires.
    pub fn link_state_subscribers(&self, if_nbr: IfNbr) -> NetResult<Vec<LinkSubscriberFn>> {
        Ok(self.get(if_nbr)?.subscribers.iter().map(|s| s.f.clone()).collect())
    }

    pub fn addr_hw_get(&self, if_nbr: IfNbr) -> NetResult<HwAddr> {
        self.get(if_nbr)?.if_vtbl.addr_hw_get()
    }

    pub fn addr_hw_set(&mut self, if_nbr: IfNbr, addr: HwAddr) -> NetResult<()> {
        let iface = self.get_mut(if_nbr)?;
        if iface.enabled {
            return Err(NetError::InvalidState);
        }
        if !iface.if_vtbl.addr_hw_is_valid(&addr) {
            return Err(NetError::InvalidAddr);
        }
        iface.if_vtbl.addr_hw_set(addr)
    }

    pub fn mtu_get(&self, if_nbr: IfNbr) -> NetResult<u16> {
        Ok(self.get(if_nbr)?.mtu)
    }

    pub fn mtu_set(&mut self, if_nbr: IfNbr, mtu: u16) -> NetResult<()> {
        let iface = self.get_mut(if_nbr)?;
        iface.if_vtbl.mtu_set(mtu)?;
        iface.mtu = mtu;
        Ok(())
    }

    pub fn io_ctrl(&mut self, if_nbr: IfNbr, opt: IoCtrlOpt) -> NetResult<()> {
        self.get_mut(if_nbr)?.if_vtbl.io_ctrl(opt)
    }

    pub fn isr_handler(&mut self, if_nbr: IfNbr, isr_type: IsrType) -> NetResult<()> {
        self.get_mut(if_nbr)?.if_vtbl.isr_handler(isr_type);
        Ok(())
    }

    pub fn payload_rx_max(&self, if_nbr: IfNbr) -> NetResult<u16> {
        let iface = self.get(if_nbr)?;
        Ok(iface.if_vtbl.get_pkt_size_max().saturating_sub(iface.if_vtbl.get_pkt_size_hdr()))
    }

    pub fn payload_tx_max(&self, if_nbr: IfNbr) -> NetResult<u16> {
        self.payload_rx_max(if_nbr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Interface> {
        self.entries.iter_mut()
    }
}
