//! In-process test doubles for [`IfVtbl`]/[`DevVtbl`] (SPEC_FULL.md's
//! module-mapping table: "ambient: test doubles... cfg-gated, mirrors
//! teacher's testing/ module"). Gated behind the `testing` feature the same
//! way the teacher gates its mock `EthernetTx`/`MockIpv4Tx`: plain structs
//! backed by channels/logs a test can inspect, no real I/O.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::buf::header::{HeaderHandle, LayerIx, ProtoTag};
use crate::buf::pool::DataPoolConfig;
use crate::buf::header::BufType;
use crate::buf::BufPools;
use crate::error::{NetError, NetResult};
use crate::iface::{BufPoolCfg, DevVtbl, HwAddr, IfVtbl, IoCtrlOpt, IsrType};

/// One frame captured by [`RecordingIf::rx`] or [`RecordingIf::tx`].
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    pub proto_tag: ProtoTag,
    pub payload: Vec<u8>,
}

/// Builds a [`BufPoolCfg`] from plain capacity/stride pairs, `None` for any
/// pool an interface doesn't need. Alignment and head padding are left at
/// the defaults; tests that care about alignment build a [`DataPoolConfig`]
/// directly instead.
pub fn pool_cfg(
    rx_large: Option<(usize, usize)>,
    tx_large: Option<(usize, usize)>,
    tx_small: Option<(usize, usize)>,
) -> BufPoolCfg {
    let mk = |kind: BufType, dims: Option<(usize, usize)>| {
        dims.map(|(capacity, stride)| DataPoolConfig {
            kind,
            capacity,
            stride,
            align: 1,
            ix_offset_cfg: 0,
        })
    };
    BufPoolCfg {
        rx_large: mk(BufType::RxLarge, rx_large),
        tx_large: mk(BufType::TxLarge, tx_large),
        tx_small: mk(BufType::TxSmall, tx_small),
    }
}

/// `IfVtbl` double: records every frame handed up by `rx` and every frame
/// handed down by `tx`, without doing any real link-layer framing. Link
/// state is driven externally through the `Arc<AtomicBool>` handed back by
/// [`RecordingIf::link_handle`], read back through `io_ctrl(LinkStateGet)`
/// the same way a real driver's `IoCtrl` would report it.
pub struct RecordingIf {
    cfg: BufPoolCfg,
    hw_addr: HwAddr,
    pkt_size_hdr: u16,
    pkt_size_min: u16,
    pkt_size_max: u16,
    link_up: Arc<AtomicBool>,
    rx_log: Arc<Mutex<Vec<RecordedFrame>>>,
    tx_log: Arc<Mutex<Vec<RecordedFrame>>>,
}

impl RecordingIf {
    pub fn new(cfg: BufPoolCfg, pkt_size_max: u16) -> Self {
        RecordingIf {
            cfg,
            hw_addr: HwAddr::empty(),
            pkt_size_hdr: 14,
            pkt_size_min: 60,
            pkt_size_max,
            link_up: Arc::new(AtomicBool::new(false)),
            rx_log: Arc::new(Mutex::new(Vec::new())),
            tx_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle the test can flip to drive a link-state transition the
    /// next time the link monitor polls this interface.
    pub fn link_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.link_up)
    }

    pub fn rx_log(&self) -> Arc<Mutex<Vec<RecordedFrame>>> {
        Arc::clone(&self.rx_log)
    }

    pub fn tx_log(&self) -> Arc<Mutex<Vec<RecordedFrame>>> {
        Arc::clone(&self.tx_log)
    }
}

impl IfVtbl for RecordingIf {
    fn add(&mut self) -> NetResult<BufPoolCfg> {
        Ok(self.cfg)
    }

    fn start(&mut self) -> NetResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> NetResult<()> {
        Ok(())
    }

    /// Stands in for the out-of-scope upper-layer consumer: records the
    /// frame, then releases the buffer immediately, since nothing else in
    /// this crate will.
    fn rx(&mut self, pools: &mut BufPools, buf: HeaderHandle) -> NetResult<()> {
        let hdr = pools.header(buf).ok_or(NetError::NullPtr)?;
        let data = hdr.data;
        let len = hdr.data_len as usize;
        let proto_tag = hdr.proto_tag;
        let payload = pools.data(data)?.get(..len).ok_or(NetError::InvalidBufLen)?.to_vec();
        self.rx_log.lock().expect("rx log mutex poisoned").push(RecordedFrame { proto_tag, payload });
        pools.release(buf)?;
        Ok(())
    }

    fn tx(&mut self, pools: &mut BufPools, buf: HeaderHandle) -> NetResult<()> {
        let hdr = pools.header(buf).ok_or(NetError::NullPtr)?;
        let data = hdr.data;
        let end = hdr.tot_len as usize;
        let start = if LayerIx::is_none_ix(hdr.ix.link) { 0 } else { hdr.ix.link as usize };
        let proto_tag = hdr.proto_tag;
        let payload = pools.data(data)?.get(start..end).ok_or(NetError::InvalidBufLen)?.to_vec();
        self.tx_log.lock().expect("tx log mutex poisoned").push(RecordedFrame { proto_tag, payload });
        Ok(())
    }

    fn addr_hw_get(&self) -> NetResult<HwAddr> {
        Ok(self.hw_addr)
    }

    fn addr_hw_set(&mut self, addr: HwAddr) -> NetResult<()> {
        self.hw_addr = addr;
        Ok(())
    }

    fn addr_hw_is_valid(&self, _addr: &HwAddr) -> bool {
        true
    }

    fn mtu_set(&mut self, _mtu: u16) -> NetResult<()> {
        Ok(())
    }

    fn get_pkt_size_hdr(&self) -> u16 {
        self.pkt_size_hdr
    }

    fn get_pkt_size_min(&self) -> u16 {
        self.pkt_size_min
    }

    fn get_pkt_size_max(&self) -> u16 {
        self.pkt_size_max
    }

    fn isr_handler(&mut self, _isr_type: IsrType) {}

    fn io_ctrl(&mut self, opt: IoCtrlOpt) -> NetResult<()> {
        match opt {
            IoCtrlOpt::LinkStateGet(up) => {
                *up = self.link_up.load(Ordering::Relaxed);
                Ok(())
            }
            IoCtrlOpt::LinkStateGetInfo(_) => Ok(()),
            IoCtrlOpt::LinkStateUpdate => Ok(()),
        }
    }
}

/// `DevVtbl` double: `rx()` pops a pre-seeded frame queue fed through
/// [`MockDevice::push_rx`], `tx()` records every frame handed to it (or
/// fails it, if [`MockDevice::fail_tx_handle`] has been set) instead of
/// touching real hardware.
pub struct MockDevice {
    rx_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    tx_log: Arc<Mutex<Vec<Vec<u8>>>>,
    initialised: Arc<AtomicBool>,
    fail_tx: Arc<AtomicBool>,
}

impl MockDevice {
    pub fn new() -> Self {
        MockDevice {
            rx_queue: Arc::new(Mutex::new(VecDeque::new())),
            tx_log: Arc::new(Mutex::new(Vec::new())),
            initialised: Arc::new(AtomicBool::new(false)),
            fail_tx: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn push_rx(&self, frame: Vec<u8>) {
        self.rx_queue.lock().expect("rx queue mutex poisoned").push_back(frame);
    }

    /// Shared handle to the rx feed queue, for tests that want to push
    /// frames after the device has already been handed to the core.
    pub fn rx_feed(&self) -> Arc<Mutex<VecDeque<Vec<u8>>>> {
        Arc::clone(&self.rx_queue)
    }

    pub fn tx_log(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.tx_log)
    }

    pub fn fail_tx_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_tx)
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::Relaxed)
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DevVtbl for MockDevice {
    fn init(&mut self) -> NetResult<()> {
        self.initialised.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn teardown(&mut self) -> NetResult<()> {
        self.initialised.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn rx(&mut self) -> NetResult<Option<Vec<u8>>> {
        Ok(self.rx_queue.lock().expect("rx queue mutex poisoned").pop_front())
    }

    fn tx(&mut self, data: &[u8]) -> NetResult<()> {
        if self.fail_tx.load(Ordering::Relaxed) {
            return Err(NetError::Tx);
        }
        self.tx_log.lock().expect("tx log mutex poisoned").push(data.to_vec());
        Ok(())
    }
}
