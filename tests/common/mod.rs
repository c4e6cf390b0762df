//! Shared scaffolding for the scenario/property integration tests. Placed
//! under `tests/common/` rather than `tests/common.rs` so cargo does not
//! treat it as its own test binary, the same layout trick the teacher uses
//! for its own `tests/{arp,ipv4,...}/mod.rs` helper directories.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use netcore::iface::{IfNbr, IfType};
use netcore::testing::{self, MockDevice, RecordedFrame, RecordingIf};
use netcore::{NetConfig, NetCore};

/// Handles back to a registered interface's test doubles, kept alive so the
/// test can drive/inspect them after the interface is handed to the core.
pub struct IfHandles {
    pub if_nbr: IfNbr,
    pub rx_log: Arc<Mutex<Vec<RecordedFrame>>>,
    pub if_tx_log: Arc<Mutex<Vec<RecordedFrame>>>,
    pub link_up: Arc<AtomicBool>,
    pub dev_tx_log: Option<Arc<Mutex<Vec<Vec<u8>>>>>,
    pub dev_fail_tx: Option<Arc<AtomicBool>>,
}

pub fn build_core(config: NetConfig) -> Arc<NetCore> {
    NetCore::new(config).expect("valid config")
}

pub fn add_loopback(core: &Arc<NetCore>, rx_large: (usize, usize), tx_large: (usize, usize)) -> IfHandles {
    let cfg = testing::pool_cfg(Some(rx_large), Some(tx_large), None);
    let if_vtbl = RecordingIf::new(cfg, tx_large.1 as u16);
    let rx_log = if_vtbl.rx_log();
    let if_tx_log = if_vtbl.tx_log();
    let link_up = if_vtbl.link_handle();

    let if_nbr = core
        .add_interface(IfType::Loopback, Box::new(if_vtbl), None)
        .expect("loopback registration");
    core.lock().iface_table.start(if_nbr).expect("loopback start");

    IfHandles {
        if_nbr,
        rx_log,
        if_tx_log,
        link_up,
        dev_tx_log: None,
        dev_fail_tx: None,
    }
}

pub fn add_ethernet(core: &Arc<NetCore>, tx_large: (usize, usize)) -> IfHandles {
    let cfg = testing::pool_cfg(None, Some(tx_large), None);
    let if_vtbl = RecordingIf::new(cfg, tx_large.1 as u16);
    let rx_log = if_vtbl.rx_log();
    let if_tx_log = if_vtbl.tx_log();
    let link_up = if_vtbl.link_handle();

    let device = MockDevice::new();
    let dev_tx_log = device.tx_log();
    let dev_fail_tx = device.fail_tx_handle();

    let if_nbr = core
        .add_interface(IfType::Ethernet, Box::new(if_vtbl), Some(Box::new(device)))
        .expect("ethernet registration");
    core.lock().iface_table.start(if_nbr).expect("ethernet start");

    IfHandles {
        if_nbr,
        rx_log,
        if_tx_log,
        link_up,
        dev_tx_log: Some(dev_tx_log),
        dev_fail_tx: Some(dev_fail_tx),
    }
}

/// Same as [`add_ethernet`] but also wires an rx feed queue, for tests that
/// inject device frames.
pub fn add_ethernet_with_rx(
    core: &Arc<NetCore>,
    tx_large: (usize, usize),
    rx_large: (usize, usize),
) -> (IfHandles, Arc<Mutex<std::collections::VecDeque<Vec<u8>>>>) {
    let cfg = testing::pool_cfg(Some(rx_large), Some(tx_large), None);
    let if_vtbl = RecordingIf::new(cfg, tx_large.1.max(rx_large.1) as u16);
    let rx_log = if_vtbl.rx_log();
    let if_tx_log = if_vtbl.tx_log();
    let link_up = if_vtbl.link_handle();

    let device = MockDevice::new();
    let dev_tx_log = device.tx_log();
    let dev_fail_tx = device.fail_tx_handle();
    let rx_feed = device.rx_feed();

    let if_nbr = core
        .add_interface(IfType::Ethernet, Box::new(if_vtbl), Some(Box::new(device)))
        .expect("ethernet registration");
    core.lock().iface_table.start(if_nbr).expect("ethernet start");

    (
        IfHandles {
            if_nbr,
            rx_log,
            if_tx_log,
            link_up,
            dev_tx_log: Some(dev_tx_log),
            dev_fail_tx: Some(dev_fail_tx),
        },
        rx_feed,
    )
}

/// Allocates a Tx buffer sized to hold `payload`, copies it in, and stamps
/// the header fields needed to pass `validate_tx_pkt`.
pub fn build_tx_buffer(
    core: &Arc<NetCore>,
    if_nbr: IfNbr,
    payload: &[u8],
    proto_tag: netcore::buf::header::ProtoTag,
) -> netcore::buf::header::HeaderHandle {
    use netcore::buf::header::{BufFlags, BufType, LayerIx};

    let mut state = core.lock();
    let (h, ix_offset) = state
        .pools
        .get(if_nbr, BufType::TxLarge, payload.len(), 0, BufFlags::empty())
        .expect("tx buffer allocation");
    let data = state.pools.header(h).unwrap().data;
    state.pools.data_mut(data).unwrap()[ix_offset..ix_offset + payload.len()].copy_from_slice(payload);
    if let Some(hdr) = state.pools.header_mut(h) {
        hdr.tot_len = payload.len() as u32;
        hdr.data_len = payload.len() as u32;
        hdr.proto_tag = proto_tag;
        let mut ix = LayerIx::none();
        match proto_tag {
            netcore::buf::header::ProtoTag::IPv4 | netcore::buf::header::ProtoTag::IPv6 => {
                ix.net = ix_offset as u16;
            }
            _ => {
                ix.link = ix_offset as u16;
            }
        }
        hdr.ix = ix;
    }
    h
}
