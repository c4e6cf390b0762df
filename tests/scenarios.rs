//! The six literal end-to-end scenarios (spec.md §8).

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netcore::buf::header::ProtoTag;
use netcore::error::NetError;
use netcore::iface::LinkState;
use netcore::iface::table::LinkSubscriberFn;
use netcore::NetConfigBuilder;

use common::{add_ethernet, add_ethernet_with_rx, add_loopback, build_core, build_tx_buffer};

/// Scenario 1: loopback configured with 4 RxLarge of 1536 B and 2 TxLarge of
/// 1536 B. Transmit one IPv4 packet, total length 64 B, IP-header index 0.
#[test]
fn loopback_round_trip() {
    let config = NetConfigBuilder::new().max_interfaces(1).build().unwrap();
    let core = build_core(config);
    let lo = add_loopback(&core, (4, 1536), (2, 1536));
    core.start_workers().unwrap();

    let payload: Vec<u8> = (0..64u32).map(|i| i as u8).collect();
    let h = build_tx_buffer(&core, lo.if_nbr, &payload, ProtoTag::IPv4);
    netcore::tx::tx_one(&core, lo.if_nbr, h).expect("loopback tx");

    std::thread::sleep(Duration::from_millis(60));

    let rx_log = lo.rx_log.lock().unwrap();
    assert_eq!(rx_log.len(), 1);
    assert_eq!(rx_log[0].proto_tag, ProtoTag::IPv4);
    assert_eq!(rx_log[0].payload, payload);
    drop(rx_log);

    let state = core.lock();
    let (hdr_free, rx_free, tx_free, _) = state.pools.free_counts(lo.if_nbr).unwrap();
    assert_eq!(hdr_free, 64);
    assert_eq!(rx_free, 4);
    assert_eq!(tx_free, 2);
}

/// Scenario 2: Ethernet interface, started, link forced Down. Transmit any
/// packet.
#[test]
fn tx_under_link_down() {
    let config = NetConfigBuilder::new().max_interfaces(2).build().unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let eth = add_ethernet(&core, (2, 1536));
    core.lock().iface_table.get_mut(eth.if_nbr).unwrap().link = LinkState::Down;

    let payload = vec![0xABu8; 32];
    let h = build_tx_buffer(&core, eth.if_nbr, &payload, ProtoTag::IfFrame);
    let result = netcore::tx::tx_one(&core, eth.if_nbr, h);
    assert_eq!(result, Err(NetError::LinkDown));

    let state = core.lock();
    assert_eq!(state.iface_table.get(eth.if_nbr).unwrap().stats.tx_pkt_dis_ctr.get(), 1);
    let (_, _, tx_free, _) = state.pools.free_counts(eth.if_nbr).unwrap();
    assert_eq!(tx_free, 2);
}

/// Scenario 3: Rx ring capacity 4, 5 `RxTaskSignal`s posted with the worker
/// blocked on the global lock, which the test holds throughout.
#[test]
fn rx_ring_overflow() {
    let config = NetConfigBuilder::new().max_interfaces(2).rx_ring_capacity(4).build().unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let eth = add_ethernet(&core, (1, 128));
    core.start_workers().unwrap();

    let guard = core.lock();
    for _ in 0..4 {
        core.rx_ring().rx_task_signal(&core, eth.if_nbr).expect("ring has room");
    }
    let fifth = core.rx_ring().rx_task_signal(&core, eth.if_nbr);
    assert_eq!(fifth, Err(NetError::RxQFull));
    assert_eq!(core.stats().rx_task_pkt_ctr.get(), 4);
    drop(guard);
}

/// Scenario 4: a mock device whose ready semaphore is never posted.
#[test]
fn device_ready_timeout() {
    let config = NetConfigBuilder::new()
        .max_interfaces(2)
        .dev_tx_rdy_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let eth = add_ethernet(&core, (2, 1536));
    core.lock().iface_table.get_mut(eth.if_nbr).unwrap().link = LinkState::Up;

    let payload = vec![0x11u8; 48];
    let h = build_tx_buffer(&core, eth.if_nbr, &payload, ProtoTag::IfFrame);
    let result = netcore::tx::tx_one(&core, eth.if_nbr, h);
    assert_eq!(result, Err(NetError::TxRdyTimeout));

    let state = core.lock();
    let iface = state.iface_table.get(eth.if_nbr).unwrap();
    assert_eq!(iface.stats.dev_tx_rdy_timeout_ctr.get(), 1);
    assert_eq!(iface.stats.dev_tx_rdy_ctr.get(), 0);
    assert!(state.inflight.is_empty());
    let (_, _, tx_free, _) = state.pools.free_counts(eth.if_nbr).unwrap();
    assert_eq!(tx_free, 2);
}

/// Scenario 5: two subscribers registered on one interface, PHY toggling
/// Down -> Up -> Down. Each subscriber must be called twice, in that order,
/// with the global lock released for the duration of the call (checked by
/// attempting to re-acquire it from inside the callback).
#[test]
fn link_state_subscribe_and_fan_out() {
    let config = NetConfigBuilder::new()
        .max_interfaces(2)
        .link_poll_period(Duration::from_millis(15))
        .build()
        .unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let eth = add_ethernet(&core, (1, 128));
    core.start_workers().unwrap();

    let log_a: Arc<Mutex<Vec<LinkState>>> = Arc::new(Mutex::new(Vec::new()));
    let log_b: Arc<Mutex<Vec<LinkState>>> = Arc::new(Mutex::new(Vec::new()));

    let core_a = Arc::clone(&core);
    let log_a2 = Arc::clone(&log_a);
    let sub_a: LinkSubscriberFn = Arc::new(move |_if, state| {
        // Proves the lock is released before this callback runs: if it
        // weren't, this would deadlock instead of returning immediately.
        let _guard = core_a.lock();
        log_a2.lock().unwrap().push(state);
    });

    let core_b = Arc::clone(&core);
    let log_b2 = Arc::clone(&log_b);
    let sub_b: LinkSubscriberFn = Arc::new(move |_if, state| {
        let _guard = core_b.lock();
        log_b2.lock().unwrap().push(state);
    });

    core.lock().iface_table.link_state_subscribe(eth.if_nbr, Arc::clone(&sub_a)).unwrap();
    core.lock().iface_table.link_state_subscribe(eth.if_nbr, Arc::clone(&sub_b)).unwrap();

    eth.link_up.store(true, Ordering::Relaxed);
    std::thread::sleep(Duration::from_millis(70));
    eth.link_up.store(false, Ordering::Relaxed);
    std::thread::sleep(Duration::from_millis(70));

    assert_eq!(*log_a.lock().unwrap(), vec![LinkState::Up, LinkState::Down]);
    assert_eq!(*log_b.lock().unwrap(), vec![LinkState::Up, LinkState::Down]);
}

/// Scenario 6: three Tx packets A, B, C submitted; device completes them
/// out of order (B, A, C).
#[test]
fn tx_completion_reordering() {
    let config = NetConfigBuilder::new().max_interfaces(2).build().unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let eth = add_ethernet(&core, (3, 256));
    core.start_workers().unwrap();
    core.lock().iface_table.get_mut(eth.if_nbr).unwrap().link = LinkState::Up;

    let mut datas = Vec::new();
    for label in [b'A', b'B', b'C'] {
        let payload = vec![label; 16];
        let h = build_tx_buffer(&core, eth.if_nbr, &payload, ProtoTag::IfFrame);
        let data = core.lock().pools.header(h).unwrap().data;
        core.signals(eth.if_nbr).unwrap().dev_tx_rdy_sem.release();
        netcore::tx::tx_one(&core, eth.if_nbr, h).expect("tx accepted");
        datas.push(data);
    }

    assert_eq!(core.lock().inflight.len(), 3);

    core.tx_dealloc_ring().tx_dealloc_task_post(datas[1]).unwrap();
    core.tx_dealloc_ring().tx_dealloc_task_post(datas[0]).unwrap();
    core.tx_dealloc_ring().tx_dealloc_task_post(datas[2]).unwrap();

    std::thread::sleep(Duration::from_millis(80));

    let state = core.lock();
    assert!(state.inflight.is_empty());
    let (hdr_free, _, tx_free, _) = state.pools.free_counts(eth.if_nbr).unwrap();
    assert_eq!(tx_free, 3);
    assert_eq!(hdr_free, 64);
}

/// Exercises the device-frame Rx path (`add_ethernet_with_rx`) end to end,
/// as a companion to scenario 1's loopback-only round trip.
#[test]
fn ethernet_device_frame_round_trip() {
    let config = NetConfigBuilder::new().max_interfaces(2).build().unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let (eth, rx_feed) = add_ethernet_with_rx(&core, (1, 128), (2, 256));
    core.start_workers().unwrap();

    let frame = vec![0x42u8; 40];
    rx_feed.lock().unwrap().push_back(frame.clone());
    core.rx_ring().rx_task_signal(&core, eth.if_nbr).unwrap();

    std::thread::sleep(Duration::from_millis(60));

    let log = eth.rx_log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].proto_tag, ProtoTag::IfFrame);
    assert_eq!(log[0].payload, frame);
}
