//! Integration tests for the testable properties P1-P8.
//!
//! Six of the eight (P1, P3, P4, P5, P6, P8-adjacent pipeline behavior) are
//! exercised more fully by the literal end-to-end scenarios in
//! `scenarios.rs`; this file targets the properties that scenario text
//! doesn't pin down on its own, plus the lock-discipline and bounded
//! allocation properties that are cheapest to check in isolation.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use netcore::buf::header::{BufFlags, BufType, ProtoTag};
use netcore::core::NetState;
use netcore::error::NetError;
use netcore::iface::LinkState;
use netcore::{balance, NetConfigBuilder};

use common::{add_ethernet, add_ethernet_with_rx, add_loopback, build_core, build_tx_buffer};

/// P1: every successful `Get` is matched by exactly one `FreeBuf`; after an
/// idle period the pools' free counts equal their configured capacities.
/// Runs the loopback round trip three times in a row to rule out a leak
/// that only shows up after repeated use.
#[test]
fn p1_no_leak_across_repeated_round_trips() {
    let config = NetConfigBuilder::new().max_interfaces(1).build().unwrap();
    let core = build_core(config);
    let lo = add_loopback(&core, (4, 1536), (2, 1536));
    core.start_workers().unwrap();

    for i in 0..3u8 {
        let payload = vec![i; 64];
        let h = build_tx_buffer(&core, lo.if_nbr, &payload, ProtoTag::IPv4);
        netcore::tx::tx_one(&core, lo.if_nbr, h).expect("loopback tx");
        std::thread::sleep(Duration::from_millis(30));
    }

    let state = core.lock();
    let (hdr_free, rx_free, tx_free, _) = state.pools.free_counts(lo.if_nbr).unwrap();
    assert_eq!(hdr_free, 64, "header pool must return to full capacity");
    assert_eq!(rx_free, 4);
    assert_eq!(tx_free, 2);
    assert_eq!(lo.rx_log.lock().unwrap().len(), 3);
}

/// P2: a buffer that travels the transmit in-flight path never also carries
/// loopback-queue membership, and vice versa.
#[test]
fn p2_no_cross_list_membership() {
    let config = NetConfigBuilder::new().max_interfaces(2).build().unwrap();
    let core = build_core(config);
    let lo = add_loopback(&core, (2, 128), (1, 128));
    let eth = add_ethernet(&core, (2, 256));
    core.lock().iface_table.get_mut(eth.if_nbr).unwrap().link = LinkState::Up;

    let tx_payload = vec![0x7u8; 20];
    let tx_h = build_tx_buffer(&core, eth.if_nbr, &tx_payload, ProtoTag::IfFrame);
    core.signals(eth.if_nbr).unwrap().dev_tx_rdy_sem.release();
    netcore::tx::tx_one(&core, eth.if_nbr, tx_h).expect("tx accepted");
    {
        let state = core.lock();
        let flags = state.pools.header(tx_h).unwrap().flags;
        assert!(flags.contains(BufFlags::IN_INFLIGHT));
        assert!(!flags.contains(BufFlags::IN_LOOPBACK_Q));
    }

    let lo_payload = vec![0x9u8; 16];
    let lo_h = build_tx_buffer(&core, lo.if_nbr, &lo_payload, ProtoTag::IPv4);
    netcore::tx::tx_one(&core, lo.if_nbr, lo_h).expect("loopback tx accepted");
    {
        let mut state = core.lock();
        assert_eq!(state.loopback_rx.len(), 1);
        let NetState { loopback_rx, pools, .. } = &mut *state;
        let queued = loopback_rx.get(pools).expect("a fresh buffer should be queued");
        let flags = pools.header(queued).unwrap().flags;
        assert!(!flags.contains(BufFlags::IN_INFLIGHT));
    }
}

/// P3: packets injected through a single interface's Rx ring are observed
/// by the demux layer in the order they were injected.
#[test]
fn p3_rx_ordering_preserved() {
    let config = NetConfigBuilder::new().max_interfaces(2).build().unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let (eth, rx_feed) = add_ethernet_with_rx(&core, (1, 128), (4, 256));

    {
        let mut feed = rx_feed.lock().unwrap();
        feed.push_back(vec![1u8; 8]);
        feed.push_back(vec![2u8; 8]);
        feed.push_back(vec![3u8; 8]);
    }
    core.start_workers().unwrap();
    for _ in 0..3 {
        core.rx_ring().rx_task_signal(&core, eth.if_nbr).unwrap();
    }

    std::thread::sleep(Duration::from_millis(80));

    let log = eth.rx_log.lock().unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].payload, vec![1u8; 8]);
    assert_eq!(log[1].payload, vec![2u8; 8]);
    assert_eq!(log[2].payload, vec![3u8; 8]);
}

/// P6: a transmitter cooperatively suspended via `TxSuspend` wakes up
/// promptly once the Rx worker calls `WakeSuspendedTransmitters`, well
/// inside its configured timeout.
#[test]
fn p6_load_balance_wakes_suspended_transmitter() {
    let config = NetConfigBuilder::new()
        .max_interfaces(2)
        .tx_suspend_timeout(Duration::from_millis(90))
        .build()
        .unwrap();
    let core = build_core(config);
    let _lo = add_loopback(&core, (1, 128), (1, 128));
    let eth = add_ethernet(&core, (1, 128));

    let core2 = Arc::clone(&core);
    let if_nbr = eth.if_nbr;
    let handle = std::thread::spawn(move || {
        let signals = core2.signals(if_nbr).unwrap();
        let start = Instant::now();
        balance::tx_suspend(signals);
        start.elapsed()
    });

    std::thread::sleep(Duration::from_millis(20));
    let signals = core.signals(eth.if_nbr).unwrap();
    assert_eq!(signals.tx_suspend_ctr.get(), 1);
    balance::wake_suspended_transmitters(signals);

    let elapsed = handle.join().unwrap();
    assert!(
        elapsed < Duration::from_millis(90),
        "transmitter should wake before its suspend timeout, took {:?}",
        elapsed
    );
    assert_eq!(signals.tx_suspend_ctr.get(), 0);
}

/// P7: no public API returns `NoBufAvail` before pool usage has reached its
/// configured capacity, and `NoBufAvail` is always returned once it has.
#[test]
fn p7_bounded_allocation() {
    use netcore::buf::pool::DataPoolConfig;
    use netcore::buf::BufPools;
    use netcore::iface::IfNbr;

    let mut pools = BufPools::new(8);
    pools.register_interface(
        IfNbr(0),
        Some(DataPoolConfig {
            kind: BufType::RxLarge,
            capacity: 2,
            stride: 64,
            align: 1,
            ix_offset_cfg: 0,
        }),
        None,
        None,
    );

    let first = pools.get(IfNbr(0), BufType::RxLarge, 32, 0, BufFlags::empty());
    assert!(first.is_ok());
    let second = pools.get(IfNbr(0), BufType::RxLarge, 32, 0, BufFlags::empty());
    assert!(second.is_ok());
    let third = pools.get(IfNbr(0), BufType::RxLarge, 32, 0, BufFlags::empty());
    assert_eq!(third, Err(NetError::NoBufAvail));

    pools.release(first.unwrap().0).unwrap();
    assert!(pools.get(IfNbr(0), BufType::RxLarge, 32, 0, BufFlags::empty()).is_ok());
}

/// P8: no ISR-callable entry point ever pends on the global lock. Verified
/// here by running an acquisition attempt while an [`netcore::lock::IsrGuard`]
/// is live, which the lock is built to catch immediately in debug builds
/// rather than risk deadlocking a real system.
#[test]
#[should_panic(expected = "ISR context")]
fn p8_lock_rejects_acquisition_from_isr_context() {
    use netcore::lock::{IsrGuard, NetLock};

    let lock = NetLock::new(0u32);
    let _isr = IsrGuard::enter();
    let _guard = lock.lock();
}
