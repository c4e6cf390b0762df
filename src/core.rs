//! The top-level handle tying every module together (SPEC_FULL.md's
//! module-mapping table, "ambient: top-level handle wiring everything
//! together"). One explicit process-wide value passed to every entry
//! point, per spec.md §9 Design Notes ("avoid hidden singletons").

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::buf::header::{BufFlags, HeaderHandle};
use crate::buf::BufPools;
use crate::config::NetConfig;
use crate::error::{NetError, NetResult};
use crate::iface::{DevVtbl, IfNbr, IfTable, IfType, IfVtbl};
use crate::inflight::InFlightList;
use crate::linkmon::LinkMonitor;
use crate::lock::NetLock;
use crate::loopback::LoopbackRxQ;
use crate::rx::{self, RxRingRx, RxRingTx};
use crate::stats::{Counter, GlobalStats};
use crate::sync::Semaphore;
use crate::tx::{self, TxDeallocRingRx, TxDeallocRingTx};

/// The fields spec.md §5 says ISR context touches directly: `RxPktCtr`,
/// `TxSuspendCtr`, and the two semaphores. Allocated once, one slot per
/// configured interface slot, and never resized afterward — so reading or
/// incrementing an existing slot never contends with the main lock.
pub struct IsrSignals {
    pub rx_pkt_ctr: Counter,
    pub tx_suspend_ctr: Counter,
    pub dev_tx_rdy_sem: Semaphore,
    pub tx_suspend_sem: Semaphore,
    pub tx_suspend_timeout: Duration,
}

impl IsrSignals {
    fn new(tx_suspend_timeout: Duration) -> Self {
        IsrSignals {
            rx_pkt_ctr: Counter::new(),
            tx_suspend_ctr: Counter::new(),
            dev_tx_rdy_sem: Semaphore::new(0),
            tx_suspend_sem: Semaphore::new(0),
            tx_suspend_timeout,
        }
    }
}

/// Everything the global lock protects.
pub struct NetState {
    pub iface_table: IfTable,
    pub pools: BufPools,
    pub inflight: InFlightList,
    pub loopback_rx: LoopbackRxQ,
    pub config: NetConfig,
}

impl NetState {
    /// `FreeBuf`: fires the unlink dispatch implied by whichever list
    /// membership flags are set (spec.md §3 invariant I3 — the sum-type
    /// dispatch spec.md §9 Design Notes asks for, in place of a stored
    /// function pointer), clears `TxLock`, and returns header and data
    /// area to their pools.
    ///
    /// Panics on an I2 violation (`TxLock` set without in-flight
    /// membership) — an internal invariant failure, not a caller error
    /// (spec.md §7: "internal invariant violations panic the process").
    pub fn free_buf(&mut self, h: HeaderHandle) -> NetResult<()> {
        let flags = self.pools.header(h).ok_or(NetError::NullPtr)?.flags;

        if flags.contains(BufFlags::TX_LOCK) && !flags.contains(BufFlags::IN_INFLIGHT) {
            panic!("invariant I2 violated: TxLock set without in-flight list membership");
        }
        if flags.contains(BufFlags::IN_INFLIGHT) {
            self.inflight.remove(&mut self.pools, h);
        }
        if flags.contains(BufFlags::IN_LOOPBACK_Q) {
            self.loopback_rx.unlink(&mut self.pools, h);
        }
        if let Some(hdr) = self.pools.header_mut(h) {
            hdr.flags.remove(BufFlags::TX_LOCK);
        }
        self.pools.release(h)
    }

    /// `FreeBufList`: follows the `secondary` chain from `head`, freeing
    /// every buffer reachable from it, and returns the count released.
    pub fn free_buf_list(&mut self, head: HeaderHandle) -> usize {
        let mut count = 0;
        let mut cur = Some(head);
        while let Some(h) = cur {
            let next = self.pools.header(h).map(|hdr| hdr.secondary.next);
            if self.free_buf(h).is_ok() {
                count += 1;
            }
            cur = next.flatten();
        }
        count
    }
}

/// Worker-side ring halves, handed to `start_workers` exactly once.
struct PendingRings {
    rx_ring_rx: Option<RxRingRx>,
    tx_dealloc_ring_rx: Option<TxDeallocRingRx>,
}

pub struct NetCore {
    state: NetLock<NetState>,
    stats: GlobalStats,
    signals: Box<[IsrSignals]>,
    rx_ring_tx: RxRingTx,
    tx_dealloc_ring_tx: TxDeallocRingTx,
    pending_rings: Mutex<Option<PendingRings>>,
}

impl NetCore {
    pub fn new(config: NetConfig) -> NetResult<Arc<Self>> {
        let (rx_ring_tx, rx_ring_rx) = rx::ring(config.rx_ring_capacity);
        let (tx_dealloc_ring_tx, tx_dealloc_ring_rx) = tx::dealloc_ring(config.tx_dealloc_ring_capacity);

        let signals = (0..config.max_interfaces)
            .map(|_| IsrSignals::new(config.tx_suspend_timeout))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let state = NetState {
            iface_table: IfTable::new(),
            pools: BufPools::new(config.header_pool_capacity),
            inflight: InFlightList::new(),
            loopback_rx: LoopbackRxQ::new(),
            config,
        };

        Ok(Arc::new(NetCore {
            state: NetLock::new(state),
            stats: GlobalStats::default(),
            signals,
            rx_ring_tx,
            tx_dealloc_ring_tx,
            pending_rings: Mutex::new(Some(PendingRings {
                rx_ring_rx: Some(rx_ring_rx),
                tx_dealloc_ring_rx: Some(tx_dealloc_ring_rx),
            })),
        }))
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, NetState> {
        self.state.lock()
    }

    pub fn stats(&self) -> &GlobalStats {
        &self.stats
    }

    pub fn signals(&self, if_nbr: IfNbr) -> NetResult<&IsrSignals> {
        self.signals.get(if_nbr.0 as usize).ok_or(NetError::InvalidIf)
    }

    pub fn rx_ring(&self) -> &RxRingTx {
        &self.rx_ring_tx
    }

    pub fn tx_dealloc_ring(&self) -> &TxDeallocRingTx {
        &self.tx_dealloc_ring_tx
    }

    /// Registers an interface. Takes the lock for the duration of the
    /// table mutation, same as every other non-ISR entry point.
    pub fn add_interface(
        self: &Arc<Self>,
        if_type: IfType,
        if_vtbl: Box<dyn IfVtbl>,
        dev_vtbl: Option<Box<dyn DevVtbl>>,
    ) -> NetResult<IfNbr> {
        let mut state = self.lock();
        let NetState {
            iface_table,
            pools,
            config,
            ..
        } = &mut *state;
        iface_table.add(if_type, if_vtbl, dev_vtbl, config.max_interfaces, pools)
    }

    /// Spawns the Rx worker, Tx-dealloc worker, and link-state monitor
    /// threads. Callable exactly once per `NetCore`; a second call returns
    /// `InvalidState`.
    pub fn start_workers(self: &Arc<Self>) -> NetResult<()> {
        let mut guard = self.pending_rings.lock().expect("pending rings mutex poisoned");
        let rings = guard.take().ok_or(NetError::InvalidState)?;
        let rx_ring_rx = rings.rx_ring_rx.expect("rx ring half already taken");
        let tx_ring_rx = rings.tx_dealloc_ring_rx.expect("tx dealloc ring half already taken");
        drop(guard);

        let core_rx = Arc::clone(self);
        std::thread::spawn(move || rx::worker_loop(core_rx, rx_ring_rx));

        let core_tx = Arc::clone(self);
        std::thread::spawn(move || tx::dealloc_worker_loop(core_tx, tx_ring_rx));

        let core_link = Arc::clone(self);
        std::thread::spawn(move || LinkMonitor::new(core_link).run());

        Ok(())
    }
}
