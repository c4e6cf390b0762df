//! Runtime configuration (ambient addition, SPEC_FULL.md "AMBIENT STACK").
//!
//! A plain validated struct built through a builder, following the
//! teacher's constructor-with-defaults style (`NetworkStack::new()`,
//! `DEFAULT_MTU`/`DEFAULT_BUFFER_SIZE`) rather than a config-file crate:
//! there is no file to load here, only in-process construction, so a
//! builder is the idiomatic fit.

use std::time::Duration;

use crate::buf::pool::DataPoolConfig;
use crate::error::{NetError, NetResult};

pub const DEFAULT_HEADER_POOL_CAPACITY: usize = 64;
pub const DEFAULT_RX_RING_CAPACITY: usize = 8;
pub const DEFAULT_TX_DEALLOC_RING_CAPACITY: usize = 8;
pub const DEFAULT_LINK_POLL_PERIOD: Duration = Duration::from_millis(500);
pub const DEFAULT_TX_SUSPEND_TIMEOUT: Duration = Duration::from_millis(10);
pub const DEFAULT_DEV_TX_RDY_TIMEOUT: Duration = Duration::from_millis(50);
pub const DEFAULT_MAX_INTERFACES: usize = 8;

/// Lower/upper bounds on `tx_suspend_timeout`, taken from spec.md §4.I
/// ("pend... with the IF's configured timeout (1-100 ms)").
pub const TX_SUSPEND_TIMEOUT_MIN: Duration = Duration::from_millis(1);
pub const TX_SUSPEND_TIMEOUT_MAX: Duration = Duration::from_millis(100);

/// Process-wide configuration for one [`crate::core::NetCore`] instance.
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub header_pool_capacity: usize,
    pub rx_ring_capacity: usize,
    pub tx_dealloc_ring_capacity: usize,
    pub link_poll_period: Duration,
    pub tx_suspend_timeout: Duration,
    pub dev_tx_rdy_timeout: Duration,
    pub max_interfaces: usize,
    pub load_balance_enabled: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            header_pool_capacity: DEFAULT_HEADER_POOL_CAPACITY,
            rx_ring_capacity: DEFAULT_RX_RING_CAPACITY,
            tx_dealloc_ring_capacity: DEFAULT_TX_DEALLOC_RING_CAPACITY,
            link_poll_period: DEFAULT_LINK_POLL_PERIOD,
            tx_suspend_timeout: DEFAULT_TX_SUSPEND_TIMEOUT,
            dev_tx_rdy_timeout: DEFAULT_DEV_TX_RDY_TIMEOUT,
            max_interfaces: DEFAULT_MAX_INTERFACES,
            load_balance_enabled: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct NetConfigBuilder {
    cfg: NetConfig,
}

impl NetConfigBuilder {
    pub fn new() -> Self {
        NetConfigBuilder {
            cfg: NetConfig::default(),
        }
    }

    pub fn header_pool_capacity(mut self, n: usize) -> Self {
        self.cfg.header_pool_capacity = n;
        self
    }

    pub fn rx_ring_capacity(mut self, n: usize) -> Self {
        self.cfg.rx_ring_capacity = n;
        self
    }

    pub fn tx_dealloc_ring_capacity(mut self, n: usize) -> Self {
        self.cfg.tx_dealloc_ring_capacity = n;
        self
    }

    pub fn link_poll_period(mut self, d: Duration) -> Self {
        self.cfg.link_poll_period = d;
        self
    }

    pub fn tx_suspend_timeout(mut self, d: Duration) -> Self {
        self.cfg.tx_suspend_timeout = d;
        self
    }

    pub fn dev_tx_rdy_timeout(mut self, d: Duration) -> Self {
        self.cfg.dev_tx_rdy_timeout = d;
        self
    }

    pub fn max_interfaces(mut self, n: usize) -> Self {
        self.cfg.max_interfaces = n;
        self
    }

    pub fn load_balance_enabled(mut self, enabled: bool) -> Self {
        self.cfg.load_balance_enabled = enabled;
        self
    }

    pub fn build(self) -> NetResult<NetConfig> {
        if self.cfg.header_pool_capacity == 0 {
            return Err(NetError::InvalidCfg);
        }
        if self.cfg.rx_ring_capacity == 0 || self.cfg.tx_dealloc_ring_capacity == 0 {
            return Err(NetError::InvalidCfg);
        }
        if self.cfg.tx_suspend_timeout < TX_SUSPEND_TIMEOUT_MIN
            || self.cfg.tx_suspend_timeout > TX_SUSPEND_TIMEOUT_MAX
        {
            return Err(NetError::InvalidCfg);
        }
        if self.cfg.max_interfaces == 0 {
            return Err(NetError::InvalidCfg);
        }
        Ok(self.cfg)
    }
}

/// Per-interface pool sizing, handed to [`crate::iface::table::IfTable::add`]
/// via the concrete `IfVtbl`'s `add()` in production; tests build these
/// directly with literal values (spec.md §8 scenario text).
#[derive(Debug, Clone, Copy)]
pub struct IfPoolSizing {
    pub rx_large: Option<DataPoolConfig>,
    pub tx_large: Option<DataPoolConfig>,
    pub tx_small: Option<DataPoolConfig>,
}
