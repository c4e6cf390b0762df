//! A buffer-pool and network-interface core for a small, embedded-style
//! TCP/IP stack: fixed-capacity packet pools, a registry of network
//! interfaces behind a pair of vtables, receive/transmit pipelines built
//! around bounded rings and a single global lock, a loopback interface, a
//! link-state monitor, and a load balancer that keeps a busy transmitter
//! from starving the receive path.
//!
//! Nothing above the link layer lives here — parsing and building IPv4,
//! ARP, or anything carried inside a frame is out of scope (see `DESIGN.md`
//! for what was deliberately left out and why). What this crate owns is the
//! plumbing every protocol above it would share: where packet memory comes
//! from, how an interface is registered and told to send or receive, and
//! the concurrency discipline that keeps a single mutable model safe
//! between a worker thread and a device interrupt.
//!
//! Every operation in this crate is reached through one [`core::NetCore`]
//! handle, constructed once per process from a [`config::NetConfig`] and
//! shared behind an `Arc`. There is no hidden global state.

pub mod balance;
pub mod buf;
pub mod config;
pub mod core;
pub mod error;
pub mod iface;
pub mod inflight;
pub mod linkmon;
pub mod lock;
pub mod loopback;
pub mod rx;
pub mod stats;
pub mod sync;
pub mod tx;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{NetConfig, NetConfigBuilder};
pub use core::NetCore;
pub use error::{NetError, NetResult};
pub use iface::{
    BufPoolCfg, DevVtbl, HwAddr, IfNbr, IfType, IfVtbl, IoCtrlOpt, IsrType, LinkState,
};
