//! Error kinds shared by every module in this crate.
//!
//! One flat enum rather than a per-module error type, because the spec this
//! crate implements defines the error *kinds* once and expects every public
//! entry point to surface a value from that same set (see spec.md §7).

use thiserror::Error;

/// Everything a public entry point in this crate can fail with.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    #[error("unknown or out-of-range interface number")]
    InvalidIf,
    #[error("interface vtable configuration is incomplete or inconsistent")]
    InvalidCfg,
    #[error("interface or buffer is in the wrong state for this operation")]
    InvalidState,
    #[error("address is invalid for this interface or protocol")]
    InvalidAddr,
    #[error("address has the wrong length for this interface's hardware addressing")]
    InvalidAddrLen,
    #[error("protocol header type is not supported on this path")]
    InvalidProtocol,
    #[error("unknown I/O control option")]
    InvalidIoCtrlOpt,
    #[error("MTU is out of the range this interface supports")]
    InvalidMtu,
    #[error("buffer type does not match the operation (wrong pool drawn from)")]
    InvalidBufType,
    #[error("requested size does not fit in the pool's data area")]
    InvalidBufSize,
    #[error("protocol-layer index is out of bounds or the sentinel")]
    InvalidBufIx,
    #[error("total length is smaller than data length, or otherwise inconsistent")]
    InvalidBufLen,
    #[error("no buffer available in the requested pool")]
    NoBufAvail,
    #[error("pool memory allocation failed")]
    PoolMemAlloc,
    #[error("link is down")]
    LinkDown,
    #[error("loopback interface is not registered")]
    LoopbackDisabled,
    /// Non-fatal: the packet was handed to address resolution and will be
    /// re-entered later. Callers should treat this like success.
    #[error("packet queued pending address resolution")]
    TxAddrPend,
    #[error("timed out waiting for the device transmit-ready semaphore")]
    TxRdyTimeout,
    #[error("receive ring is at capacity")]
    RxQFull,
    #[error("OS fault signalling the receive ring")]
    RxQSignalFault,
    #[error("transmit dealloc ring is at capacity")]
    TxDeallocQFull,
    #[error("OS fault signalling the transmit dealloc ring")]
    TxDeallocQSignalFault,
    #[error("could not acquire the global network lock")]
    LockAcquire,
    #[error("receive path error")]
    Rx,
    #[error("transmit path error")]
    Tx,
    #[error("unexpected null pointer")]
    NullPtr,
    #[error("required vtable function is missing")]
    NullFn,
    #[error("unknown or unclassified error")]
    Unknown,
}

/// Result alias used throughout the crate.
pub type NetResult<T> = Result<T, NetError>;

impl NetError {
    /// True for the one error kind that is a normal, non-fatal outcome and
    /// should not bump an error counter the way a validation failure would.
    pub fn is_benign(self) -> bool {
        matches!(self, NetError::TxAddrPend)
    }
}
