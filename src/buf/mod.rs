//! Buffer Pools (spec.md §4.A): typed pools of data areas plus a pool of
//! buffer headers. Owns all packet memory in the system.
//!
//! This module is a leaf: it knows nothing about protocol queues, the
//! in-flight list, or the loopback queue. Unlinking a buffer from whatever
//! list currently owns it is [`crate::core::NetCore`]'s job (see that
//! module's `free_buf`) — keeping this module free of that knowledge is
//! what lets receive allocation stay lock-free-shaped: Rx only ever touches
//! its own interface's `RxLarge` pool.

pub mod header;
pub mod list;
pub mod pool;

use crate::error::{NetError, NetResult};
use crate::iface::IfNbr;
use header::{BufFlags, BufHeader, BufType, DataHandle, HeaderHandle};
use pool::{DataPool, DataPoolConfig, Pool};

/// The three typed data-area pools one interface owns.
#[derive(Default)]
pub struct IfDataPools {
    pub rx_large: Option<DataPool>,
    pub tx_large: Option<DataPool>,
    pub tx_small: Option<DataPool>,
}

impl IfDataPools {
    fn pool(&self, kind: BufType) -> Option<&DataPool> {
        match kind {
            BufType::RxLarge => self.rx_large.as_ref(),
            BufType::TxLarge => self.tx_large.as_ref(),
            BufType::TxSmall => self.tx_small.as_ref(),
            _ => None,
        }
    }

    fn pool_mut(&mut self, kind: BufType) -> Option<&mut DataPool> {
        match kind {
            BufType::RxLarge => self.rx_large.as_mut(),
            BufType::TxLarge => self.tx_large.as_mut(),
            BufType::TxSmall => self.tx_small.as_mut(),
            _ => None,
        }
    }
}

/// Owner of the header pool and every interface's data-area pools.
pub struct BufPools {
    headers: Pool<BufHeader>,
    per_if: Vec<IfDataPools>,
}

impl BufPools {
    pub fn new(header_capacity: usize) -> Self {
        BufPools {
            headers: Pool::with_capacity(header_capacity),
            per_if: Vec::new(),
        }
    }

    /// Installs the data-area pools for a newly registered interface.
    /// Called from `IfTable::add`'s `ifVtbl.Add` → `BufPoolInit` step.
    pub fn register_interface(
        &mut self,
        if_nbr: IfNbr,
        rx_large: Option<DataPoolConfig>,
        tx_large: Option<DataPoolConfig>,
        tx_small: Option<DataPoolConfig>,
    ) {
        let idx = if_nbr.0 as usize;
        if self.per_if.len() <= idx {
            self.per_if.resize_with(idx + 1, IfDataPools::default);
        }
        self.per_if[idx] = IfDataPools {
            rx_large: rx_large.map(DataPool::new),
            tx_large: tx_large.map(DataPool::new),
            tx_small: tx_small.map(DataPool::new),
        };
    }

    fn if_pools(&self, if_nbr: IfNbr) -> NetResult<&IfDataPools> {
        self.per_if.get(if_nbr.0 as usize).ok_or(NetError::InvalidIf)
    }

    fn if_pools_mut(&mut self, if_nbr: IfNbr) -> NetResult<&mut IfDataPools> {
        self.per_if.get_mut(if_nbr.0 as usize).ok_or(NetError::InvalidIf)
    }

    /// `Get(ifNbr, kind, size, baseIx, flags) -> (header, ixOffset)`.
    pub fn get(
        &mut self,
        if_nbr: IfNbr,
        kind: BufType,
        size: usize,
        base_ix: usize,
        flags: BufFlags,
    ) -> NetResult<(HeaderHandle, usize)> {
        let (data, ix_offset) = self.get_data_ptr_internal(if_nbr, kind, size, base_ix)?;
        let header = BufHeader::new(if_nbr, kind, data, flags);
        match self.headers.alloc(header) {
            Some(idx) => Ok((HeaderHandle(idx), ix_offset)),
            None => {
                // Roll back the data-area allocation we just made.
                if let Ok(pools) = self.if_pools_mut(if_nbr) {
                    if let Some(pool) = pools.pool_mut(kind) {
                        pool.free_index(data.index);
                    }
                }
                Err(NetError::NoBufAvail)
            }
        }
    }

    /// `GetDataPtr(ifNbr, kind, size, baseIx) -> (dataPtr, actualSize)`.
    pub fn get_data_ptr(
        &mut self,
        if_nbr: IfNbr,
        kind: BufType,
        size: usize,
        base_ix: usize,
    ) -> NetResult<(DataHandle, usize)> {
        self.get_data_ptr_internal(if_nbr, kind, size, base_ix)
    }

    fn get_data_ptr_internal(
        &mut self,
        if_nbr: IfNbr,
        kind: BufType,
        size: usize,
        base_ix: usize,
    ) -> NetResult<(DataHandle, usize)> {
        let pools = self.if_pools_mut(if_nbr)?;
        let pool = pools.pool_mut(kind).ok_or(NetError::InvalidBufType)?;
        let ix_offset = pool.align_offset(base_ix);
        let needed = base_ix
            .checked_add(ix_offset)
            .and_then(|v| v.checked_add(size))
            .ok_or(NetError::InvalidBufIx)?;
        if needed > pool.stride() {
            return Err(NetError::InvalidBufSize);
        }
        let index = pool.alloc().ok_or(NetError::NoBufAvail)?;
        Ok((
            DataHandle {
                if_nbr,
                kind,
                index,
            },
            ix_offset,
        ))
    }

    pub fn header(&self, h: HeaderHandle) -> Option<&BufHeader> {
        self.headers.get(h.0)
    }

    pub fn header_mut(&mut self, h: HeaderHandle) -> Option<&mut BufHeader> {
        self.headers.get_mut(h.0)
    }

    pub fn data(&self, dh: DataHandle) -> NetResult<&[u8]> {
        let pool = self.if_pools(dh.if_nbr)?.pool(dh.kind).ok_or(NetError::InvalidBufType)?;
        Ok(pool.data(dh.index))
    }

    pub fn data_mut(&mut self, dh: DataHandle) -> NetResult<&mut [u8]> {
        let pool = self
            .if_pools_mut(dh.if_nbr)?
            .pool_mut(dh.kind)
            .ok_or(NetError::InvalidBufType)?;
        Ok(pool.data_mut(dh.index))
    }

    /// `DataCopy(dst, src, ixDst, ixSrc, len)`. Refuses to copy across the
    /// bounds of either data area; a zero-length copy is a silent no-op.
    pub fn data_copy(
        &mut self,
        dst: DataHandle,
        ix_dst: usize,
        src: DataHandle,
        ix_src: usize,
        len: usize,
    ) -> NetResult<()> {
        if len == 0 {
            return Ok(());
        }
        let src_bytes = {
            let src_slice = self.data(src)?;
            let end = ix_src.checked_add(len).ok_or(NetError::InvalidBufLen)?;
            src_slice.get(ix_src..end).ok_or(NetError::InvalidBufLen)?.to_vec()
        };
        let dst_slice = self.data_mut(dst)?;
        let end = ix_dst.checked_add(len).ok_or(NetError::InvalidBufLen)?;
        let dst_range = dst_slice.get_mut(ix_dst..end).ok_or(NetError::InvalidBufLen)?;
        dst_range.copy_from_slice(&src_bytes);
        Ok(())
    }

    /// Removes the header at `h` and returns its data-area slot to the
    /// owning pool. Does **not** check `TxLock` or list membership — callers
    /// (`NetCore::free_buf`) must have already verified and unlinked.
    pub fn release(&mut self, h: HeaderHandle) -> NetResult<()> {
        let header = self.headers.free(h.0).ok_or(NetError::NullPtr)?;
        if let Ok(pools) = self.if_pools_mut(header.if_nbr) {
            if let Some(pool) = pools.pool_mut(header.data.kind) {
                pool.free_index(header.data.index);
            }
        }
        Ok(())
    }

    /// Pool-level stats used by the P1 "no leak" property: free counts of
    /// every pool configured for `if_nbr`, plus the header pool.
    pub fn free_counts(&self, if_nbr: IfNbr) -> NetResult<(usize, usize, usize, usize)> {
        let pools = self.if_pools(if_nbr)?;
        Ok((
            self.headers.free_count(),
            pools.rx_large.as_ref().map_or(0, DataPool::free_count),
            pools.tx_large.as_ref().map_or(0, DataPool::free_count),
            pools.tx_small.as_ref().map_or(0, DataPool::free_count),
        ))
    }
}
