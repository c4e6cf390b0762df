//! Generic intrusive doubly-linked list over buffer headers.
//!
//! Both the transmit in-flight list (§4.F, using `tx_link`) and the
//! loopback receive FIFO (§4.G, using `secondary`) are "a doubly-linked
//! list of headers, splice anywhere, O(1) insert/remove" — the same shape
//! spec.md §9's design notes describe ("encode list membership as... indices
//! into owning-collection arenas"). Written once here and specialized by
//! the two callers through small field accessors, rather than duplicated.

use super::header::{BufHeader, HeaderHandle, ListLink};
use super::BufPools;

pub struct LinkedHeaderList {
    head: Option<HeaderHandle>,
    tail: Option<HeaderHandle>,
    len: usize,
}

impl Default for LinkedHeaderList {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkedHeaderList {
    pub fn new() -> Self {
        LinkedHeaderList {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<HeaderHandle> {
        self.head
    }

    pub fn push_back(
        &mut self,
        pools: &mut BufPools,
        h: HeaderHandle,
        get: impl Fn(&BufHeader) -> ListLink + Copy,
        set: impl Fn(&mut BufHeader, ListLink) + Copy,
    ) {
        if let Some(hdr) = pools.header_mut(h) {
            set(
                hdr,
                ListLink {
                    prev: self.tail,
                    next: None,
                },
            );
        }
        if let Some(tail) = self.tail {
            if let Some(t) = pools.header_mut(tail) {
                let mut l = get(t);
                l.next = Some(h);
                set(t, l);
            }
        } else {
            self.head = Some(h);
        }
        self.tail = Some(h);
        self.len += 1;
    }

    /// Splices `h` out of the list wherever it currently sits. No-op if `h`
    /// is not linked in via `get`/`set` (a `ListLink::default()`).
    pub fn remove(
        &mut self,
        pools: &mut BufPools,
        h: HeaderHandle,
        get: impl Fn(&BufHeader) -> ListLink + Copy,
        set: impl Fn(&mut BufHeader, ListLink) + Copy,
    ) {
        let link = match pools.header(h) {
            Some(hdr) => get(hdr),
            None => return,
        };
        if link.prev.is_none() && link.next.is_none() && self.head != Some(h) {
            return;
        }
        match link.prev {
            Some(p) => {
                if let Some(ph) = pools.header_mut(p) {
                    let mut l = get(ph);
                    l.next = link.next;
                    set(ph, l);
                }
            }
            None => self.head = link.next,
        }
        match link.next {
            Some(n) => {
                if let Some(nh) = pools.header_mut(n) {
                    let mut l = get(nh);
                    l.prev = link.prev;
                    set(nh, l);
                }
            }
            None => self.tail = link.prev,
        }
        if let Some(hdr) = pools.header_mut(h) {
            set(hdr, ListLink::default());
        }
        self.len = self.len.saturating_sub(1);
    }

    pub fn pop_front(
        &mut self,
        pools: &mut BufPools,
        get: impl Fn(&BufHeader) -> ListLink + Copy,
        set: impl Fn(&mut BufHeader, ListLink) + Copy,
    ) -> Option<HeaderHandle> {
        let h = self.head?;
        self.remove(pools, h, get, set);
        Some(h)
    }

    pub fn find_by(
        &self,
        pools: &BufPools,
        get: impl Fn(&BufHeader) -> ListLink,
        pred: impl Fn(&BufHeader) -> bool,
    ) -> Option<HeaderHandle> {
        let mut cur = self.head;
        while let Some(h) = cur {
            let hdr = pools.header(h)?;
            if pred(hdr) {
                return Some(h);
            }
            cur = get(hdr).next;
        }
        None
    }
}
