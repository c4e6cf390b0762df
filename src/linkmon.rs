//! Link-State Monitor (spec.md §4.H): a periodic poller, implemented as a
//! dedicated OS thread sleeping on the configured period rather than a
//! hardware timer callback — this crate runs on a hosted OS layer, so the
//! teacher's threads-for-workers style (`rx::spawn`) is reused directly
//! instead of introducing a timer abstraction.

use std::sync::Arc;

use log::debug;

use crate::core::NetCore;
use crate::iface::table::LinkSubscriberFn;
use crate::iface::{IfNbr, IfType, IoCtrlOpt, LinkState};

pub struct LinkMonitor {
    core: Arc<NetCore>,
}

impl LinkMonitor {
    pub fn new(core: Arc<NetCore>) -> Self {
        LinkMonitor { core }
    }

    /// Runs until the process exits; there is no shutdown signal because
    /// nothing in this crate ever tears a `NetCore` back down (spec.md §3:
    /// "the registry is append-only during operation; removal is not
    /// supported").
    pub fn run(self) {
        loop {
            let period = self.core.lock().config.link_poll_period;
            std::thread::sleep(period);
            self.tick();
        }
    }

    /// One poll pass: reads every enabled non-loopback interface's link
    /// state, updates the cache, and collects which interfaces transitioned
    /// so their subscribers can be invoked with the lock released.
    fn tick(&self) {
        let transitions = self.poll_and_update();
        for (if_nbr, new_state, subs) in transitions {
            debug!("link state transition on if {:?}: now {:?}", if_nbr, new_state);
            for sub in &subs {
                (sub.as_ref())(if_nbr, new_state);
            }
            if let Ok(iface) = self.core.lock().iface_table.get_mut(if_nbr) {
                iface.link_prev = new_state;
            }
        }
    }

    fn poll_and_update(&self) -> Vec<(IfNbr, LinkState, Vec<LinkSubscriberFn>)> {
        let mut state = self.core.lock();
        let candidates: Vec<IfNbr> = state
            .iface_table
            .iter()
            .filter(|iface| iface.enabled && iface.if_type != IfType::Loopback)
            .map(|iface| iface.id)
            .collect();

        let mut transitions = Vec::new();
        for if_nbr in candidates {
            let mut link_up = false;
            let poll_result = match state.iface_table.get_mut(if_nbr) {
                Ok(iface) => iface.if_vtbl.io_ctrl(IoCtrlOpt::LinkStateGet(&mut link_up)),
                Err(_) => continue,
            };
            // On a read fault the cache is left alone (spec.md §4.H rationale).
            if poll_result.is_err() {
                continue;
            }
            let new_state = if link_up { LinkState::Up } else { LinkState::Down };

            let iface = match state.iface_table.get_mut(if_nbr) {
                Ok(iface) => iface,
                Err(_) => continue,
            };
            iface.link = new_state;
            if new_state != iface.link_prev {
                let subs = state.iface_table.link_state_subscribers(if_nbr).unwrap_or_default();
                transitions.push((if_nbr, new_state, subs));
            }
        }
        transitions
    }
}
