//! Communicate task

use comms_if::net::Transport;
use log::debug;

use super::CommsGuard;
use crate::{data_store::DataStore, sched::Task};

/// Runs the budget guard over a transport.
pub struct CommsTask<T: Transport> {
    guard: CommsGuard,

    transport: T,

    enabled: bool,
}

impl<T: Transport> CommsTask<T> {
    pub fn new(guard: CommsGuard, transport: T, enabled: bool) -> Self {
        Self {
            guard,
            transport,
            enabled,
        }
    }

    pub fn guard(&self) -> &CommsGuard {
        &self.guard
    }
}

impl<T: Transport> Task for CommsTask<T> {
    fn execute(&mut self, ds: &mut DataStore) {
        if !self.enabled {
            return;
        }

        let report = self.guard.exchange(ds, &mut self.transport);

        debug!("Exchange {}: {:?}", self.guard.msg_seq_id(), report);
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}
