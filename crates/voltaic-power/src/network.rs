//! Wired power networks.

use voltaic_core::fixed::Fixed64;
use voltaic_core::id::{DeviceId, NodeId};

use crate::ledger::{DeviceLoads, LoadLedger, NetworkLedger};

/// A connected wired network: member nodes plus the devices whose load it
/// currently carries.
#[derive(Debug, Clone, Default)]
pub struct Powernet {
    /// Nodes attached to this network.
    nodes: Vec<NodeId>,
    /// Registered devices and their loads.
    loads: DeviceLoads,
    /// Whether anything on the network is generating.
    pub energized: bool,
}

impl Powernet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub(crate) fn add_node(&mut self, node: NodeId) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) {
        self.nodes.retain(|n| *n != node);
    }

    pub(crate) fn take_nodes(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes)
    }

    /// Aggregate load of every registered device.
    pub fn total_load(&self) -> Fixed64 {
        self.loads.total()
    }

    pub fn device_count(&self) -> usize {
        self.loads.len()
    }

    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.loads.devices()
    }

    pub fn load_of(&self, device: DeviceId) -> Option<Fixed64> {
        self.loads.load_of(device)
    }
}

impl LoadLedger for Powernet {
    fn add_device(&mut self, device: DeviceId, load: Fixed64) {
        tracing::trace!(?device, %load, "powernet registered device");
        self.loads.add_device(device, load);
    }

    fn remove_device(&mut self, device: DeviceId) {
        tracing::trace!(?device, "powernet deregistered device");
        self.loads.remove_device(device);
    }

    fn update_device(&mut self, device: DeviceId, old_load: Fixed64, new_load: Fixed64) {
        self.loads.update_device(device, old_load, new_load);
    }
}

impl NetworkLedger for Powernet {
    fn has_device(&self, device: DeviceId) -> bool {
        self.loads.contains(device)
    }
}
