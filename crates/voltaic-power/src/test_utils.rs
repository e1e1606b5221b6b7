//! Test helpers: a recording [`PowerPeers`] and ID factories.

use std::collections::HashMap;

use slotmap::SlotMap;
use voltaic_core::fixed::Fixed64;
use voltaic_core::id::{DeviceId, NetworkId, NodeId, ProviderId};
use voltaic_core::position::WorldPosition;

use crate::ledger::{DeviceLoads, LoadLedger, NetworkLedger};
use crate::peers::PowerPeers;
use crate::storage::{Battery, PowerStorage};

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn make_device_ids(count: usize) -> Vec<DeviceId> {
    let mut sm = SlotMap::<DeviceId, ()>::with_key();
    (0..count).map(|_| sm.insert(())).collect()
}

pub fn make_device_id() -> DeviceId {
    make_device_ids(1).remove(0)
}

/// One call observed by a [`RecordingLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerCall {
    Add { device: DeviceId, load: Fixed64 },
    Remove { device: DeviceId },
    Update {
        device: DeviceId,
        old_load: Fixed64,
        new_load: Fixed64,
    },
}

/// A ledger that keeps real totals and logs every call it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingLedger {
    pub loads: DeviceLoads,
    pub calls: Vec<LedgerCall>,
}

impl LoadLedger for RecordingLedger {
    fn add_device(&mut self, device: DeviceId, load: Fixed64) {
        self.calls.push(LedgerCall::Add { device, load });
        self.loads.add_device(device, load);
    }

    fn remove_device(&mut self, device: DeviceId) {
        self.calls.push(LedgerCall::Remove { device });
        self.loads.remove_device(device);
    }

    fn update_device(&mut self, device: DeviceId, old_load: Fixed64, new_load: Fixed64) {
        self.calls.push(LedgerCall::Update {
            device,
            old_load,
            new_load,
        });
        self.loads.update_device(device, old_load, new_load);
    }
}

impl NetworkLedger for RecordingLedger {
    fn has_device(&self, device: DeviceId) -> bool {
        self.loads.contains(device)
    }
}

/// In-memory collaborators for driving a device without a full module.
#[derive(Debug, Default)]
pub struct RecordingPeers {
    providers: SlotMap<ProviderId, (WorldPosition, RecordingLedger)>,
    networks: SlotMap<NetworkId, RecordingLedger>,
    nodes: SlotMap<NodeId, Option<NetworkId>>,
    batteries: HashMap<DeviceId, Battery>,
    /// Every powered-changed notification, in order.
    pub powered_changes: Vec<(DeviceId, bool)>,
}

impl RecordingPeers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, position: WorldPosition) -> ProviderId {
        self.providers.insert((position, RecordingLedger::default()))
    }

    pub fn drop_provider(&mut self, id: ProviderId) {
        self.providers.remove(id);
    }

    pub fn add_network(&mut self) -> NetworkId {
        self.networks.insert(RecordingLedger::default())
    }

    pub fn add_node(&mut self) -> NodeId {
        self.nodes.insert(None)
    }

    pub fn set_node_parent(&mut self, node: NodeId, parent: Option<NetworkId>) {
        if let Some(slot) = self.nodes.get_mut(node) {
            *slot = parent;
        }
    }

    pub fn add_battery(&mut self, device: DeviceId, battery: Battery) {
        self.batteries.insert(device, battery);
    }

    pub fn battery(&self, device: DeviceId) -> Option<&Battery> {
        self.batteries.get(&device)
    }

    pub fn provider_ledger(&self, id: ProviderId) -> &RecordingLedger {
        &self.providers[id].1
    }

    pub fn network_ledger(&self, id: NetworkId) -> &RecordingLedger {
        &self.networks[id]
    }

    /// Clear recorded calls on every ledger.
    pub fn clear_calls(&mut self) {
        for (_, (_, ledger)) in self.providers.iter_mut() {
            ledger.calls.clear();
        }
        for (_, ledger) in self.networks.iter_mut() {
            ledger.calls.clear();
        }
        self.powered_changes.clear();
    }

    /// Number of sources that currently carry `device`.
    pub fn registrations(&self, device: DeviceId) -> usize {
        let providers = self
            .providers
            .values()
            .filter(|(_, ledger)| ledger.loads.contains(device))
            .count();
        let networks = self
            .networks
            .values()
            .filter(|ledger| ledger.loads.contains(device))
            .count();
        providers + networks
    }
}

impl PowerPeers for RecordingPeers {
    fn provider(&mut self, id: ProviderId) -> Option<&mut dyn LoadLedger> {
        self.providers
            .get_mut(id)
            .map(|(_, ledger)| ledger as &mut dyn LoadLedger)
    }

    fn provider_position(&self, id: ProviderId) -> Option<WorldPosition> {
        self.providers.get(id).map(|(position, _)| *position)
    }

    fn network(&mut self, id: NetworkId) -> Option<&mut dyn NetworkLedger> {
        self.networks
            .get_mut(id)
            .map(|ledger| ledger as &mut dyn NetworkLedger)
    }

    fn node_parent(&self, node: NodeId) -> Option<NetworkId> {
        self.nodes.get(node).copied().flatten()
    }

    fn storage(&mut self, device: DeviceId) -> Option<&mut dyn PowerStorage> {
        self.batteries
            .get_mut(&device)
            .map(|battery| battery as &mut dyn PowerStorage)
    }

    fn powered_changed(&mut self, device: DeviceId, powered: bool) {
        self.powered_changes.push((device, powered));
    }
}
