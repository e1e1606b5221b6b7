//! The power world: owns every device, source, node and battery and routes
//! topology changes to the devices they concern.
//!
//! # Tick
//!
//! [`PowerModule::tick`] runs two passes over all devices:
//!
//! 1. **Supply** -- each device is externally powered iff the source it is
//!    connected to is energized.
//! 2. **Internal** -- each device evaluates its battery fallback.
//!
//! Topology calls (node attach/detach, provider range changes, network
//! merges) are handled immediately and completely, including the
//! notifications they cause, before they return.

use slotmap::{SecondaryMap, SlotMap};
use voltaic_core::fixed::{Fixed64, Ticks};
use voltaic_core::id::{DeviceId, NetworkId, NodeId, ProviderId};
use voltaic_core::position::WorldPosition;

use crate::device::PowerDevice;
use crate::draw::{Connection, DeviceConfig};
use crate::error::PowerError;
use crate::event::{ListenerHandle, PowerEvent, PowerEventBus, PowerListener};
use crate::ledger::{LoadLedger, NetworkLedger};
use crate::network::Powernet;
use crate::node::{NodeEvent, NodeSubscription, PowerNode};
use crate::peers::PowerPeers;
use crate::provider::PowerProvider;
use crate::storage::{Battery, PowerStorage};

// ---------------------------------------------------------------------------
// Peers view
// ---------------------------------------------------------------------------

/// Everything but the device table, borrowed for the duration of one
/// device operation.
struct Peers<'a> {
    providers: &'a mut SlotMap<ProviderId, PowerProvider>,
    networks: &'a mut SlotMap<NetworkId, Powernet>,
    nodes: &'a SlotMap<NodeId, PowerNode>,
    batteries: &'a mut SecondaryMap<DeviceId, Battery>,
    bus: &'a mut PowerEventBus,
    tick: Ticks,
}

impl Peers<'_> {
    /// Whether the source `device` is connected to has power to give.
    fn source_energized(&self, device: &PowerDevice) -> bool {
        match device.connected() {
            Connection::Node => device
                .node()
                .and_then(|node| self.node_parent(node))
                .and_then(|network| self.networks.get(network))
                .is_some_and(|network| network.energized),
            Connection::Provider => device
                .provider()
                .and_then(|provider| self.providers.get(provider))
                .is_some_and(|provider| provider.energized),
            Connection::None => false,
        }
    }
}

impl PowerPeers for Peers<'_> {
    fn provider(&mut self, id: ProviderId) -> Option<&mut dyn LoadLedger> {
        self.providers
            .get_mut(id)
            .map(|provider| provider as &mut dyn LoadLedger)
    }

    fn provider_position(&self, id: ProviderId) -> Option<WorldPosition> {
        self.providers.get(id).map(|provider| provider.position)
    }

    fn network(&mut self, id: NetworkId) -> Option<&mut dyn NetworkLedger> {
        self.networks
            .get_mut(id)
            .map(|network| network as &mut dyn NetworkLedger)
    }

    fn node_parent(&self, node: NodeId) -> Option<NetworkId> {
        self.nodes.get(node).and_then(PowerNode::parent)
    }

    fn storage(&mut self, device: DeviceId) -> Option<&mut dyn PowerStorage> {
        self.batteries
            .get_mut(device)
            .map(|battery| battery as &mut dyn PowerStorage)
    }

    fn powered_changed(&mut self, device: DeviceId, powered: bool) {
        self.bus.emit(PowerEvent::PoweredChanged {
            device,
            powered,
            tick: self.tick,
        });
    }
}

// ---------------------------------------------------------------------------
// Power module
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PowerModule {
    devices: SlotMap<DeviceId, PowerDevice>,
    providers: SlotMap<ProviderId, PowerProvider>,
    networks: SlotMap<NetworkId, Powernet>,
    nodes: SlotMap<NodeId, PowerNode>,
    node_subscriptions: SecondaryMap<DeviceId, NodeSubscription>,
    batteries: SecondaryMap<DeviceId, Battery>,
    bus: PowerEventBus,
    current_tick: Ticks,
}

impl PowerModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn split(&mut self) -> (&mut SlotMap<DeviceId, PowerDevice>, Peers<'_>) {
        let peers = Peers {
            providers: &mut self.providers,
            networks: &mut self.networks,
            nodes: &self.nodes,
            batteries: &mut self.batteries,
            bus: &mut self.bus,
            tick: self.current_tick,
        };
        (&mut self.devices, peers)
    }

    /// Run `f` against one device and deliver whatever it emitted.
    fn with_device<R>(
        &mut self,
        id: DeviceId,
        f: impl FnOnce(&mut PowerDevice, &mut Peers<'_>) -> R,
    ) -> Result<R, PowerError> {
        let (devices, mut peers) = self.split();
        let device = devices.get_mut(id).ok_or(PowerError::UnknownDevice(id))?;
        let result = f(device, &mut peers);
        self.bus.deliver();
        Ok(result)
    }

    // -- Accessors --

    pub fn current_tick(&self) -> Ticks {
        self.current_tick
    }

    pub fn device(&self, id: DeviceId) -> Option<&PowerDevice> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &PowerDevice)> {
        self.devices.iter()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn provider(&self, id: ProviderId) -> Option<&PowerProvider> {
        self.providers.get(id)
    }

    pub fn network(&self, id: NetworkId) -> Option<&Powernet> {
        self.networks.get(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&PowerNode> {
        self.nodes.get(id)
    }

    pub fn battery(&self, device: DeviceId) -> Option<&Battery> {
        self.batteries.get(device)
    }

    pub fn battery_mut(&mut self, device: DeviceId) -> Option<&mut Battery> {
        self.batteries.get_mut(device)
    }

    /// Examine text for a device: a "not powered" notice, or nothing.
    pub fn examine(&self, id: DeviceId) -> Result<Option<&'static str>, PowerError> {
        self.devices
            .get(id)
            .map(PowerDevice::examine_text)
            .ok_or(PowerError::UnknownDevice(id))
    }

    // -- Events --

    pub fn subscribe(&mut self, listener: PowerListener) -> ListenerHandle {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.bus.unsubscribe(handle)
    }

    /// Take every event delivered since the last drain.
    pub fn drain_events(&mut self) -> Vec<PowerEvent> {
        self.bus.drain()
    }

    // -- Device lifecycle --

    /// Create a device, its node (when it can be wired) and its battery
    /// (when configured), and put it in range of nearby providers.
    pub fn spawn_device(&mut self, config: &DeviceConfig, position: WorldPosition) -> DeviceId {
        let id = self
            .devices
            .insert_with_key(|id| PowerDevice::new(id, config, position));

        if let Some(battery) = config.battery {
            self.batteries.insert(id, battery.into());
        }

        let draw_type = self.devices[id].draw_type();
        if draw_type.uses_node() {
            let node = self.nodes.insert(PowerNode::new());
            let subscription = self.nodes[node].subscribe(id);
            self.node_subscriptions.insert(id, subscription);
            self.devices[id].set_node(Some(node));
        }

        tracing::debug!(device = ?id, ?draw_type, load = %config.load, "spawned device");

        if draw_type.uses_provider() {
            self.sync_device_range(id);
        }
        id
    }

    /// Tear a device down, releasing every registration it holds.
    pub fn despawn_device(&mut self, id: DeviceId) -> Result<(), PowerError> {
        self.with_device(id, |device, peers| device.shutdown(peers))?;

        for provider in self.providers.values_mut() {
            provider.mark_out_of_range(id);
        }

        let node = self.devices.get(id).and_then(PowerDevice::node);
        if let Some(node) = node {
            if let Some(subscription) = self.node_subscriptions.remove(id) {
                if let Some(power_node) = self.nodes.get_mut(node) {
                    power_node.unsubscribe(subscription);
                }
            }
            if let Some(parent) = self.nodes.get(node).and_then(PowerNode::parent) {
                if let Some(network) = self.networks.get_mut(parent) {
                    network.remove_node(node);
                }
            }
            self.nodes.remove(node);
        }

        self.batteries.remove(id);
        self.devices.remove(id);
        tracing::debug!(device = ?id, "despawned device");
        Ok(())
    }

    // -- Device state --

    pub fn set_load(&mut self, id: DeviceId, load: Fixed64) -> Result<(), PowerError> {
        self.with_device(id, |device, peers| device.set_load(load, peers))
    }

    pub fn set_external_powered(&mut self, id: DeviceId, powered: bool) -> Result<(), PowerError> {
        self.with_device(id, |device, peers| device.set_external_powered(powered, peers))
    }

    pub fn set_internal_powered(&mut self, id: DeviceId, powered: bool) -> Result<(), PowerError> {
        self.with_device(id, |device, peers| device.set_internal_powered(powered, peers))
    }

    /// Move a device, refresh which providers reach it, and re-arbitrate.
    pub fn move_device(&mut self, id: DeviceId, position: WorldPosition) -> Result<(), PowerError> {
        self.devices
            .get_mut(id)
            .ok_or(PowerError::UnknownDevice(id))?
            .set_position(position);
        self.sync_device_range(id);
        self.with_device(id, |device, peers| device.connect_to_best_provider(peers))
    }

    // -- Providers --

    pub fn create_provider(&mut self, position: WorldPosition, range: Fixed64) -> ProviderId {
        let id = self.providers.insert(PowerProvider::new(position, range));
        tracing::debug!(provider = ?id, %range, "created provider");
        self.sync_provider_range(id);
        id
    }

    /// Remove a provider. Every device that listed it loses it as a candidate.
    pub fn despawn_provider(&mut self, id: ProviderId) -> Result<(), PowerError> {
        let in_range = self
            .providers
            .get_mut(id)
            .ok_or(PowerError::UnknownProvider(id))?
            .take_in_range();

        for device in in_range {
            if let Err(err) = self.with_device(device, |d, peers| d.remove_provider(id, peers)) {
                tracing::warn!(provider = ?id, error = %err, "stale device in provider range");
            }
        }

        self.providers.remove(id);
        tracing::debug!(provider = ?id, "despawned provider");
        Ok(())
    }

    pub fn move_provider(&mut self, id: ProviderId, position: WorldPosition) -> Result<(), PowerError> {
        self.providers
            .get_mut(id)
            .ok_or(PowerError::UnknownProvider(id))?
            .position = position;
        self.sync_provider_range(id);
        self.rearbitrate_in_range(id)
    }

    pub fn set_provider_range(&mut self, id: ProviderId, range: Fixed64) -> Result<(), PowerError> {
        self.providers
            .get_mut(id)
            .ok_or(PowerError::UnknownProvider(id))?
            .range = range;
        self.sync_provider_range(id);
        Ok(())
    }

    pub fn set_provider_energized(&mut self, id: ProviderId, energized: bool) -> Result<(), PowerError> {
        self.providers
            .get_mut(id)
            .ok_or(PowerError::UnknownProvider(id))?
            .energized = energized;
        Ok(())
    }

    /// Make `provider` a candidate for `device`, regardless of distance.
    pub fn add_provider_candidate(
        &mut self,
        device: DeviceId,
        provider: ProviderId,
    ) -> Result<(), PowerError> {
        if !self.devices.contains_key(device) {
            return Err(PowerError::UnknownDevice(device));
        }
        self.providers
            .get_mut(provider)
            .ok_or(PowerError::UnknownProvider(provider))?
            .mark_in_range(device);
        self.with_device(device, |d, peers| d.add_provider(provider, peers))
    }

    /// Withdraw `provider` as a candidate for `device`. Idempotent.
    pub fn remove_provider_candidate(
        &mut self,
        device: DeviceId,
        provider: ProviderId,
    ) -> Result<(), PowerError> {
        if let Some(p) = self.providers.get_mut(provider) {
            p.mark_out_of_range(device);
        }
        self.with_device(device, |d, peers| d.remove_provider(provider, peers))
    }

    /// Bring `device`'s candidate set in line with provider ranges.
    fn sync_device_range(&mut self, device: DeviceId) {
        let Some(dev) = self.devices.get(device) else {
            return;
        };
        let position = dev.position();
        let eligible = dev.draw_type().uses_provider();

        let changes: Vec<(ProviderId, bool)> = self
            .providers
            .iter()
            .filter_map(|(id, provider)| {
                let reaches = eligible && provider.reaches(&position);
                let listed = provider.in_range().contains(&device);
                (reaches != listed).then_some((id, reaches))
            })
            .collect();

        for (provider, reaches) in changes {
            self.apply_range_change(device, provider, reaches);
        }
    }

    /// Bring every device's candidacy for `provider` in line with its range.
    fn sync_provider_range(&mut self, provider: ProviderId) {
        let Some(p) = self.providers.get(provider) else {
            return;
        };

        let changes: Vec<(DeviceId, bool)> = self
            .devices
            .iter()
            .filter_map(|(id, device)| {
                let reaches =
                    device.draw_type().uses_provider() && p.reaches(&device.position());
                let listed = p.in_range().contains(&id);
                (reaches != listed).then_some((id, reaches))
            })
            .collect();

        for (device, reaches) in changes {
            self.apply_range_change(device, provider, reaches);
        }
    }

    fn apply_range_change(&mut self, device: DeviceId, provider: ProviderId, reaches: bool) {
        let result = if reaches {
            self.add_provider_candidate(device, provider)
        } else {
            self.remove_provider_candidate(device, provider)
        };
        if let Err(err) = result {
            tracing::warn!(?device, ?provider, error = %err, "range update skipped");
        }
    }

    fn rearbitrate_in_range(&mut self, provider: ProviderId) -> Result<(), PowerError> {
        let in_range = self
            .providers
            .get(provider)
            .ok_or(PowerError::UnknownProvider(provider))?
            .in_range()
            .to_vec();
        for device in in_range {
            if let Err(err) = self.with_device(device, |d, peers| d.connect_to_best_provider(peers)) {
                tracing::warn!(?provider, error = %err, "stale device in provider range");
            }
        }
        Ok(())
    }

    // -- Networks --

    pub fn create_network(&mut self) -> NetworkId {
        self.networks.insert(Powernet::new())
    }

    pub fn set_network_energized(&mut self, id: NetworkId, energized: bool) -> Result<(), PowerError> {
        self.networks
            .get_mut(id)
            .ok_or(PowerError::UnknownNetwork(id))?
            .energized = energized;
        Ok(())
    }

    /// Attach a node to a network, leaving any previous network first.
    pub fn attach_node(&mut self, node: NodeId, network: NetworkId) -> Result<(), PowerError> {
        if !self.networks.contains_key(network) {
            return Err(PowerError::UnknownNetwork(network));
        }
        let parent = self
            .nodes
            .get(node)
            .ok_or(PowerError::UnknownNode(node))?
            .parent();
        if parent == Some(network) {
            return Ok(());
        }
        if parent.is_some() {
            self.detach_node(node)?;
        }

        self.nodes[node].set_parent(Some(network));
        self.networks[network].add_node(node);
        tracing::debug!(?node, ?network, "node attached");
        self.dispatch_node_event(node, NodeEvent::Connected(network));
        Ok(())
    }

    /// Detach a node from its network. No-op for a detached node.
    pub fn detach_node(&mut self, node: NodeId) -> Result<(), PowerError> {
        let power_node = self.nodes.get_mut(node).ok_or(PowerError::UnknownNode(node))?;
        let Some(network) = power_node.parent() else {
            return Ok(());
        };
        power_node.set_parent(None);
        if let Some(net) = self.networks.get_mut(network) {
            net.remove_node(node);
        }
        tracing::debug!(?node, ?network, "node detached");
        self.dispatch_node_event(node, NodeEvent::Disconnected(network));
        Ok(())
    }

    /// Notify every node on `network` that it was rebuilt.
    pub fn regenerate_network(&mut self, network: NetworkId) -> Result<(), PowerError> {
        let nodes = self
            .networks
            .get(network)
            .ok_or(PowerError::UnknownNetwork(network))?
            .nodes()
            .to_vec();
        for node in nodes {
            self.dispatch_node_event(node, NodeEvent::Regenerated(network));
        }
        Ok(())
    }

    /// Fold `absorb` into `keep`. The absorbed network ceases to exist and
    /// its nodes are told they now belong to `keep`.
    pub fn merge_networks(&mut self, keep: NetworkId, absorb: NetworkId) -> Result<(), PowerError> {
        if keep == absorb {
            return Err(PowerError::SameNetwork(keep));
        }
        if !self.networks.contains_key(keep) {
            return Err(PowerError::UnknownNetwork(keep));
        }
        let mut absorbed = self
            .networks
            .remove(absorb)
            .ok_or(PowerError::UnknownNetwork(absorb))?;
        let moved = absorbed.take_nodes();

        let target = &mut self.networks[keep];
        target.energized |= absorbed.energized;
        for &node in &moved {
            target.add_node(node);
        }
        for &node in &moved {
            if let Some(power_node) = self.nodes.get_mut(node) {
                power_node.set_parent(Some(keep));
            }
        }

        tracing::debug!(?keep, ?absorb, nodes = moved.len(), "networks merged");
        for node in moved {
            self.dispatch_node_event(node, NodeEvent::Regenerated(keep));
        }
        Ok(())
    }

    /// Detach every node from `network` and delete it.
    pub fn remove_network(&mut self, network: NetworkId) -> Result<(), PowerError> {
        let nodes = self
            .networks
            .get(network)
            .ok_or(PowerError::UnknownNetwork(network))?
            .nodes()
            .to_vec();
        for node in nodes {
            self.detach_node(node)?;
        }
        self.networks.remove(network);
        Ok(())
    }

    fn dispatch_node_event(&mut self, node: NodeId, event: NodeEvent) {
        let Some(subscribers) = self.nodes.get(node).map(PowerNode::subscribers) else {
            return;
        };
        for device in subscribers {
            if let Err(err) = self.with_device(device, |d, peers| d.handle_node_event(event, peers)) {
                tracing::warn!(?node, ?event, error = %err, "node subscriber missing");
            }
        }
    }

    // -- Simulation --

    /// Advance the power simulation by `elapsed` ticks and return the
    /// events emitted during this step.
    pub fn tick(&mut self, elapsed: Ticks) -> Vec<PowerEvent> {
        self.current_tick += elapsed;

        let (devices, mut peers) = self.split();
        for device in devices.values_mut() {
            let supplied = peers.source_energized(device);
            device.set_external_powered(supplied, &mut peers);
            device.process_internal_power(elapsed, &mut peers);
        }

        self.bus.deliver()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
