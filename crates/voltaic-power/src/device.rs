//! The per-device power state machine.
//!
//! A [`PowerDevice`] decides which of {wired network, wireless provider,
//! nothing} currently carries its load, and keeps that source's ledger in
//! step with its own state. Its internal battery is a fallback that is
//! evaluated once per tick.
//!
//! # Invariants
//!
//! - `connected == Node` implies `provider == None`.
//! - `connected == None` implies no source has the device registered.
//! - At most one source carries the device's load at any instant: the old
//!   source is always released before a new one is registered.
//! - `powered == external_powered || internal_powered` after every write.

use voltaic_core::fixed::{Fixed64, Ticks, energy_over};
use voltaic_core::id::{DeviceId, NetworkId, NodeId, ProviderId};
use voltaic_core::position::WorldPosition;

use crate::draw::{Connection, DeviceConfig, DeviceKind, DrawType, PowerPriority};
use crate::node::NodeEvent;
use crate::peers::PowerPeers;

/// Text shown when examining an unpowered device.
pub const NOT_POWERED_TEXT: &str = "The device is not powered.";

#[derive(Debug, Clone)]
pub struct PowerDevice {
    id: DeviceId,
    kind: DeviceKind,
    draw_type: DrawType,
    priority: PowerPriority,
    connected: Connection,
    provider: Option<ProviderId>,
    /// The network holding this device's registration while node-connected.
    network: Option<NetworkId>,
    available_providers: Vec<ProviderId>,
    load: Fixed64,
    external_powered: bool,
    internal_powered: bool,
    powered: bool,
    position: WorldPosition,
    node: Option<NodeId>,
    deleted: bool,
}

impl PowerDevice {
    pub fn new(id: DeviceId, config: &DeviceConfig, position: WorldPosition) -> Self {
        Self {
            id,
            kind: config.kind,
            draw_type: config.resolved_draw_type(),
            priority: config.resolved_priority(),
            connected: Connection::None,
            provider: None,
            network: None,
            available_providers: Vec::new(),
            load: config.load.max(Fixed64::ZERO),
            external_powered: false,
            internal_powered: false,
            powered: false,
            position,
            node: None,
            deleted: false,
        }
    }

    // -- Accessors --

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn draw_type(&self) -> DrawType {
        self.draw_type
    }

    pub fn priority(&self) -> PowerPriority {
        self.priority
    }

    pub fn connected(&self) -> Connection {
        self.connected
    }

    pub fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    pub fn network(&self) -> Option<NetworkId> {
        self.network
    }

    pub fn available_providers(&self) -> &[ProviderId] {
        &self.available_providers
    }

    pub fn load(&self) -> Fixed64 {
        self.load
    }

    pub fn external_powered(&self) -> bool {
        self.external_powered
    }

    pub fn internal_powered(&self) -> bool {
        self.internal_powered
    }

    pub fn powered(&self) -> bool {
        self.powered
    }

    pub fn position(&self) -> WorldPosition {
        self.position
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Examine text: a "not powered" notice, or nothing.
    pub fn examine_text(&self) -> Option<&'static str> {
        (!self.powered).then_some(NOT_POWERED_TEXT)
    }

    /// Bind the node this device listens to for network events.
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeId>) {
        self.node = node;
    }

    pub(crate) fn set_position(&mut self, position: WorldPosition) {
        self.position = position;
    }

    // -- Provider candidates --

    /// A provider came into range.
    pub fn add_provider<P: PowerPeers>(&mut self, provider: ProviderId, peers: &mut P) {
        if !self.available_providers.contains(&provider) {
            self.available_providers.push(provider);
        }
        if self.connected != Connection::Node {
            self.connect_to_best_provider(peers);
        }
    }

    /// A provider went out of range or disappeared. Unknown providers are ignored.
    pub fn remove_provider<P: PowerPeers>(&mut self, provider: ProviderId, peers: &mut P) {
        let Some(index) = self.available_providers.iter().position(|p| *p == provider) else {
            return;
        };
        self.available_providers.remove(index);

        if self.provider == Some(provider) {
            self.set_provider(None, peers);
            self.set_external_powered(false, peers);
        }
        if self.connected != Connection::Node {
            self.connect_to_best_provider(peers);
        }
    }

    /// Pick the provider this device should draw from and switch to it.
    ///
    /// With no current provider the first candidate wins. Otherwise the
    /// nearest candidate wins, ties going to the earliest in the list.
    pub fn connect_to_best_provider<P: PowerPeers>(&mut self, peers: &mut P) {
        if self.deleted
            || self.available_providers.is_empty()
            || self.connected == Connection::Node
        {
            return;
        }

        let best = if self.connected != Connection::Provider {
            Some(self.available_providers[0])
        } else {
            self.nearest_provider(peers)
        };

        if best.is_some() && best != self.provider {
            self.set_provider(best, peers);
        }
    }

    fn nearest_provider<P: PowerPeers>(&self, peers: &P) -> Option<ProviderId> {
        let mut best: Option<(ProviderId, Fixed64)> = None;
        for &candidate in &self.available_providers {
            let Some(position) = peers.provider_position(candidate) else {
                continue;
            };
            let distance = self.position.distance_squared(&position);
            if best.is_none_or(|(_, nearest)| distance < nearest) {
                best = Some((candidate, distance));
            }
        }
        best.map(|(provider, _)| provider)
    }

    /// The only place the provider link changes.
    ///
    /// `connected` is set to `Provider` on every call, before anything else,
    /// and falls back to `None` when no provider ends up linked.
    pub fn set_provider<P: PowerPeers>(&mut self, provider: Option<ProviderId>, peers: &mut P) {
        self.connected = Connection::Provider;

        if let Some(old) = self.provider.take() {
            if let Some(ledger) = peers.provider(old) {
                ledger.remove_device(self.id);
            }
        }

        let linked = provider.and_then(|new| match peers.provider(new) {
            Some(ledger) => {
                ledger.add_device(self.id, self.load);
                Some(new)
            }
            None => {
                tracing::warn!(device = ?self.id, provider = ?new, "cannot link to missing provider");
                None
            }
        });

        self.provider = linked;
        match linked {
            Some(provider) => {
                tracing::debug!(device = ?self.id, ?provider, "device drawing from provider");
            }
            None => self.connected = Connection::None,
        }
    }

    // -- Wired network --

    /// React to a topology notification from this device's node.
    pub fn handle_node_event<P: PowerPeers>(&mut self, event: NodeEvent, peers: &mut P) {
        match event {
            NodeEvent::Connected(network) => self.on_network_connected(network, peers),
            NodeEvent::Disconnected(network) => self.on_network_disconnected(network, peers),
            NodeEvent::Regenerated(network) => self.on_network_regenerated(network, peers),
        }
    }

    fn on_network_connected<P: PowerPeers>(&mut self, network: NetworkId, peers: &mut P) {
        self.set_provider(None, peers);
        self.leave_network(peers);

        match peers.network(network) {
            Some(ledger) => {
                ledger.add_device(self.id, self.load);
                self.connected = Connection::Node;
                self.network = Some(network);
                tracing::debug!(device = ?self.id, ?network, "device drawing from network");
            }
            None => {
                tracing::warn!(device = ?self.id, ?network, "connected to missing network");
                self.connect_to_best_provider(peers);
            }
        }
    }

    fn on_network_disconnected<P: PowerPeers>(&mut self, network: NetworkId, peers: &mut P) {
        if self.network != Some(network) {
            if let Some(ledger) = peers.network(network) {
                ledger.remove_device(self.id);
            }
        }
        self.leave_network(peers);
        if self.connected == Connection::Node {
            self.connected = Connection::None;
            tracing::debug!(device = ?self.id, ?network, "device lost network");
        }
        self.connect_to_best_provider(peers);
    }

    fn on_network_regenerated<P: PowerPeers>(&mut self, network: NetworkId, peers: &mut P) {
        if self.connected != Connection::Node {
            // A node only regenerates while attached; treat it as a fresh attach.
            self.on_network_connected(network, peers);
            return;
        }
        if self.network != Some(network) {
            self.leave_network(peers);
            self.network = Some(network);
        }
        match peers.network(network) {
            Some(ledger) => {
                if !ledger.has_device(self.id) {
                    ledger.add_device(self.id, self.load);
                }
            }
            None => {
                tracing::warn!(device = ?self.id, ?network, "regenerated onto missing network");
            }
        }
    }

    /// Drop the registration held by the recorded network, if any.
    fn leave_network<P: PowerPeers>(&mut self, peers: &mut P) {
        let Some(previous) = self.network.take() else {
            return;
        };
        if let Some(ledger) = peers.network(previous) {
            ledger.remove_device(self.id);
        }
    }

    // -- Load --

    /// Change the draw and report the delta to whichever source carries it.
    ///
    /// Negative values are clamped to zero. While unconnected the new value
    /// is only stored; it is reported when a source registers the device.
    pub fn set_load<P: PowerPeers>(&mut self, load: Fixed64, peers: &mut P) {
        let load = load.max(Fixed64::ZERO);
        let old_load = std::mem::replace(&mut self.load, load);

        match self.connected {
            Connection::Node => {
                let Some(network) = self.network else {
                    return;
                };
                if let Some(ledger) = peers.network(network) {
                    ledger.update_device(self.id, old_load, load);
                }
            }
            Connection::Provider => {
                let Some(provider) = self.provider else {
                    return;
                };
                if let Some(ledger) = peers.provider(provider) {
                    ledger.update_device(self.id, old_load, load);
                }
            }
            Connection::None => {}
        }
    }

    // -- Powered state --

    pub fn set_external_powered<P: PowerPeers>(&mut self, powered: bool, peers: &mut P) {
        self.external_powered = powered;
        self.refresh_powered(peers);
    }

    pub fn set_internal_powered<P: PowerPeers>(&mut self, powered: bool, peers: &mut P) {
        self.internal_powered = powered;
        self.refresh_powered(peers);
    }

    fn refresh_powered<P: PowerPeers>(&mut self, peers: &mut P) {
        let powered = self.external_powered || self.internal_powered;
        if powered != self.powered {
            self.powered = powered;
            peers.powered_changed(self.id, powered);
        }
    }

    /// Battery fallback, run once per tick.
    ///
    /// `internal_powered` means the battery *could* cover the load right
    /// now. Charge is only drawn when no external source is powering the
    /// device.
    pub fn process_internal_power<P: PowerPeers>(&mut self, elapsed: Ticks, peers: &mut P) {
        let demand = energy_over(self.load, elapsed);
        let external = self.external_powered;

        let covered = match peers.storage(self.id) {
            Some(storage) if storage.can_deduct_charge(demand) => {
                if !external {
                    storage.deduct_charge(demand);
                }
                true
            }
            _ => false,
        };

        if covered != self.internal_powered {
            tracing::trace!(device = ?self.id, covered, "internal power changed");
        }
        self.set_internal_powered(covered, peers);
    }

    // -- Teardown --

    /// Release every source registration before the device goes away.
    pub fn shutdown<P: PowerPeers>(&mut self, peers: &mut P) {
        self.deleted = true;

        if self.connected == Connection::Node {
            self.leave_network(peers);
            self.connected = Connection::None;
        }
        self.set_provider(None, peers);
        self.available_providers.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
