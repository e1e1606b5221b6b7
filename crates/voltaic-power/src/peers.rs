//! The device's window onto its collaborators.
//!
//! A [`PowerDevice`](crate::device::PowerDevice) never owns its provider,
//! network or battery. Every mutating device operation receives a
//! [`PowerPeers`] implementation and resolves collaborators by ID through
//! it, so the device stays the single writer of its own connection state
//! while each source stays the single writer of its own aggregate.

use voltaic_core::id::{DeviceId, NetworkId, NodeId, ProviderId};
use voltaic_core::position::WorldPosition;

use crate::ledger::{LoadLedger, NetworkLedger};
use crate::storage::PowerStorage;

pub trait PowerPeers {
    /// The ledger of a live provider.
    fn provider(&mut self, id: ProviderId) -> Option<&mut dyn LoadLedger>;

    /// World position of a live provider.
    fn provider_position(&self, id: ProviderId) -> Option<WorldPosition>;

    /// The ledger of a live wired network.
    fn network(&mut self, id: NetworkId) -> Option<&mut dyn NetworkLedger>;

    /// The network a node is currently attached to.
    fn node_parent(&self, node: NodeId) -> Option<NetworkId>;

    /// The internal battery of a device, if it has one.
    fn storage(&mut self, device: DeviceId) -> Option<&mut dyn PowerStorage>;

    /// Called once each time a device's combined powered state flips.
    fn powered_changed(&mut self, device: DeviceId, powered: bool);
}
