//! Nodes: per-device adapters onto the wired network.
//!
//! A node knows which network it is currently part of and notifies its
//! subscribers when that changes. Subscriptions are handed out as
//! [`NodeSubscription`] tokens; the token is consumed when released, so a
//! device cannot be notified after it has let go of its node.

use voltaic_core::id::{DeviceId, NetworkId};

/// Topology notification raised by a node. Carries the network concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// The node joined `network`.
    Connected(NetworkId),
    /// The node left `network`.
    Disconnected(NetworkId),
    /// `network` was rebuilt after a topology edit; the node is still on it.
    Regenerated(NetworkId),
}

/// Handle for a device's subscription to a node. Not clonable.
#[derive(Debug, PartialEq, Eq)]
pub struct NodeSubscription {
    id: u64,
}

#[derive(Debug, Clone)]
struct Subscriber {
    id: u64,
    device: DeviceId,
}

/// A device's attachment point onto the wired network.
#[derive(Debug, Clone, Default)]
pub struct PowerNode {
    parent: Option<NetworkId>,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
}

impl PowerNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// The network this node is currently attached to.
    pub fn parent(&self) -> Option<NetworkId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NetworkId>) {
        self.parent = parent;
    }

    pub fn subscribe(&mut self, device: DeviceId) -> NodeSubscription {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push(Subscriber { id, device });
        NodeSubscription { id }
    }

    /// Release a subscription. Returns whether it was still registered.
    pub fn unsubscribe(&mut self, subscription: NodeSubscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != subscription.id);
        self.subscribers.len() != before
    }

    /// Devices to notify, in subscription order.
    pub fn subscribers(&self) -> Vec<DeviceId> {
        self.subscribers.iter().map(|s| s.device).collect()
    }
}
