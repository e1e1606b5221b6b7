use voltaic_core::id::{DeviceId, NetworkId, NodeId, ProviderId};

/// Errors returned by [`PowerModule`](crate::module::PowerModule) entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PowerError {
    #[error("unknown device: {0:?}")]
    UnknownDevice(DeviceId),
    #[error("unknown provider: {0:?}")]
    UnknownProvider(ProviderId),
    #[error("unknown network: {0:?}")]
    UnknownNetwork(NetworkId),
    #[error("unknown node: {0:?}")]
    UnknownNode(NodeId),
    #[error("cannot merge network {0:?} into itself")]
    SameNetwork(NetworkId),
}
