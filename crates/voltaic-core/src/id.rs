use slotmap::new_key_type;

new_key_type! {
    /// Identifies a power-consuming device.
    pub struct DeviceId;

    /// Identifies a wireless power provider.
    pub struct ProviderId;

    /// Identifies a wired power network ("powernet").
    pub struct NetworkId;

    /// Identifies a node: the per-device adapter onto a wired network.
    pub struct NodeId;
}
