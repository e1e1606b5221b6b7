//! Configuration-time variants: draw types, priorities and device kinds.

use serde::{Deserialize, Serialize};
use voltaic_core::fixed::Fixed64;

/// Which source kinds a device is eligible to draw from.
///
/// Fixed at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawType {
    /// The device never draws external power.
    None,
    /// Wired network only.
    Node,
    /// Wireless provider only.
    Provider,
    /// Either; a wired network takes precedence.
    #[default]
    Both,
}

impl DrawType {
    /// Whether a node peer is created for this device.
    pub fn uses_node(self) -> bool {
        matches!(self, DrawType::Node | DrawType::Both)
    }

    /// Whether the device may become a provider candidate.
    pub fn uses_provider(self) -> bool {
        matches!(self, DrawType::Provider | DrawType::Both)
    }
}

/// The source that currently owns a device's load registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Connection {
    #[default]
    None,
    Node,
    Provider,
}

/// Ordering hint for networks and providers when supply is contested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// The closed set of device kinds. Each carries its own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// General machinery: wired or wireless, medium priority.
    #[default]
    Appliance,
    /// Lights and similar fixtures: shed first.
    Fixture,
    /// Movable equipment that is never wired in.
    Portable,
    /// Life-critical equipment hard-wired to a network.
    Essential,
}

impl DeviceKind {
    pub fn default_draw_type(self) -> DrawType {
        match self {
            DeviceKind::Appliance | DeviceKind::Fixture => DrawType::Both,
            DeviceKind::Portable => DrawType::Provider,
            DeviceKind::Essential => DrawType::Node,
        }
    }

    pub fn default_priority(self) -> PowerPriority {
        match self {
            DeviceKind::Appliance | DeviceKind::Portable => PowerPriority::Medium,
            DeviceKind::Fixture => PowerPriority::Low,
            DeviceKind::Essential => PowerPriority::High,
        }
    }
}

/// Battery peer attached to a device at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub capacity: Fixed64,
    pub charge: Fixed64,
}

/// Construction-time configuration for a device.
///
/// `draw_type` and `priority` override the kind defaults when set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    pub draw_type: Option<DrawType>,
    pub priority: Option<PowerPriority>,
    pub load: Fixed64,
    pub battery: Option<BatteryConfig>,
}

impl DeviceConfig {
    /// A config of the given kind and load with no overrides.
    pub fn new(kind: DeviceKind, load: Fixed64) -> Self {
        Self {
            kind,
            load,
            ..Self::default()
        }
    }

    pub fn with_draw_type(mut self, draw_type: DrawType) -> Self {
        self.draw_type = Some(draw_type);
        self
    }

    pub fn with_priority(mut self, priority: PowerPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_battery(mut self, capacity: Fixed64, charge: Fixed64) -> Self {
        self.battery = Some(BatteryConfig { capacity, charge });
        self
    }

    pub fn resolved_draw_type(&self) -> DrawType {
        self.draw_type.unwrap_or_else(|| self.kind.default_draw_type())
    }

    pub fn resolved_priority(&self) -> PowerPriority {
        self.priority.unwrap_or_else(|| self.kind.default_priority())
    }
}
