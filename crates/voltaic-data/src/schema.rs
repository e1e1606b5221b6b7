//! On-disk shapes of device prototype files.

use serde::Deserialize;

/// One device prototype.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceData {
    pub name: String,
    #[serde(default)]
    pub kind: KindData,
    #[serde(default)]
    pub draw_type: Option<DrawTypeData>,
    pub load: f64,
    #[serde(default)]
    pub priority: Option<PriorityData>,
    #[serde(default)]
    pub battery: Option<BatteryData>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindData {
    #[default]
    Appliance,
    Fixture,
    Portable,
    Essential,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawTypeData {
    None,
    Node,
    Provider,
    Both,
}

/// Priority level for contested supply.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityData {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatteryData {
    pub capacity: f64,
    /// Starting charge; a full battery when omitted.
    #[serde(default)]
    pub charge: Option<f64>,
}
