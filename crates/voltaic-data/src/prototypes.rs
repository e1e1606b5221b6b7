//! Resolution of device prototype files into [`DeviceConfig`] values.

use std::collections::BTreeMap;
use std::path::Path;

use voltaic_core::fixed::{Fixed64, f64_to_fixed64};
use voltaic_power::{BatteryConfig, DeviceConfig, DeviceKind, DrawType, PowerPriority};

use crate::loader::{DataLoadError, Format, deserialize_list, deserialize_list_str};
use crate::schema::{BatteryData, DeviceData, DrawTypeData, KindData, PriorityData};

/// TOML files hold their prototypes under `[[device]]`.
const TOML_KEY: &str = "device";

/// Named device configurations, ready to hand to
/// [`voltaic_power::PowerModule::spawn_device`].
#[derive(Debug, Clone, Default)]
pub struct DevicePrototypes {
    by_name: BTreeMap<String, DeviceConfig>,
}

impl DevicePrototypes {
    pub fn get(&self, name: &str) -> Option<&DeviceConfig> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Prototype names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceConfig)> {
        self.by_name.iter().map(|(name, config)| (name.as_str(), config))
    }
}

/// Load device prototypes from a `.ron`, `.toml` or `.json` file.
pub fn load_device_prototypes(path: &Path) -> Result<DevicePrototypes, DataLoadError> {
    let entries: Vec<DeviceData> = deserialize_list(path, TOML_KEY)?;
    let prototypes = resolve(entries, path)?;
    tracing::debug!(file = %path.display(), count = prototypes.len(), "loaded device prototypes");
    Ok(prototypes)
}

/// Parse device prototypes from an in-memory string. `origin` labels errors.
pub fn parse_device_prototypes(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<DevicePrototypes, DataLoadError> {
    let entries: Vec<DeviceData> = deserialize_list_str(content, format, TOML_KEY, origin)?;
    resolve(entries, origin)
}

fn resolve(entries: Vec<DeviceData>, file: &Path) -> Result<DevicePrototypes, DataLoadError> {
    let mut by_name = BTreeMap::new();
    for entry in entries {
        let config = to_config(&entry, file)?;
        if by_name.contains_key(&entry.name) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: entry.name,
            });
        }
        by_name.insert(entry.name, config);
    }
    Ok(DevicePrototypes { by_name })
}

fn to_config(entry: &DeviceData, file: &Path) -> Result<DeviceConfig, DataLoadError> {
    let invalid = |detail: String| DataLoadError::Invalid {
        file: file.to_path_buf(),
        name: entry.name.clone(),
        detail,
    };

    if entry.name.trim().is_empty() {
        return Err(invalid("name must not be empty".to_string()));
    }
    let load = non_negative(entry.load, "load").map_err(invalid)?;

    let mut config = DeviceConfig::new(kind(entry.kind), load);
    config.draw_type = entry.draw_type.map(draw_type);
    config.priority = entry.priority.map(priority);
    config.battery = entry
        .battery
        .as_ref()
        .map(battery)
        .transpose()
        .map_err(invalid)?;
    Ok(config)
}

fn non_negative(value: f64, field: &str) -> Result<Fixed64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{field} must be a non-negative number, got {value}"));
    }
    if value > Fixed64::MAX.to_num::<f64>() {
        return Err(format!("{field} is too large: {value}"));
    }
    Ok(f64_to_fixed64(value))
}

fn battery(data: &BatteryData) -> Result<BatteryConfig, String> {
    let capacity = non_negative(data.capacity, "battery capacity")?;
    let charge = match data.charge {
        Some(charge) => non_negative(charge, "battery charge")?,
        None => capacity,
    };
    if charge > capacity {
        return Err(format!(
            "battery charge {} exceeds capacity {}",
            data.charge.unwrap_or_default(),
            data.capacity
        ));
    }
    Ok(BatteryConfig { capacity, charge })
}

fn kind(data: KindData) -> DeviceKind {
    match data {
        KindData::Appliance => DeviceKind::Appliance,
        KindData::Fixture => DeviceKind::Fixture,
        KindData::Portable => DeviceKind::Portable,
        KindData::Essential => DeviceKind::Essential,
    }
}

fn draw_type(data: DrawTypeData) -> DrawType {
    match data {
        DrawTypeData::None => DrawType::None,
        DrawTypeData::Node => DrawType::Node,
        DrawTypeData::Provider => DrawType::Provider,
        DrawTypeData::Both => DrawType::Both,
    }
}

fn priority(data: PriorityData) -> PowerPriority {
    match data {
        PriorityData::High => PowerPriority::High,
        PriorityData::Medium => PowerPriority::Medium,
        PriorityData::Low => PowerPriority::Low,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
