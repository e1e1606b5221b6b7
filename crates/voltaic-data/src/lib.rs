//! Data-driven device definitions.
//!
//! Device prototypes are read from a single RON, TOML or JSON file and
//! resolved into [`voltaic_power::DeviceConfig`] values keyed by name.

pub mod loader;
pub mod prototypes;
pub mod schema;

pub use loader::{DataLoadError, Format};
pub use prototypes::{DevicePrototypes, load_device_prototypes, parse_device_prototypes};
