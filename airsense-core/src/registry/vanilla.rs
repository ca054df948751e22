//! Vanilla registry: feeds that already report physical values.
//!
//! Every definition is a leaf read from the record field of the same name;
//! only validation applies.

use super::{SensorDefinition, SensorTable};
use crate::errors::RegistryError;
use crate::record::DeviceType;

/// Sensor definitions of pre-calibrated feeds
#[derive(Debug, Clone)]
pub struct VanillaRegistry {
    table: SensorTable,
}

impl VanillaRegistry {
    /// Build the registry from the static definitions
    pub fn new() -> Result<Self, RegistryError> {
        Ok(Self {
            table: SensorTable::new(DeviceType::Vanilla, definitions())?,
        })
    }

    /// Validated definitions
    pub fn table(&self) -> &SensorTable {
        &self.table
    }
}

fn passthrough(name: &str, label: &str, unit: &str, min: f64, max: f64) -> SensorDefinition {
    SensorDefinition::output(name, label, unit)
        .with_meta_id("TBD")
        .integer()
        .range(min, max)
}

/// Static vanilla definitions
pub fn definitions() -> Vec<SensorDefinition> {
    vec![
        passthrough("temperature", "Temperatuur", "Celsius", -25.0, 70.0),
        passthrough("pressure", "Luchtdruk", "HectoPascal", 200.0, 1100.0),
        passthrough("humidity", "Luchtvochtigheid", "Procent", 20.0, 100.0),
        passthrough("co", "CO", "ug/m3", 0.0, 10_000.0),
        passthrough("no", "NO", "ug/m3", 0.0, 2_000.0),
        passthrough("no2", "NO2", "ug/m3", 0.0, 250.0),
        passthrough("o3", "O3", "ug/m3", 0.0, 300.0),
        passthrough("pm10", "PM 10", "ug/m3", 0.0, 999.0),
        passthrough("pm2_5", "PM 2.5", "ug/m3", 0.0, 999.0),
        passthrough("pm1", "PM 1", "ug/m3", 0.0, 999.0),
    ]
}
