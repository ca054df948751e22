//! Sensor catalogue export
//!
//! Upstream adapters use the catalogue to discover which fields a device
//! type accepts and in which units, before ingesting anything.

use airsense_core::{SensorDefinition, SensorKind, SensorRegistry, ValueType};
use serde::Serialize;

use crate::SchemaError;

/// One catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogueEntry {
    /// Sensor or output name
    pub name: String,
    /// Display label
    pub label: String,
    /// Unit of accepted values
    pub unit: String,
    /// Names this entry is derived from
    pub inputs: Vec<String>,
    /// Raw channel or output
    pub kind: SensorKind,
    /// Integer or real
    pub value_type: ValueType,
    /// Inclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Datasheet identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_id: Option<String>,
}

impl From<&SensorDefinition> for CatalogueEntry {
    fn from(def: &SensorDefinition) -> Self {
        Self {
            name: def.name.clone(),
            label: def.label.clone(),
            unit: def.unit.clone(),
            inputs: def.inputs.clone(),
            kind: def.kind,
            value_type: def.value_type,
            min: def.min,
            max: def.max,
            meta_id: def.meta_id.clone(),
        }
    }
}

/// Catalogue of one device type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorCatalogue {
    /// Device type name
    pub device_type: String,
    /// Entries sorted by name
    pub sensors: Vec<CatalogueEntry>,
}

/// Build the catalogue of a registry
pub fn sensor_catalogue<R: SensorRegistry + ?Sized>(registry: &R) -> SensorCatalogue {
    SensorCatalogue {
        device_type: registry.device_type().to_string(),
        sensors: registry.get_sensor_defs().values().map(CatalogueEntry::from).collect(),
    }
}

/// Catalogue of a registry as pretty JSON
pub fn catalogue_json<R: SensorRegistry + ?Sized>(registry: &R) -> Result<String, SchemaError> {
    serde_json::to_string_pretty(&sensor_catalogue(registry)).map_err(|e| SchemaError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsense_core::{DeviceRegistry, DeviceType};

    #[test]
    fn vanilla_catalogue() {
        let registry = DeviceRegistry::for_type(DeviceType::Vanilla).unwrap();
        let catalogue = sensor_catalogue(&registry);

        assert_eq!(catalogue.device_type, "vanilla");
        assert_eq!(catalogue.sensors.len(), 10);

        let pm10 = catalogue.sensors.iter().find(|s| s.name == "pm10").unwrap();
        assert_eq!(pm10.label, "PM 10");
        assert_eq!(pm10.max, Some(999.0));
    }

    #[test]
    fn ase_catalogue_json() {
        let registry = DeviceRegistry::for_type(DeviceType::AirSensEur).unwrap();
        let json: serde_json::Value = serde_json::from_str(&catalogue_json(&registry).unwrap()).unwrap();

        assert_eq!(json["device_type"], "ase");
        let no2 = json["sensors"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == "no2")
            .unwrap();
        assert_eq!(no2["inputs"][0], "no2raw");
        assert_eq!(no2["value_type"], "integer");
        assert_eq!(no2["kind"], "output");
    }
}
