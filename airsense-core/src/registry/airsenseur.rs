//! AirSensEUR registry
//!
//! Raw ADC channels of the four AlphaSense sensors feed Stage A/B current
//! outputs (`coraw`, `noraw`, `no2raw`, `o3raw`), which feed the calibrated
//! concentrations. Meteo channels pass through unchanged.

use super::{ElectrochemParams, SensorDefinition, SensorTable};
use crate::constants::electrochem::{
    ADC_MAX_DIGITAL, ASE_GAIN, ASE_R_LOAD_OHM, ASE_V_REF_AD, ASE_V_REF_CO_A4, ASE_V_REF_NO2_B43F,
    ASE_V_REF_NO_B4, ASE_V_REF_OX_A431,
};
use crate::converters::Converter;
use crate::errors::RegistryError;
use crate::record::DeviceType;

const VENDOR: &str = "AlphaSense";
const CURRENT_MAX_NA: f64 = 10_000.0;

/// Sensor definitions of AirSensEUR stations
#[derive(Debug, Clone)]
pub struct AirSensEurRegistry {
    table: SensorTable,
}

impl AirSensEurRegistry {
    /// Build the registry from the static definitions
    pub fn new() -> Result<Self, RegistryError> {
        Ok(Self {
            table: SensorTable::new(DeviceType::AirSensEur, definitions())?,
        })
    }

    /// Validated definitions
    pub fn table(&self) -> &SensorTable {
        &self.table
    }
}

fn shield(v_ref: f64) -> ElectrochemParams {
    ElectrochemParams {
        v_ref,
        v_ref_ad: ASE_V_REF_AD,
        gain: ASE_GAIN,
        r_load: ASE_R_LOAD_OHM,
    }
}

fn adc_channel(name: &str, label: &str, v_ref: f64) -> SensorDefinition {
    SensorDefinition::raw(name, label, "digital")
        .with_meta_id(name)
        .with_vendor(VENDOR)
        .with_params(shield(v_ref))
        .integer()
        .range(0.0, ADC_MAX_DIGITAL)
}

fn current(name: &str, label: &str, channel: &str) -> SensorDefinition {
    SensorDefinition::output(name, label, "nanoAmpere")
        .from_input(channel, Converter::DigitalToNanoAmpere)
        .range(0.0, CURRENT_MAX_NA)
}

fn concentration(name: &str, label: &str, current: &str, converter: Converter, meta_id: &str, max: f64) -> SensorDefinition {
    SensorDefinition::output(name, label, "ug/m3")
        .from_input(current, converter)
        .with_meta_id(meta_id)
        .integer()
        .range(0.0, max)
}

/// Static AirSensEUR definitions
pub fn definitions() -> Vec<SensorDefinition> {
    vec![
        // Raw ADC channels
        adc_channel("COA4", "CORaw", ASE_V_REF_CO_A4),
        adc_channel("NOB4", "NORaw", ASE_V_REF_NO_B4),
        adc_channel("NO2B43F", "NO2Raw", ASE_V_REF_NO2_B43F),
        adc_channel("OX_A431", "OX_A431", ASE_V_REF_OX_A431),
        // Raw meteo channels
        SensorDefinition::raw("Tempe", "Temperatuur", "Celsius").range(-25.0, 60.0),
        SensorDefinition::raw("Press", "Luchtdruk", "HectoPascal").range(200.0, 1100.0),
        SensorDefinition::raw("Humid", "Relative Humidity", "%RH").range(20.0, 100.0),
        // Meteo outputs
        SensorDefinition::output("temperature", "Temperatuur", "Celsius")
            .from_input("Tempe", Converter::Identity)
            .with_meta_id("ase-Tempe")
            .integer()
            .range(-25.0, 70.0),
        SensorDefinition::output("pressure", "Luchtdruk", "HectoPascal")
            .from_input("Press", Converter::Identity)
            .with_meta_id("ase-Press")
            .integer()
            .range(200.0, 1100.0),
        SensorDefinition::output("humidity", "Luchtvochtigheid", "Procent")
            .from_input("Humid", Converter::Identity)
            .with_meta_id("ase-Humid")
            .integer()
            .range(20.0, 100.0),
        // Stage A/B
        current("coraw", "CORaw", "COA4"),
        current("noraw", "NORaw", "NOB4"),
        current("no2raw", "NO2Raw", "NO2B43F"),
        current("o3raw", "O3Raw", "OX_A431"),
        // Stage C
        concentration("co", "CO", "coraw", Converter::NanoAmpereToCo, "COA4", 10_000.0),
        concentration("no", "NO", "noraw", Converter::NanoAmpereToNo, "NOB4", 200.0),
        concentration("no2", "NO2", "no2raw", Converter::NanoAmpereToNo2, "NO2B43F", 200.0),
        concentration("o3", "O3", "o3raw", Converter::NanoAmpereToO3, "OX_A431", 1_000.0),
    ]
}
