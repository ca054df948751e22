//! Raw-to-Physical Conversion Functions
//!
//! ## Electrochemical Gas Sensors
//!
//! AlphaSense sensors on the AirSensEUR shield produce a current that a
//! trans-impedance amplifier turns into a voltage, sampled by a 16-bit ADC.
//! Getting back to a concentration takes three stages (JRC106095, eq. 1):
//!
//! ```text
//! Stage A  digital -> voltage  V = (Vref - Vref_ad) + (digital + 1) / 2^16 · 2 · Vref_ad
//! Stage B  voltage -> current  I = 10^9 · V / (gain · r_load)            [nA]
//! Stage C  current -> conc.    per-gas linear model, see calibration.rs  [µg/m³]
//! ```
//!
//! Stages A and B only need the static shield params of the channel and
//! always succeed for a well-formed ADC code. Stage C needs the device's
//! calibration coefficients and the latest cached temperature, humidity or
//! NO2, and fails softly when either is missing.
//!
//! ## Uniform Signature
//!
//! Every converter is a plain function
//! `fn(value, &ConversionContext) -> ConversionResult<f64>`; the context
//! carries the source definition, the device id and the two lookups. The
//! registry stores a [`Converter`] tag per definition and the resolver calls
//! through it, so no converter ever touches the cache or the store directly.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    calibration::{CalibrationCoefficients, Gas},
    constants::{ADC_FULL_SCALE, ADC_MAX_DIGITAL, NANO_PER_UNIT, NO2_NOISE_FLOOR_UGM3},
    errors::{ConversionError, ConversionResult, UnobtainableCause},
    record::DeviceId,
    registry::{ElectrochemParams, SensorDefinition},
    traits::{CalibrationLookup, DependencyLookup, Validatable},
};

/// Cached output holding the device temperature (°C)
pub const TEMPERATURE: &str = "temperature";

/// Cached output holding the device relative humidity (%)
pub const HUMIDITY: &str = "humidity";

/// Cached output holding the device NO2 concentration (µg/m³)
pub const NO2: &str = "no2";

/// Everything a converter may look at
pub struct ConversionContext<'a> {
    /// Device being converted
    pub device_id: &'a DeviceId,
    /// Output being computed
    pub name: &'a str,
    /// Definition the input value comes from
    pub source: &'a SensorDefinition,
    /// Cached cross-sensor values of this device
    pub dependencies: &'a dyn DependencyLookup,
    /// Calibration coefficients
    pub calibration: &'a dyn CalibrationLookup,
}

impl ConversionContext<'_> {
    fn dependency(&self, name: &str) -> ConversionResult<f64> {
        self.dependencies
            .dependency(name)
            .map_err(|cause| ConversionError::unobtainable(self.name, cause))
    }

    /// Coefficients of `gas`; a zero or non-finite sensitivity `a1` is malformed
    fn coefficients(&self, gas: Gas) -> ConversionResult<CalibrationCoefficients> {
        let coefficients = self.calibration.coefficients(self.device_id, gas).ok_or_else(|| {
            ConversionError::unobtainable(self.name, UnobtainableCause::MissingCalibration { gas })
        })?;

        if coefficients.a1 == 0.0 || !coefficients.a1.is_valid() {
            return Err(ConversionError::malformed(
                self.name,
                format!("{} calibration of device {} has sensitivity a1 = {}", gas, self.device_id, coefficients.a1),
            ));
        }
        Ok(coefficients)
    }

    fn incomplete(&self, gas: Gas) -> ConversionError {
        ConversionError::unobtainable(self.name, UnobtainableCause::IncompleteCalibration { gas, coefficient: "a3" })
    }
}

/// Signature shared by all converters
pub type ConverterFn = fn(f64, &ConversionContext<'_>) -> ConversionResult<f64>;

/// Named converter registered on a sensor definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Converter {
    /// Value already in final units
    Identity,
    /// Stages A and B: ADC code to sensor current (nA)
    DigitalToNanoAmpere,
    /// Stage C for CO, needs humidity
    NanoAmpereToCo,
    /// Stage C for NO, needs temperature
    NanoAmpereToNo,
    /// Stage C for NO2, needs temperature
    NanoAmpereToNo2,
    /// Stage C for O3, needs temperature and the device's NO2
    NanoAmpereToO3,
}

impl Converter {
    /// Function implementing this converter
    pub fn function(&self) -> ConverterFn {
        match self {
            Self::Identity => identity,
            Self::DigitalToNanoAmpere => digital_to_nano_ampere,
            Self::NanoAmpereToCo => nano_ampere_to_co,
            Self::NanoAmpereToNo => nano_ampere_to_no,
            Self::NanoAmpereToNo2 => nano_ampere_to_no2,
            Self::NanoAmpereToO3 => nano_ampere_to_o3,
        }
    }

    /// Cached outputs this converter reads
    pub fn dependencies(&self) -> &'static [&'static str] {
        match self {
            Self::Identity | Self::DigitalToNanoAmpere => &[],
            Self::NanoAmpereToCo => &[HUMIDITY],
            Self::NanoAmpereToNo | Self::NanoAmpereToNo2 => &[TEMPERATURE],
            Self::NanoAmpereToO3 => &[TEMPERATURE, NO2],
        }
    }

    /// Gas whose calibration this converter uses
    pub fn gas(&self) -> Option<Gas> {
        match self {
            Self::NanoAmpereToCo => Some(Gas::Co),
            Self::NanoAmpereToNo => Some(Gas::No),
            Self::NanoAmpereToNo2 => Some(Gas::No2),
            Self::NanoAmpereToO3 => Some(Gas::O3),
            Self::Identity | Self::DigitalToNanoAmpere => None,
        }
    }

    /// True when the source definition must carry shield params
    pub fn needs_params(&self) -> bool {
        matches!(self, Self::DigitalToNanoAmpere)
    }

    /// Run the converter; non-finite results are rejected as malformed
    pub fn apply(&self, value: f64, ctx: &ConversionContext<'_>) -> ConversionResult<f64> {
        let converted = (self.function())(value, ctx)?;
        if !converted.is_valid() {
            return Err(ConversionError::malformed(
                ctx.name,
                format!("{:?} produced a non-finite value from {}", self, value),
            ));
        }
        Ok(converted)
    }
}

// ===== STAGE A/B: PURE PHYSICS =====

/// Stage A: ADC code to voltage (V)
pub fn digital_to_voltage(digital: f64, params: &ElectrochemParams) -> f64 {
    (params.v_ref - params.v_ref_ad) + (digital + 1.0) / ADC_FULL_SCALE * 2.0 * params.v_ref_ad
}

/// Stage B: voltage to current (nA)
pub fn voltage_to_nano_ampere(voltage: f64, params: &ElectrochemParams) -> f64 {
    NANO_PER_UNIT * voltage / (params.gain * params.r_load)
}

/// Stages A and B combined
pub fn digital_to_current(digital: f64, params: &ElectrochemParams) -> f64 {
    voltage_to_nano_ampere(digital_to_voltage(digital, params), params)
}

// ===== STAGE C: PURE MODELS =====

/// CO (µg/m³) from current and relative humidity
pub fn co_from_current(current: f64, c: &CalibrationCoefficients, humidity: f64) -> f64 {
    (current - c.a0 - c.a2 * humidity) / c.a1
}

/// NO (µg/m³) from current and temperature, `None` without `a3`
pub fn no_from_current(current: f64, c: &CalibrationCoefficients, temperature: f64) -> Option<f64> {
    let a3 = c.a3?;
    Some((current - c.a0 - c.a2 * temperature - a3 * temperature * temperature) / c.a1)
}

/// NO2 (µg/m³) from current and temperature
pub fn no2_from_current(current: f64, c: &CalibrationCoefficients, temperature: f64) -> f64 {
    (current - c.a0 - c.a2 * temperature) / c.a1
}

/// O3 (µg/m³) from current, the device's NO2 and temperature, `None` without `a3`
pub fn o3_from_current(current: f64, c: &CalibrationCoefficients, no2: f64, temperature: f64) -> Option<f64> {
    let a3 = c.a3?;
    Some((current - c.a0 - c.a2 * no2 - a3 * temperature) / c.a1)
}

// ===== CONVERTERS =====

fn identity(value: f64, _ctx: &ConversionContext<'_>) -> ConversionResult<f64> {
    Ok(value)
}

fn digital_to_nano_ampere(value: f64, ctx: &ConversionContext<'_>) -> ConversionResult<f64> {
    let params = ctx.source.params.as_ref().ok_or_else(|| {
        ConversionError::malformed(ctx.name, format!("'{}' has no electrochemical params", ctx.source.name))
    })?;

    if !(0.0..=ADC_MAX_DIGITAL).contains(&value) {
        return Err(ConversionError::malformed(
            ctx.name,
            format!("digital value {} outside ADC range [0, {}]", value, ADC_MAX_DIGITAL),
        ));
    }

    Ok(digital_to_current(value, params))
}

fn nano_ampere_to_co(current: f64, ctx: &ConversionContext<'_>) -> ConversionResult<f64> {
    let coefficients = ctx.coefficients(Gas::Co)?;
    let humidity = ctx.dependency(HUMIDITY)?;
    Ok(co_from_current(current, &coefficients, humidity))
}

fn nano_ampere_to_no(current: f64, ctx: &ConversionContext<'_>) -> ConversionResult<f64> {
    let coefficients = ctx.coefficients(Gas::No)?;
    if coefficients.a3.is_none() {
        return Err(ctx.incomplete(Gas::No));
    }
    let temperature = ctx.dependency(TEMPERATURE)?;
    no_from_current(current, &coefficients, temperature).ok_or_else(|| ctx.incomplete(Gas::No))
}

fn nano_ampere_to_no2(current: f64, ctx: &ConversionContext<'_>) -> ConversionResult<f64> {
    let coefficients = ctx.coefficients(Gas::No2)?;
    let temperature = ctx.dependency(TEMPERATURE)?;
    let no2 = no2_from_current(current, &coefficients, temperature);

    if !no2.is_valid() {
        return Err(ConversionError::malformed(
            ctx.name,
            format!("NO2 model produced a non-finite value from {} nA", current),
        ));
    }
    if no2 < NO2_NOISE_FLOOR_UGM3 {
        return Err(ConversionError::unobtainable(
            ctx.name,
            UnobtainableCause::BelowNoiseFloor {
                value: no2,
                floor: NO2_NOISE_FLOOR_UGM3,
            },
        ));
    }

    Ok(no2)
}

fn nano_ampere_to_o3(current: f64, ctx: &ConversionContext<'_>) -> ConversionResult<f64> {
    let coefficients = ctx.coefficients(Gas::O3)?;
    if coefficients.a3.is_none() {
        return Err(ctx.incomplete(Gas::O3));
    }
    let temperature = ctx.dependency(TEMPERATURE)?;
    let no2 = ctx.dependency(NO2)?;
    o3_from_current(current, &coefficients, no2, temperature).ok_or_else(|| ctx.incomplete(Gas::O3))
}
