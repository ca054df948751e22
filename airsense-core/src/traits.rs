//! Core traits
//!
//! These define the seams between the resolver and its collaborators:
//! registries per device type, the lookups converters read from, and range
//! validators.

use std::collections::BTreeMap;

use crate::calibration::{CalibrationCoefficients, Gas};
use crate::errors::{ConversionResult, UnobtainableCause};
use crate::record::{DeviceId, DeviceType, Record};
use crate::registry::SensorDefinition;

/// Capability shared by every device type's registry
pub trait SensorRegistry {
    /// Device type this registry describes
    fn device_type(&self) -> DeviceType;

    /// Definition by name, or `UnknownSensor`
    fn get_sensor_def(&self, name: &str) -> ConversionResult<&SensorDefinition>;

    /// All definitions of this device type
    fn get_sensor_defs(&self) -> &BTreeMap<String, SensorDefinition>;

    /// Cheap check whether a conversion of `name` may be attempted.
    ///
    /// Only tells that a registry entry exists; the conversion can still end
    /// up unobtainable or out of range.
    fn can_resolve(&self, name: &str, record: &Record) -> bool;
}

/// Cross-sensor values available to a converter
pub trait DependencyLookup {
    /// Latest usable value of output `name` for the device being converted
    fn dependency(&self, name: &str) -> Result<f64, UnobtainableCause>;
}

/// Calibration coefficients available to a converter
pub trait CalibrationLookup {
    /// Coefficients for a device and gas, `None` when uncalibrated
    fn coefficients(&self, device_id: &DeviceId, gas: Gas) -> Option<CalibrationCoefficients>;
}

/// Range validator for converted values
pub trait Validator {
    /// The type of value this validator handles
    type Value;

    /// Validate a single value of field `name`
    fn validate(&self, name: &str, value: Self::Value) -> ConversionResult<()>;

    /// Bounds enforced by this validator
    fn constraints(&self) -> ValidatorConstraints;
}

/// Inclusive bounds; `None` means unbounded on that side
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValidatorConstraints {
    /// Minimum valid value
    pub min_value: Option<f64>,

    /// Maximum valid value
    pub max_value: Option<f64>,
}

/// Values that can be checked for numeric sanity
pub trait Validatable {
    /// Check if the value is a real number (not NaN or infinite)
    fn is_valid(&self) -> bool;
}

impl Validatable for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl Validatable for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}
