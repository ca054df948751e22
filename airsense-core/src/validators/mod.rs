//! Range Validators
//!
//! ## Overview
//!
//! Every converted value is checked against the inclusive `[min, max]`
//! bounds of its [`SensorDefinition`] before it is accepted. A missing
//! bound means "no bound on that side".
//!
//! Rejection is per field: the value is neither cached nor emitted, and the
//! remaining fields of the record are still processed.
//!
//! ## Bounds
//!
//! Bounds come from the registry, not from physics. They describe what a
//! low-cost sensor can plausibly report, e.g.:
//! - NO2 on an AirSensEUR: 0 to 200 µg/m³
//! - Humidity: 20 to 100 %, below 20 % the sensors are unreliable
//! - ADC codes: 0 to 65535
//!
//! ```rust
//! use airsense_core::registry::DeviceRegistry;
//! use airsense_core::record::DeviceType;
//! use airsense_core::validators::validate;
//!
//! let registry = DeviceRegistry::for_type(DeviceType::Vanilla).unwrap();
//!
//! assert_eq!(validate(&registry, "pm10", 999.0), (true, "pm10 OK".to_string()));
//! assert!(!validate(&registry, "pm10", 1000.0).0);
//! ```

pub mod utils;

use crate::errors::ConversionResult;
use crate::registry::SensorDefinition;
use crate::traits::{SensorRegistry, Validatable, Validator, ValidatorConstraints};

pub use utils::{check_range, range_violation};

/// Validator enforcing the bounds of one definition
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeValidator {
    min: Option<f64>,
    max: Option<f64>,
}

impl RangeValidator {
    /// Validator with explicit bounds
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Validator for a registry definition
    pub fn for_definition(def: &SensorDefinition) -> Self {
        Self::new(def.min, def.max)
    }
}

impl Validator for RangeValidator {
    type Value = f64;

    fn validate(&self, name: &str, value: f64) -> ConversionResult<()> {
        check_range(name, value, self.min, self.max)
    }

    fn constraints(&self) -> ValidatorConstraints {
        ValidatorConstraints {
            min_value: self.min,
            max_value: self.max,
        }
    }
}

/// Check `value` against the bounds of `name` in `registry`.
///
/// Returns the verdict and a human readable reason; unknown names and
/// non-finite values are rejected.
pub fn validate<R: SensorRegistry + ?Sized>(registry: &R, name: &str, value: f64) -> (bool, String) {
    let def = match registry.get_sensor_def(name) {
        Ok(def) => def,
        Err(err) => return (false, err.to_string()),
    };

    if !value.is_valid() {
        return (false, format!("{}: val({}) is not a number", name, value));
    }

    match range_violation(name, value, def.min, def.max) {
        Some(reason) => (false, reason),
        None => (true, format!("{} OK", name)),
    }
}
