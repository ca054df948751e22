//! Calibration coefficient configuration
//!
//! Coefficients are keyed by device id (string form) and lower-case gas
//! name:
//!
//! ```json
//! {
//!   "11820001": {
//!     "no2": { "a0": 6142.0, "a1": -0.1479, "a2": -0.1559 },
//!     "o3":  { "a0": 6135.0, "a1": -0.2636, "a2": -0.2597, "a3": 0.1249 }
//!   }
//! }
//! ```
//!
//! Gas names are matched case-insensitively. A coefficient set missing
//! `a0`, `a1` or `a2`, or with `a1 == 0`, is a configuration error.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use airsense_core::{CalibrationCoefficients, CalibrationStore, Gas};
use serde::Deserialize;

use crate::SchemaError;

#[derive(Debug, Deserialize)]
struct CoefficientEntry {
    a0: Option<f64>,
    a1: Option<f64>,
    a2: Option<f64>,
    a3: Option<f64>,
}

type CalibrationFile = BTreeMap<String, BTreeMap<String, CoefficientEntry>>;

fn invalid(device: &str, gas: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::Calibration {
        device: device.to_string(),
        gas: gas.to_string(),
        reason: reason.into(),
    }
}

fn coefficients(device: &str, gas: &str, entry: &CoefficientEntry) -> Result<CalibrationCoefficients, SchemaError> {
    let require = |value: Option<f64>, name: &str| {
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(device, gas, format!("missing or non-finite {}", name)))
    };

    let a0 = require(entry.a0, "a0")?;
    let a1 = require(entry.a1, "a1")?;
    let a2 = require(entry.a2, "a2")?;

    if a1 == 0.0 {
        return Err(invalid(device, gas, "a1 must not be zero"));
    }

    Ok(CalibrationCoefficients { a0, a1, a2, a3: entry.a3 })
}

/// Parse a calibration table from JSON text
pub fn load_calibration_str(json: &str) -> Result<CalibrationStore, SchemaError> {
    let file: CalibrationFile = serde_json::from_str(json).map_err(|e| SchemaError::ParseError(e.to_string()))?;

    let mut store = CalibrationStore::new();
    for (device, gases) in &file {
        for (gas_name, entry) in gases {
            let gas: Gas = gas_name
                .parse()
                .map_err(|e: airsense_core::calibration::UnknownGas| invalid(device, gas_name, e.to_string()))?;
            store.insert(device.as_str(), gas, coefficients(device, gas_name, entry)?);
        }
    }
    Ok(store)
}

/// Read a calibration table from a JSON file
pub fn load_calibration_file(path: impl AsRef<Path>) -> Result<CalibrationStore, SchemaError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| SchemaError::Io(format!("{}: {}", path.display(), e)))?;
    load_calibration_str(&json)
}
