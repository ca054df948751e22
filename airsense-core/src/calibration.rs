//! Per-device calibration coefficients for electrochemical gas sensors
//!
//! Each calibrated device carries, per gas, the regression coefficients of a
//! linear model relating sensor current `Rs` (nA) to concentration:
//!
//! ```text
//! CO : Rs = a0 + a1·CO  + a2·RH
//! NO : Rs = a0 + a1·NO  + a2·T  + a3·T²
//! NO2: Rs = a0 + a1·NO2 + a2·T
//! O3 : Rs = a0 + a1·O3  + a2·NO2 + a3·T
//! ```
//!
//! A missing device or gas is an expected state (not yet calibrated), not a
//! configuration fault: lookups return `None`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::record::DeviceId;
use crate::traits::CalibrationLookup;

/// Gases with a calibrated current-to-concentration model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Gas {
    /// Carbon monoxide
    Co,
    /// Nitric oxide
    No,
    /// Nitrogen dioxide
    No2,
    /// Ozone
    O3,
}

impl Gas {
    /// All calibrated gases
    pub const ALL: [Gas; 4] = [Gas::Co, Gas::No, Gas::No2, Gas::O3];

    /// Lower-case configuration key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Co => "co",
            Self::No => "no",
            Self::No2 => "no2",
            Self::O3 => "o3",
        }
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown gas name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGas(pub String);

impl fmt::Display for UnknownGas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown gas '{}'", self.0)
    }
}

impl std::error::Error for UnknownGas {}

impl FromStr for Gas {
    type Err = UnknownGas;

    /// Case-insensitive, so `"NO2"` and `"no2"` both parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "co" => Ok(Self::Co),
            "no" => Ok(Self::No),
            "no2" => Ok(Self::No2),
            "o3" => Ok(Self::O3),
            _ => Err(UnknownGas(s.to_string())),
        }
    }
}

/// Regression coefficients for one device and gas
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationCoefficients {
    /// Offset (nA)
    pub a0: f64,
    /// Sensitivity to the target gas
    pub a1: f64,
    /// First cross term
    pub a2: f64,
    /// Second cross term, only used by the NO and O3 models
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub a3: Option<f64>,
}

impl CalibrationCoefficients {
    /// Three-coefficient model (CO, NO2)
    pub fn linear(a0: f64, a1: f64, a2: f64) -> Self {
        Self { a0, a1, a2, a3: None }
    }

    /// Four-coefficient model (NO, O3)
    pub fn with_a3(a0: f64, a1: f64, a2: f64, a3: f64) -> Self {
        Self {
            a0,
            a1,
            a2,
            a3: Some(a3),
        }
    }
}

/// Coefficient table keyed by device id and gas
#[derive(Debug, Clone, Default)]
pub struct CalibrationStore {
    table: HashMap<DeviceId, HashMap<Gas, CalibrationCoefficients>>,
}

impl CalibrationStore {
    /// Empty store: every device uncalibrated
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the reference calibration of ASE device `11820001`
    /// (JRC/RIVM co-location, Breukelen 2018).
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        let device = DeviceId::from(11820001u64);
        store.insert(device.clone(), Gas::Co, CalibrationCoefficients::linear(3107.0, 0.2113, 0.2448));
        store.insert(device.clone(), Gas::No, CalibrationCoefficients::with_a3(2385.0, 0.4851, -1.574, 0.1029));
        store.insert(device.clone(), Gas::No2, CalibrationCoefficients::linear(6142.0, -0.1479, -0.1559));
        store.insert(device, Gas::O3, CalibrationCoefficients::with_a3(6135.0, -0.2636, -0.2597, 0.1249));
        store
    }

    /// Add or replace the coefficients for a device and gas
    pub fn insert(&mut self, device_id: impl Into<DeviceId>, gas: Gas, coefficients: CalibrationCoefficients) {
        self.table
            .entry(device_id.into())
            .or_default()
            .insert(gas, coefficients);
    }

    /// Coefficients by gas name; `None` when uncalibrated or the gas is unknown
    pub fn get_coefficients(&self, device_id: &DeviceId, gas_name: &str) -> Option<CalibrationCoefficients> {
        let gas = gas_name.parse::<Gas>().ok()?;
        self.get(device_id, gas)
    }

    /// Coefficients by gas
    pub fn get(&self, device_id: &DeviceId, gas: Gas) -> Option<CalibrationCoefficients> {
        self.table.get(device_id)?.get(&gas).copied()
    }

    /// Whether any gas is calibrated for the device
    pub fn is_calibrated(&self, device_id: &DeviceId) -> bool {
        self.table.get(device_id).map_or(false, |gases| !gases.is_empty())
    }

    /// Calibrated devices
    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.table.keys()
    }

    /// Number of calibrated devices
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when no device is calibrated
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl CalibrationLookup for CalibrationStore {
    fn coefficients(&self, device_id: &DeviceId, gas: Gas) -> Option<CalibrationCoefficients> {
        self.get(device_id, gas)
    }
}
