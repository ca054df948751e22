//! Records flowing into the resolver and values flowing out of it

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::ConversionError;
use crate::time::Timestamp;

/// Identity of one physical station.
///
/// Upstream feeds use integers or strings; both are keyed by their string
/// form so `11820001` and `"11820001"` name the same device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "DeviceIdRepr", into = "String"))]
pub struct DeviceId(String);

impl DeviceId {
    /// Device id from any string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// String form used as cache and calibration key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(untagged)]
enum DeviceIdRepr {
    Int(u64),
    Text(String),
}

#[cfg(feature = "serde")]
impl From<DeviceIdRepr> for DeviceId {
    fn from(repr: DeviceIdRepr) -> Self {
        match repr {
            DeviceIdRepr::Int(id) => id.into(),
            DeviceIdRepr::Text(id) => id.into(),
        }
    }
}

/// Station families, each owning one sensor registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DeviceType {
    /// AirSensEUR station reporting raw ADC readings
    AirSensEur,
    /// Feed that already reports calibrated physical values
    Vanilla,
}

impl DeviceType {
    /// Canonical configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AirSensEur => "ase",
            Self::Vanilla => "vanilla",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ase" | "airsenseur" => Ok(Self::AirSensEur),
            "vanilla" => Ok(Self::Vanilla),
            _ => Err(ConversionError::UnknownSensor {
                device_type: s.to_string(),
                name: String::new(),
            }),
        }
    }
}

/// One raw value as delivered by the acquisition layer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RawValue {
    /// Integer reading, e.g. an ADC code
    Int(i64),
    /// Real reading
    Real(f64),
    /// Textual reading as some feeds send numbers as strings
    Text(String),
}

impl RawValue {
    /// Numeric value, or `MalformedInput` for `name`
    pub fn to_number(&self, name: &str) -> Result<f64, ConversionError> {
        let value = match self {
            Self::Int(v) => *v as f64,
            Self::Real(v) => *v,
            Self::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                ConversionError::malformed(name, format!("'{}' is not a number", text))
            })?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ConversionError::malformed(name, "value is not finite"))
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One incoming observation from a station
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    /// Station identity
    pub device_id: DeviceId,

    /// Device type name, e.g. `"ase"` or `"vanilla"`
    pub device_type: String,

    /// Device type version
    #[cfg_attr(feature = "serde", serde(default))]
    pub device_version: Option<String>,

    /// Human readable station name
    #[cfg_attr(feature = "serde", serde(default))]
    pub device_name: Option<String>,

    /// Observation time, absent when upstream time could not be parsed
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Option<Timestamp>,

    /// Raw values keyed by sensor name
    #[cfg_attr(feature = "serde", serde(default))]
    pub values: BTreeMap<String, RawValue>,
}

impl Record {
    /// Empty record for a device
    pub fn new(device_id: impl Into<DeviceId>, device_type: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_type: device_type.into(),
            device_version: None,
            device_name: None,
            time: None,
            values: BTreeMap::new(),
        }
    }

    /// Set the observation time
    pub fn at(mut self, time: Timestamp) -> Self {
        self.time = Some(time);
        self
    }

    /// Add a raw value
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Context handed to single-field resolution
    pub fn context(&self) -> RecordContext {
        RecordContext {
            time: self.time,
            device_version: self.device_version.clone(),
        }
    }
}

/// Record metadata needed to resolve one field outside a full record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordContext {
    /// Observation time
    pub time: Option<Timestamp>,
    /// Device type version
    pub device_version: Option<String>,
}

impl RecordContext {
    /// Context at `time`
    pub fn at(time: Timestamp) -> Self {
        Self {
            time: Some(time),
            device_version: None,
        }
    }
}

/// Accepted, converted value ready for persistence
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputValue {
    /// Station identity
    pub device_id: DeviceId,
    /// Output name
    pub name: String,
    /// Physical value
    pub value: f64,
    /// Unit of `value`
    pub unit: String,
    /// Display label
    pub label: String,
    /// Observation time
    pub time: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_forms_are_equal() {
        assert_eq!(DeviceId::from(11820001u64), DeviceId::from("11820001"));
    }

    #[test]
    fn device_type_parsing() {
        assert_eq!("ase".parse::<DeviceType>().unwrap(), DeviceType::AirSensEur);
        assert_eq!("AirSensEUR".parse::<DeviceType>().unwrap(), DeviceType::AirSensEur);
        assert_eq!("vanilla".parse::<DeviceType>().unwrap(), DeviceType::Vanilla);

        let err = "josene".parse::<DeviceType>().unwrap_err();
        assert!(err.is_hard());
    }

    #[test]
    fn raw_value_numbers() {
        assert_eq!(RawValue::Int(61860).to_number("NO2B43F").unwrap(), 61860.0);
        assert_eq!(RawValue::from(" 47.80 ").to_number("humidity").unwrap(), 47.8);

        let err = RawValue::from("n/a").to_number("humidity").unwrap_err();
        assert!(matches!(err, ConversionError::MalformedInput { .. }));

        let err = RawValue::Real(f64::NAN).to_number("pm10").unwrap_err();
        assert!(matches!(err, ConversionError::MalformedInput { .. }));
    }

    #[test]
    fn record_builder() {
        let record = Record::new(42u64, "vanilla")
            .at(1_000)
            .with_value("pm10", 12i64);

        assert_eq!(record.device_id.as_str(), "42");
        assert_eq!(record.context().time, Some(1_000));
        assert_eq!(record.values.len(), 1);
    }
}
