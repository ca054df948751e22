//! Error Types for Sensor Conversion and Validation
//!
//! ## Error Channels
//!
//! Conversion failures fall into two channels, and callers treat them very
//! differently:
//!
//! ### Hard failures (returned as `Err`)
//! - `UnknownSensor`: the device type or sensor name has no registry entry.
//!   Surfaced to the caller and never retried.
//!
//! ### Soft failures (carried inside a `ConversionOutcome`)
//! - `Unobtainable`: a cached dependency or calibration set is missing, or the
//!   result sits below the sensor noise floor. A later record may succeed.
//! - `OutOfRange`: the converted value failed the registry bounds.
//! - `MalformedInput`: the raw value is not a usable number.
//!
//! A soft failure drops one field of one record. It never aborts sibling
//! fields or later records.
//!
//! ## Configuration Faults
//!
//! `RegistryError` is raised while building a registry from its static
//! definitions: dangling inputs, dangling converter dependencies, dependency
//! cycles, and electrochemical converters whose source has no shield params.
//!
//! ```rust
//! use airsense_core::{ConversionError, UnobtainableCause};
//!
//! fn describe(err: &ConversionError) -> &'static str {
//!     match err {
//!         ConversionError::UnknownSensor { .. } => "fix the acquisition mapping",
//!         ConversionError::Unobtainable { cause: UnobtainableCause::MissingCalibration { .. }, .. } => {
//!             "device not calibrated yet"
//!         }
//!         ConversionError::Unobtainable { .. } => "wait for more data",
//!         ConversionError::OutOfRange { .. } => "implausible reading",
//!         ConversionError::MalformedInput { .. } => "bad upstream value",
//!     }
//! }
//! ```

use thiserror_no_std::Error;

use crate::calibration::Gas;

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Conversion and validation errors for a single field
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// No registry entry for this device type / sensor name
    #[error("Unknown sensor '{name}' for device type '{device_type}'")]
    UnknownSensor {
        /// Device type as requested by the caller
        device_type: String,
        /// Sensor or output name as requested by the caller
        name: String,
    },

    /// Value currently cannot be computed
    #[error("{name} unobtainable: {cause}")]
    Unobtainable {
        /// Output that could not be computed
        name: String,
        /// What was missing
        cause: UnobtainableCause,
    },

    /// Converted value outside the registry bounds
    #[error("{name}: value {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// Output that failed validation
        name: String,
        /// The converted value
        value: f64,
        /// Inclusive lower bound (`-inf` when unbounded)
        min: f64,
        /// Inclusive upper bound (`inf` when unbounded)
        max: f64,
    },

    /// Raw value is not a usable number
    #[error("{name}: malformed input: {reason}")]
    MalformedInput {
        /// Field carrying the bad value
        name: String,
        /// Human readable explanation
        reason: String,
    },
}

impl ConversionError {
    /// Build an `Unobtainable` error for `name`
    pub fn unobtainable(name: impl Into<String>, cause: UnobtainableCause) -> Self {
        Self::Unobtainable {
            name: name.into(),
            cause,
        }
    }

    /// Build a `MalformedInput` error for `name`
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Hard failures must be handled by the caller; soft ones only drop a field
    pub fn is_hard(&self) -> bool {
        matches!(self, Self::UnknownSensor { .. })
    }

    /// Name of the field this error refers to
    pub fn field(&self) -> &str {
        match self {
            Self::UnknownSensor { name, .. }
            | Self::Unobtainable { name, .. }
            | Self::OutOfRange { name, .. }
            | Self::MalformedInput { name, .. } => name,
        }
    }
}

/// Why a value could not be obtained
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnobtainableCause {
    /// Required cross-sensor value has never been cached for this device
    #[error("no cached value for dependency '{0}'")]
    MissingDependency(String),

    /// Cached dependency is older than the freshness window
    #[error("cached '{name}' is {age_ms} ms old")]
    StaleDependency {
        /// Dependency name
        name: String,
        /// Age relative to the record time
        age_ms: u64,
    },

    /// Device has no coefficients for this gas
    #[error("no calibration for {gas}")]
    MissingCalibration {
        /// Gas that needs calibration
        gas: Gas,
    },

    /// Coefficient set lacks a coefficient the model needs
    #[error("calibration for {gas} lacks {coefficient}")]
    IncompleteCalibration {
        /// Gas being converted
        gas: Gas,
        /// Missing coefficient name
        coefficient: &'static str,
    },

    /// Result below the level where the linear model is trusted
    #[error("{value} below noise floor {floor}")]
    BelowNoiseFloor {
        /// Computed concentration
        value: f64,
        /// Minimum trusted concentration
        floor: f64,
    },

    /// Input was present in the record but was itself rejected
    #[error("input '{0}' was rejected")]
    MissingInput(String),
}

/// Registry configuration faults
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Definition names an input that does not exist
    #[error("sensor '{sensor}' has unknown input '{input}'")]
    DanglingInput {
        /// Definition with the bad reference
        sensor: String,
        /// Missing input name
        input: String,
    },

    /// Converter depends on an output that does not exist
    #[error("sensor '{sensor}' depends on unknown output '{dependency}'")]
    DanglingDependency {
        /// Definition with the bad reference
        sensor: String,
        /// Missing dependency name
        dependency: String,
    },

    /// Inputs and dependencies form a cycle
    #[error("dependency cycle through {0:?}")]
    Cycle(Vec<String>),

    /// Electrochemical converter whose source has no shield params
    #[error("sensor '{0}' needs electrochemical params on its source")]
    MissingParams(String),

    /// Two definitions share a name
    #[error("duplicate sensor definition '{0}'")]
    Duplicate(String),
}
