//! Constants for AirSense Core
//!
//! Centralised numeric values used by the converters and the built-in
//! registries, each with its source.
//!
//! Constants are grouped by domain:
//! - **Electrochemical**: ADC resolution and AirSensEUR shield parameters
//! - **Air quality**: trust thresholds for the calibrated gas models

/// ADC and analog front-end constants for electrochemical gas sensors.
pub mod electrochem;

/// Thresholds applied to calibrated concentrations.
pub mod air_quality;

pub use electrochem::{ADC_FULL_SCALE, ADC_MAX_DIGITAL, NANO_PER_UNIT};
pub use air_quality::NO2_NOISE_FLOOR_UGM3;
