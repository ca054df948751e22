//! Sensor value conversion and calibration resolution for AirSense
//!
//! Turns raw readings of low-cost air-quality stations into validated
//! physical values (µg/m³, °C, hPa, %RH).
//!
//! Key pieces:
//! - Per-device-type sensor registries with a checked dependency graph
//! - Electrochemical conversion chain: digital → voltage → current → concentration
//! - Per-device calibration coefficients and last-known-value cache
//! - Inclusive range validation before anything is cached or emitted
//!
//! ```no_run
//! use airsense_core::{Record, Resolver};
//!
//! let resolver = Resolver::new()?;
//!
//! let record = Record::new(11820001u64, "ase")
//!     .with_value("Tempe", 20.1)
//!     .with_value("NO2B43F", 61_860i64);
//!
//! for output in resolver.resolve_record(&record)?.outputs() {
//!     println!("{} = {} {}", output.name, output.value, output.unit);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod cache;
pub mod calibration;
pub mod constants;
pub mod converters;
pub mod errors;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod time;
pub mod traits;
pub mod validators;

// Public API
pub use cache::{CachedValue, LastValueCache};
pub use calibration::{CalibrationCoefficients, CalibrationStore, Gas};
pub use converters::Converter;
pub use errors::{ConversionError, ConversionResult, RegistryError, UnobtainableCause};
pub use record::{DeviceId, DeviceType, OutputValue, RawValue, Record, RecordContext};
pub use registry::{DeviceRegistry, SensorDefinition, SensorKind, ValueType};
pub use resolver::{ConversionOutcome, RecordOutcome, Resolver, ResolverBuilder, ResolverConfig};
pub use time::{Freshness, Timestamp};
pub use traits::{CalibrationLookup, DependencyLookup, SensorRegistry, Validator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
