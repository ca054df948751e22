//! Configuration and Avro Schemas for AirSense
//!
//! ## Overview
//!
//! This crate sits between the conversion engine and the outside world:
//!
//! - **Calibration configuration**: per-device, per-gas coefficients loaded
//!   from JSON into an [`airsense_core::CalibrationStore`]
//! - **Sensor catalogue**: the definitions of a device type as JSON, so
//!   upstream adapters can discover field names, units and bounds
//! - **Output schemas**: versioned Avro schemas for persisted outputs and
//!   per-record verdicts, plus encoders into Avro object containers
//!
//! ## Why Avro?
//!
//! 1. **Compact Binary Format**: stations report every few minutes for years
//! 2. **Schema Evolution**: outputs gain fields as new sensors are added
//! 3. **Self-Describing**: the container header carries the writer schema
//!
//! ## Schema Evolution Strategy
//!
//! 1. **Always Append**: New fields are added, never removed
//! 2. **Default Values**: Old consumers ignore new fields gracefully
//! 3. **Version in Name**: `output_value_v1`, `output_value_v2`
//!
//! ## Usage Example
//!
//! ```rust
//! use airsense_core::{Record, Resolver};
//! use airsense_schemas::{encode_outputs, SchemaRegistry};
//!
//! let registry = SchemaRegistry::with_defaults()?;
//! let schema = registry.get_latest("output_value")?;
//!
//! let resolver = Resolver::new()?;
//! let record = Record::new(4931_1234u64, "vanilla").at(0).with_value("pm10", 12i64);
//! let outputs = resolver.resolve_record(&record)?.outputs();
//!
//! let bytes = encode_outputs(&schema, &outputs)?;
//! assert!(!bytes.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod calibration;
pub mod catalogue;
pub mod encode;
pub mod registry;
pub mod schemas;

pub use calibration::{load_calibration_file, load_calibration_str};
pub use catalogue::{catalogue_json, sensor_catalogue, CatalogueEntry, SensorCatalogue};
pub use encode::{encode_outcomes, encode_outputs};
pub use registry::{SchemaMetadata, SchemaRegistry};

/// Schema and configuration errors
#[derive(Debug, thiserror_no_std::Error)]
pub enum SchemaError {
    #[error("Failed to parse schema: {0}")]
    ParseError(String),

    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid calibration for device {device}, gas {gas}: {reason}")]
    Calibration {
        device: String,
        gas: String,
        reason: String,
    },

    #[error("Failed to encode: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(String),
}
