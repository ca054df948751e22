//! Acquisition Adapters for AirSense
//!
//! ## Overview
//!
//! The conversion engine only sees [`Record`]s. This crate turns what
//! upstream platforms deliver into records and drives them through the
//! [`airsense_core::Resolver`]:
//!
//! - **Luftdaten**: public sensor.community feed items, one record per
//!   sensor item, values already calibrated (`vanilla` device type)
//! - **InfluxDB last values**: rows of an AirSensEUR measurement, newest
//!   first, scrubbed down to the latest row per sensor
//! - **HTTP** (feature `http`): fetches the Luftdaten feed per bounding box
//! - **Harvester**: drains any [`RecordSource`] through the resolver and
//!   keeps counters
//!
//! ## Source Model
//!
//! Every adapter is a pull-based [`RecordSource`]. `Ok(None)` ends the
//! stream; an `Err` is a failure of the source itself, never of a single
//! item. Items that cannot be mapped are logged and skipped.
//!
//! ## Example Usage
//!
//! ```rust
//! use airsense_connectors::{luftdaten::LuftdatenConfig, Harvester, RecordQueue};
//! use airsense_core::Resolver;
//!
//! let body = r#"[{
//!     "timestamp": "2019-02-05 15:42:03",
//!     "location": {"id": 8930, "latitude": "51.86", "longitude": "5.868"},
//!     "sensor": {"id": 17622, "sensor_type": {"name": "SDS011"}},
//!     "sensordatavalues": [{"value_type": "P1", "value": "30.00"}]
//! }]"#;
//!
//! let config = LuftdatenConfig::default();
//! let mut source = RecordQueue::from(config.parse_items(body)?);
//!
//! let resolver = Resolver::new()?;
//! let mut harvester = Harvester::new(&resolver);
//! let outputs = harvester.drain(&mut source)?;
//!
//! assert_eq!(outputs[0].name, "pm10");
//! assert_eq!(harvester.stats().outputs, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::VecDeque;

use airsense_core::{ConversionError, Record};
use thiserror::Error;

pub mod harvester;
pub mod influx;
pub mod luftdaten;

#[cfg(feature = "http")]
pub mod http;

// Re-export common types
pub use harvester::{HarvestStats, Harvester};
pub use influx::{InfluxConfig, InfluxRow};
pub use luftdaten::LuftdatenConfig;

#[cfg(feature = "http")]
pub use http::{HttpConfig, LuftdatenHttpSource};

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Upstream could not be reached or answered with an error
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Upstream answered with something that is not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Adapter configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resolver refused the record as a whole
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Pull-based supplier of records
pub trait RecordSource {
    /// Next record, `Ok(None)` once the source is exhausted
    fn next_record(&mut self) -> Result<Option<Record>, ConnectorError>;
}

/// Records already in memory, handed out in insertion order
#[derive(Debug, Clone, Default)]
pub struct RecordQueue {
    records: VecDeque<Record>,
}

impl RecordQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn push(&mut self, record: Record) {
        self.records.push_back(record);
    }

    /// Records still queued
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for RecordQueue {
    fn from(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl RecordSource for RecordQueue {
    fn next_record(&mut self) -> Result<Option<Record>, ConnectorError> {
        Ok(self.records.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_preserves_order() {
        let mut queue = RecordQueue::from(vec![Record::new(1u64, "vanilla"), Record::new(2u64, "vanilla")]);
        queue.push(Record::new(3u64, "vanilla"));
        assert_eq!(queue.len(), 3);

        let ids: Vec<String> = std::iter::from_fn(|| queue.next_record().unwrap())
            .map(|r| r.device_id.to_string())
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn conversion_errors_pass_through() {
        let err: ConnectorError = ConversionError::malformed("pm10", "bad").into();
        assert_eq!(err.to_string(), "pm10: malformed input: bad");
    }
}
