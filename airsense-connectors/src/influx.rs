//! InfluxDB last values
//!
//! AirSensEUR stations push every sample into one InfluxDB measurement
//! (table) per station, one row per sensor channel:
//!
//! ```text
//! time                      name     value
//! 2018-10-17T15:00:14.746Z  NO2B43F  61860
//! 2018-10-17T15:00:14.746Z  Tempe    20.1
//! 2018-10-17T14:59:14.312Z  NO2B43F  61855
//! ```
//!
//! A measurement is queried newest first over a recent window, then
//! scrubbed down to the first (latest) row per channel name. The scrubbed
//! rows form one record for the station's device id.

use std::collections::{BTreeMap, HashSet, VecDeque};

use airsense_core::{DeviceId, RawValue, Record, Timestamp};
use chrono::DateTime;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{ConnectorError, RecordSource};

/// One result row, column name to value
pub type InfluxRow = Map<String, Value>;

/// InfluxDB adapter configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// Measurement name to device id. When empty every measurement is its
    /// own device id; otherwise unmapped measurements are skipped.
    pub measurement_to_device: BTreeMap<String, String>,
    /// Query window in InfluxDB duration syntax, e.g. `2h`, `30m`
    pub query_since: String,
    /// Maximum rows per query
    pub query_limit: u32,
    /// Device type records are tagged with
    pub device_type: String,
    /// Device version records are tagged with
    pub device_version: String,
    /// Column holding the raw reading
    pub value_field: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            measurement_to_device: BTreeMap::new(),
            query_since: "2h".to_string(),
            query_limit: 20,
            device_type: "ase".to_string(),
            device_version: "1".to_string(),
            value_field: "value".to_string(),
        }
    }
}

/// First row per sensor `name`, rows without a name are ignored
///
/// Rows must be ordered newest first, so the result holds the latest
/// sample of every channel in query order.
pub fn scrub_last_values(rows: &[InfluxRow]) -> Vec<&InfluxRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| match row.get("name").and_then(Value::as_str) {
            Some(name) => seen.insert(name.to_string()),
            None => false,
        })
        .collect()
}

/// Parse an InfluxDB time column (RFC 3339) as UTC milliseconds
pub fn parse_time(text: &str) -> Option<Timestamp> {
    let time = DateTime::parse_from_rfc3339(text.trim()).ok()?;
    Timestamp::try_from(time.timestamp_millis()).ok()
}

fn raw_value(value: &Value) -> Option<RawValue> {
    match value {
        Value::Number(n) => n.as_i64().map(RawValue::Int).or_else(|| n.as_f64().map(RawValue::Real)),
        Value::String(s) => Some(RawValue::Text(s.clone())),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Rows of an InfluxDB 1.x `/query` JSON response
pub fn parse_query_response(body: &str) -> Result<Vec<InfluxRow>, ConnectorError> {
    let response: QueryResponse = serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))?;

    let mut rows = Vec::new();
    for result in response.results {
        if let Some(error) = result.error {
            return Err(ConnectorError::Fetch(error));
        }
        for series in result.series {
            rows.extend(
                series
                    .values
                    .into_iter()
                    .map(|values| series.columns.iter().cloned().zip(values).collect::<InfluxRow>()),
            );
        }
    }
    Ok(rows)
}

impl InfluxConfig {
    /// Map measurement `from` to device id `to`
    pub fn map_measurement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.measurement_to_device.insert(from.into(), to.into());
        self
    }

    /// Last-values query for a measurement
    pub fn query(&self, measurement: &str) -> String {
        format!(
            "SELECT * FROM {} WHERE time >= now()-{} and time <= now() ORDER BY time DESC LIMIT {}",
            measurement, self.query_since, self.query_limit
        )
    }

    /// Device id of a measurement, `None` when it is not mapped
    pub fn device_id(&self, measurement: &str) -> Option<DeviceId> {
        if self.measurement_to_device.is_empty() {
            return Some(DeviceId::from(measurement));
        }
        match self.measurement_to_device.get(measurement) {
            Some(id) => Some(DeviceId::from(id.as_str())),
            None => {
                warn!("No device_id mapped for measurement {}", measurement);
                None
            }
        }
    }

    /// Record holding the latest value of every channel in `rows`
    ///
    /// Returns `None` when no row carries a usable name and value. The
    /// record time is the time of the newest row.
    pub fn rows_to_record(&self, device_id: DeviceId, rows: &[InfluxRow]) -> Option<Record> {
        let last = scrub_last_values(rows);
        let newest = last.first()?;

        let time = newest.get("time").and_then(Value::as_str).and_then(parse_time);
        if time.is_none() {
            warn!("No usable time in last values of {}", device_id);
        }

        let mut record = Record::new(device_id, self.device_type.clone());
        record.time = time;
        record.device_name = Some(format!("station {}", record.device_id));
        record.device_version = Some(self.device_version.clone());

        for row in last {
            let Some(name) = row.get("name").and_then(Value::as_str) else {
                continue;
            };
            match row.get(&self.value_field).and_then(raw_value) {
                Some(value) => {
                    record.values.insert(name.to_string(), value);
                }
                None => warn!("{}: no {} column for {}", record.device_id, self.value_field, name),
            }
        }

        if record.values.is_empty() {
            return None;
        }
        Some(record)
    }
}

/// Record source over already queried measurements
///
/// Each measurement yields at most one record; unmapped measurements and
/// measurements without usable rows are skipped.
#[derive(Debug, Clone)]
pub struct InfluxLastValues {
    config: InfluxConfig,
    pending: VecDeque<(String, Vec<InfluxRow>)>,
}

impl InfluxLastValues {
    /// Empty source
    pub fn new(config: InfluxConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
        }
    }

    /// Queue the query result of one measurement
    pub fn push(&mut self, measurement: impl Into<String>, rows: Vec<InfluxRow>) {
        self.pending.push_back((measurement.into(), rows));
    }

    /// Queue an InfluxDB `/query` response body for one measurement
    pub fn push_response(&mut self, measurement: impl Into<String>, body: &str) -> Result<(), ConnectorError> {
        let rows = parse_query_response(body)?;
        self.push(measurement, rows);
        Ok(())
    }

    /// Measurements not yet turned into records
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl RecordSource for InfluxLastValues {
    fn next_record(&mut self) -> Result<Option<Record>, ConnectorError> {
        while let Some((measurement, rows)) = self.pending.pop_front() {
            let Some(device_id) = self.config.device_id(&measurement) else {
                continue;
            };
            match self.config.rows_to_record(device_id, &rows) {
                Some(record) => return Ok(Some(record)),
                None => info!("No last values in measurement {}", measurement),
            }
        }
        Ok(None)
    }
}
