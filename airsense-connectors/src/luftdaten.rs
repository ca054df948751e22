//! Luftdaten (sensor.community) feed mapping
//!
//! The public feed reports one item per physical sensor on a station: an
//! SDS011 item carries `P1`/`P2`, a BME280 item on the same station carries
//! temperature, humidity and pressure. Each item becomes one [`Record`]
//! for the `vanilla` device type:
//!
//! | feed               | record                         |
//! |--------------------|--------------------------------|
//! | `location.id` 8930 | device id `49318930`           |
//! |                    | device name `LTD_8930`         |
//! | `P1`               | `pm10`                         |
//! | `P2`               | `pm2_5`                        |
//! | `pressure` (Pa)    | `pressure` (hPa)               |
//! | `pressure_at_sealevel` | dropped                    |
//!
//! All values are rounded to integers. Timestamps are UTC without zone
//! designator, e.g. `"2019-02-05 15:42:03"`.

use std::collections::BTreeMap;

use airsense_core::{DeviceId, RawValue, Record, Timestamp};
use chrono::{NaiveDateTime, TimeZone, Utc};
use log::{info, warn};
use serde::Deserialize;

use crate::ConnectorError;

/// Prefix turning a Luftdaten location id into a device id
pub const DEVICE_ID_PREFIX: &str = "4931";

/// Bounding box `[lat_min, lon_min, lat_max, lon_max]`
pub type BBox = [f64; 4];

/// Luftdaten adapter configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LuftdatenConfig {
    /// API root, e.g. `http://api.luftdaten.info/v1`
    pub base_url: String,
    /// Named areas to query
    pub bboxes: BTreeMap<String, BBox>,
    /// Device type records are tagged with
    pub device_type: String,
    /// Device version records are tagged with
    pub device_version: String,
}

impl Default for LuftdatenConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.luftdaten.info/v1".to_string(),
            bboxes: BTreeMap::new(),
            device_type: "vanilla".to_string(),
            device_version: "1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SensorItem {
    timestamp: String,
    location: Location,
    sensor: Sensor,
    #[serde(default)]
    sensordatavalues: Vec<DataValue>,
}

#[derive(Debug, Deserialize)]
struct Location {
    id: u64,
    #[serde(default)]
    latitude: Option<NumberOrText>,
    #[serde(default)]
    longitude: Option<NumberOrText>,
}

#[derive(Debug, Deserialize)]
struct Sensor {
    id: u64,
    sensor_type: SensorType,
}

#[derive(Debug, Deserialize)]
struct SensorType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    value_type: String,
    value: NumberOrText,
}

/// The feed sends most numbers as strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn to_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Parse a feed timestamp as UTC milliseconds
///
/// Accepts `"YYYY-MM-DD HH:MM:SS"` with optional fractional seconds, a `T`
/// separator and a trailing `Z`.
pub fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    let text = text.strip_suffix('Z').unwrap_or(text);

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()?;

    Timestamp::try_from(Utc.from_utc_datetime(&naive).timestamp_millis()).ok()
}

/// Record field name and value for one feed value, `None` when dropped
fn map_value(value_type: &str, value: f64) -> Option<(&str, f64)> {
    match value_type {
        "P1" => Some(("pm10", value)),
        "P2" => Some(("pm2_5", value)),
        "pressure_at_sealevel" => None,
        "pressure" => Some(("pressure", value / 100.0)),
        other => Some((other, value)),
    }
}

fn in_bbox(location: &Location, bbox: &BBox) -> bool {
    let lat = location.latitude.as_ref().and_then(NumberOrText::to_f64);
    let lon = location.longitude.as_ref().and_then(NumberOrText::to_f64);
    match (lat, lon) {
        (Some(lat), Some(lon)) => lat > bbox[0] && lon > bbox[1] && lat < bbox[2] && lon < bbox[3],
        _ => false,
    }
}

impl LuftdatenConfig {
    /// Configuration for `base_url` with default tagging
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Add a named bounding box
    pub fn bbox(mut self, name: impl Into<String>, bbox: BBox) -> Self {
        self.bboxes.insert(name.into(), bbox);
        self
    }

    /// Last-values URL for one bounding box
    pub fn bbox_url(&self, bbox: &BBox) -> String {
        let coords: Vec<String> = bbox.iter().map(|c| c.to_string()).collect();
        format!("{}/filter/box={}", self.base_url.trim_end_matches('/'), coords.join(","))
    }

    /// Map one feed item to a record
    ///
    /// Returns `None` for items that do not have the expected shape, carry
    /// an unparsable timestamp or no usable value.
    pub fn item_to_record(&self, item: &serde_json::Value) -> Option<Record> {
        let item: SensorItem = match serde_json::from_value(item.clone()) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping malformed Luftdaten item: {}", e);
                return None;
            }
        };
        self.map_item(&item)
    }

    fn map_item(&self, item: &SensorItem) -> Option<Record> {
        let device_name = format!("LTD_{}", item.location.id);
        let unique_id = format!("{}-{}-{}", device_name, item.sensor.sensor_type.name, item.sensor.id);

        let Some(time) = parse_timestamp(&item.timestamp) else {
            warn!("Bad timestamp '{}' for {}", item.timestamp, unique_id);
            return None;
        };

        let mut record = Record::new(
            DeviceId::new(format!("{}{}", DEVICE_ID_PREFIX, item.location.id)),
            self.device_type.clone(),
        )
        .at(time);
        record.device_name = Some(device_name);
        record.device_version = Some(self.device_version.clone());

        for data in &item.sensordatavalues {
            let Some(value) = data.value.to_f64() else {
                warn!("Unparsable {} value {:?} for {}", data.value_type, data.value, unique_id);
                continue;
            };
            if let Some((name, value)) = map_value(&data.value_type, value) {
                record.values.insert(name.to_string(), RawValue::Int(value.round() as i64));
            }
        }

        if record.values.is_empty() {
            warn!("No usable values for {}", unique_id);
            return None;
        }
        Some(record)
    }

    /// Map a feed response body, one record per usable item
    pub fn parse_items(&self, body: &str) -> Result<Vec<Record>, ConnectorError> {
        let items: Vec<serde_json::Value> =
            serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))?;
        Ok(items.iter().filter_map(|item| self.item_to_record(item)).collect())
    }

    /// Map a feed response body to one record per station inside `bbox`
    ///
    /// Items of the same location are merged: values of later items replace
    /// earlier ones and the record takes the latest item time.
    pub fn assemble(&self, body: &str, bbox: &BBox) -> Result<Vec<Record>, ConnectorError> {
        let items: Vec<serde_json::Value> =
            serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))?;

        let mut stations: BTreeMap<DeviceId, Record> = BTreeMap::new();
        for value in &items {
            let item: SensorItem = match serde_json::from_value(value.clone()) {
                Ok(item) => item,
                Err(e) => {
                    warn!("Skipping malformed Luftdaten item: {}", e);
                    continue;
                }
            };
            if !in_bbox(&item.location, bbox) {
                continue;
            }
            let Some(record) = self.map_item(&item) else {
                continue;
            };

            match stations.get_mut(&record.device_id) {
                Some(station) => {
                    station.values.extend(record.values);
                    station.time = station.time.max(record.time);
                }
                None => {
                    info!("New station record for {}", record.device_id);
                    stations.insert(record.device_id.clone(), record);
                }
            }
        }
        Ok(stations.into_values().collect())
    }
}
