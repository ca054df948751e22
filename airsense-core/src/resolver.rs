//! Conversion Pipeline
//!
//! ## Overview
//!
//! The resolver turns raw readings into validated physical values. For one
//! field it walks the definition chain from the raw leaf up to the requested
//! output, applying each converter and validating each step:
//!
//! ```text
//! RAW_RECEIVED ──convert──► CONVERTED ──validate──► VALIDATED ──► CACHED_AND_EMITTED
//!       │                                  │
//!       └──► UNOBTAINABLE                  └──► REJECTED
//! ```
//!
//! `UNOBTAINABLE` and `REJECTED` end the field for this record; a later
//! record may succeed once the missing calibration or dependency exists.
//!
//! ## Records
//!
//! [`Resolver::resolve_record`] evaluates every definition of the device type
//! in topological order while holding the device's cache lock. Because
//! outputs are cached the moment they are accepted, a record carrying both
//! `Tempe` and `NO2B43F` converts NO2 with *this* record's temperature, and
//! O3 with this record's NO2.
//!
//! - leaf definitions read the record field of the same name
//! - derived definitions read their input's value from the current pass
//! - a chain whose leaf is absent from the record is skipped silently
//! - a definition whose input was rejected is `Unobtainable`
//!
//! ## Failure Channels
//!
//! Unknown device types and sensor names are returned as `Err`. Everything
//! else is reported inside the outcome and never stops sibling fields.
//!
//! ```rust
//! use airsense_core::{Record, Resolver};
//!
//! let resolver = Resolver::new().unwrap();
//! let record = Record::new(11820001u64, "ase")
//!     .at(1_537_185_600_000)
//!     .with_value("Tempe", 20.0)
//!     .with_value("NO2B43F", 61_860i64);
//!
//! let outcome = resolver.resolve_record(&record).unwrap();
//! let names: Vec<_> = outcome.outputs().into_iter().map(|o| o.name).collect();
//! assert!(names.contains(&"temperature".to_string()));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cache::{DeviceValues, LastValueCache};
use crate::calibration::CalibrationStore;
use crate::converters::ConversionContext;
use crate::errors::{ConversionError, ConversionResult, RegistryError, UnobtainableCause};
use crate::record::{DeviceId, DeviceType, OutputValue, RawValue, Record, RecordContext};
use crate::registry::{DeviceRegistry, SensorDefinition, SensorKind};
use crate::time::{Freshness, Timestamp};
use crate::traits::{CalibrationLookup, DependencyLookup, SensorRegistry, Validator};
use crate::validators::RangeValidator;

/// Resolver settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResolverConfig {
    /// Policy for cached cross-sensor values
    pub freshness: Freshness,
}

impl ResolverConfig {
    /// Set the freshness policy
    pub fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = freshness;
        self
    }
}

/// Result of converting one field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ConversionOutcome {
    /// Definition name
    pub name: String,
    /// Accepted value, `None` when rejected
    pub value: Option<f64>,
    /// Unit of `value`
    pub unit: String,
    /// Display label
    pub label: String,
    /// Record time
    pub timestamp: Option<Timestamp>,
    /// Raw channel or output
    pub kind: SensorKind,
    /// Whether the value passed conversion and validation
    pub accepted: bool,
    /// Human readable verdict
    pub reason: String,
    /// Why the field was rejected
    #[cfg_attr(feature = "serde", serde(skip))]
    pub error: Option<ConversionError>,
}

impl ConversionOutcome {
    fn accepted(def: &SensorDefinition, value: f64, timestamp: Option<Timestamp>) -> Self {
        Self {
            name: def.name.clone(),
            value: Some(value),
            unit: def.unit.clone(),
            label: def.label.clone(),
            timestamp,
            kind: def.kind,
            accepted: true,
            reason: format!("{} OK", def.name),
            error: None,
        }
    }

    fn rejected(def: &SensorDefinition, error: ConversionError, timestamp: Option<Timestamp>) -> Self {
        if matches!(error, ConversionError::Unobtainable { .. }) {
            log_debug!("{}", error);
        } else {
            log_warn!("{}", error);
        }

        Self {
            name: def.name.clone(),
            value: None,
            unit: def.unit.clone(),
            label: def.label.clone(),
            timestamp,
            kind: def.kind,
            accepted: false,
            reason: error.to_string(),
            error: Some(error),
        }
    }

    /// Output value to persist; `None` for rejected fields and raw channels
    pub fn to_output(&self, device_id: &DeviceId) -> Option<OutputValue> {
        if !self.accepted || self.kind != SensorKind::Output {
            return None;
        }
        Some(OutputValue {
            device_id: device_id.clone(),
            name: self.name.clone(),
            value: self.value?,
            unit: self.unit.clone(),
            label: self.label.clone(),
            time: self.timestamp,
        })
    }
}

/// Result of resolving one record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RecordOutcome {
    /// Station identity
    pub device_id: DeviceId,
    /// Record time
    pub time: Option<Timestamp>,
    /// Per-field outcomes in evaluation order
    pub fields: Vec<ConversionOutcome>,
}

impl RecordOutcome {
    /// Accepted outputs ready for persistence
    pub fn outputs(&self) -> Vec<OutputValue> {
        self.fields
            .iter()
            .filter_map(|field| field.to_output(&self.device_id))
            .collect()
    }

    /// Outcome of one field
    pub fn field(&self, name: &str) -> Option<&ConversionOutcome> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Rejected fields
    pub fn rejected(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.fields.iter().filter(|field| !field.accepted)
    }

    /// Number of accepted outputs
    pub fn accepted_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|field| field.accepted && field.kind == SensorKind::Output)
            .count()
    }
}

/// Dependency lookup over a locked device entry
struct CacheView<'a> {
    values: &'a DeviceValues,
    reference: Option<Timestamp>,
    freshness: Freshness,
}

impl DependencyLookup for CacheView<'_> {
    fn dependency(&self, name: &str) -> Result<f64, UnobtainableCause> {
        let cached = self
            .values
            .get(name)
            .ok_or_else(|| UnobtainableCause::MissingDependency(name.to_string()))?;

        self.freshness
            .check(cached.timestamp, self.reference)
            .map_err(|age_ms| UnobtainableCause::StaleDependency {
                name: name.to_string(),
                age_ms,
            })?;

        Ok(cached.value)
    }
}

/// Builder for [`Resolver`]
#[derive(Default)]
pub struct ResolverBuilder {
    calibration: Option<Arc<dyn CalibrationLookup + Send + Sync>>,
    cache: Option<Arc<LastValueCache>>,
    config: ResolverConfig,
}

impl ResolverBuilder {
    /// New builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibration source, the built-in table when unset
    pub fn calibration(mut self, calibration: impl CalibrationLookup + Send + Sync + 'static) -> Self {
        self.calibration = Some(Arc::new(calibration));
        self
    }

    /// Shared calibration source
    pub fn shared_calibration(mut self, calibration: Arc<dyn CalibrationLookup + Send + Sync>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Shared cache, a fresh one when unset
    pub fn cache(mut self, cache: Arc<LastValueCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Freshness policy for cached dependencies
    pub fn freshness(mut self, freshness: Freshness) -> Self {
        self.config.freshness = freshness;
        self
    }

    /// All settings at once
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the registries and the resolver
    pub fn build(self) -> Result<Resolver, RegistryError> {
        let mut registries = HashMap::new();
        for device_type in [DeviceType::AirSensEur, DeviceType::Vanilla] {
            registries.insert(device_type, DeviceRegistry::for_type(device_type)?);
        }

        Ok(Resolver {
            registries,
            calibration: self
                .calibration
                .unwrap_or_else(|| Arc::new(CalibrationStore::with_defaults())),
            cache: self.cache.unwrap_or_default(),
            config: self.config,
        })
    }
}

/// Converts raw readings of all device types
pub struct Resolver {
    registries: HashMap<DeviceType, DeviceRegistry>,
    calibration: Arc<dyn CalibrationLookup + Send + Sync>,
    cache: Arc<LastValueCache>,
    config: ResolverConfig,
}

impl Resolver {
    /// Resolver with the built-in calibration table and a fresh cache
    pub fn new() -> Result<Self, RegistryError> {
        Self::builder().build()
    }

    /// Start building a resolver
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// Shared last-value cache
    pub fn cache(&self) -> &Arc<LastValueCache> {
        &self.cache
    }

    /// Active settings
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Registry of a device type given by name
    pub fn registry(&self, device_type: &str) -> ConversionResult<&DeviceRegistry> {
        let parsed: DeviceType = device_type.parse()?;
        self.registries
            .get(&parsed)
            .ok_or_else(|| ConversionError::UnknownSensor {
                device_type: device_type.to_string(),
                name: String::new(),
            })
    }

    /// All definitions of a device type, for upstream field discovery
    pub fn get_sensor_defs(&self, device_type: &str) -> ConversionResult<&BTreeMap<String, SensorDefinition>> {
        Ok(self.registry(device_type)?.get_sensor_defs())
    }

    /// Convert one raw value into `sensor_name`.
    ///
    /// `raw_value` is the reading of the chain's leaf channel: the ADC code
    /// for `no2`, the already-physical value for vanilla outputs. Soft
    /// failures anywhere along the chain end up in the returned outcome; an
    /// accepted output is written to the cache.
    pub fn resolve(
        &self,
        device_type: &str,
        device_id: &DeviceId,
        sensor_name: &str,
        raw_value: &RawValue,
        context: &RecordContext,
    ) -> ConversionResult<ConversionOutcome> {
        let registry = self.registry(device_type)?;
        let table = registry.table();
        let target = table.get(sensor_name)?;
        let chain = table.chain(sensor_name)?;
        let time = context.time;

        let outcome = self.cache.with_device(device_id, |values| {
            let mut source = chain.first().copied().unwrap_or(target);
            let mut result = raw_value.to_number(&source.name);

            for def in chain.iter().copied() {
                result = result.and_then(|value| self.evaluate(def, source, value, device_id, values, time));
                source = def;
            }

            match result {
                Ok(value) => {
                    if target.is_output() {
                        values.set(target.name.as_str(), value, time);
                    }
                    ConversionOutcome::accepted(target, value, time)
                }
                Err(error) => ConversionOutcome::rejected(target, error, time),
            }
        });

        Ok(outcome)
    }

    /// Convert every field of a record, caching accepted outputs as they go
    pub fn resolve_record(&self, record: &Record) -> ConversionResult<RecordOutcome> {
        let registry = self.registry(&record.device_type)?;
        let table = registry.table();
        let device_id = &record.device_id;
        let time = record.time;

        let fields = self.cache.with_device(device_id, |values| {
            // Value of every definition seen in this pass, `None` when rejected
            let mut pass: HashMap<&str, Option<f64>> = HashMap::new();
            let mut fields = Vec::new();

            for name in table.order() {
                let def = table.get(name)?;

                let (source, input) = match def.primary_input() {
                    None => match record.values.get(name) {
                        Some(raw) => (def, raw.to_number(name)),
                        None => continue,
                    },
                    Some(input) => {
                        let source = table.get(input)?;
                        match pass.get(input) {
                            None => continue,
                            Some(Some(value)) => (source, Ok(*value)),
                            Some(None) => (
                                source,
                                Err(ConversionError::unobtainable(
                                    name.as_str(),
                                    UnobtainableCause::MissingInput(input.to_string()),
                                )),
                            ),
                        }
                    }
                };

                let result = input.and_then(|value| self.evaluate(def, source, value, device_id, values, time));

                let outcome = match result {
                    Ok(value) => {
                        if def.is_output() {
                            values.set(name.as_str(), value, time);
                        }
                        pass.insert(name.as_str(), Some(value));
                        ConversionOutcome::accepted(def, value, time)
                    }
                    Err(error) => {
                        pass.insert(name.as_str(), None);
                        ConversionOutcome::rejected(def, error, time)
                    }
                };
                fields.push(outcome);
            }

            Ok::<_, ConversionError>(fields)
        })?;

        Ok(RecordOutcome {
            device_id: device_id.clone(),
            time,
            fields,
        })
    }

    /// Convert, normalise and validate one step
    fn evaluate(
        &self,
        def: &SensorDefinition,
        source: &SensorDefinition,
        value: f64,
        device_id: &DeviceId,
        values: &DeviceValues,
        time: Option<Timestamp>,
    ) -> ConversionResult<f64> {
        let view = CacheView {
            values,
            reference: time,
            freshness: self.config.freshness,
        };
        let ctx = ConversionContext {
            device_id,
            name: &def.name,
            source,
            dependencies: &view,
            calibration: &*self.calibration,
        };

        let value = def.normalize(def.converter.apply(value, &ctx)?);
        RangeValidator::for_definition(def).validate(&def.name, value)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationCoefficients, Gas};

    fn resolver() -> Resolver {
        Resolver::new().unwrap()
    }

    #[test]
    fn unknown_device_type_is_hard() {
        let err = resolver()
            .resolve("josene", &"1".into(), "no2", &RawValue::Int(1), &RecordContext::default())
            .unwrap_err();
        assert!(matches!(err, ConversionError::UnknownSensor { .. }));

        let err = resolver().resolve_record(&Record::new(1u64, "josene")).unwrap_err();
        assert!(err.is_hard());
    }

    #[test]
    fn unknown_sensor_is_hard() {
        let err = resolver()
            .resolve("vanilla", &"1".into(), "so2", &RawValue::Int(1), &RecordContext::default())
            .unwrap_err();
        assert_eq!(
            err,
            ConversionError::UnknownSensor {
                device_type: "vanilla".into(),
                name: "so2".into()
            }
        );
    }

    #[test]
    fn vanilla_passthrough_is_cached() {
        let resolver = resolver();
        let device = DeviceId::from("4931123");

        let outcome = resolver
            .resolve("vanilla", &device, "pm10", &RawValue::Real(12.4), &RecordContext::at(1_000))
            .unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.value, Some(12.0));
        assert_eq!(outcome.unit, "ug/m3");
        assert_eq!(resolver.cache().get_last_value(&device, "pm10").unwrap().value, 12.0);
    }

    #[test]
    fn out_of_range_is_not_cached() {
        let resolver = resolver();
        let device = DeviceId::from("1");

        let outcome = resolver
            .resolve("vanilla", &device, "pm10", &RawValue::Int(1_000), &RecordContext::default())
            .unwrap();
        assert!(!outcome.accepted);
        assert!(matches!(outcome.error, Some(ConversionError::OutOfRange { .. })));
        assert!(resolver.cache().get_last_value(&device, "pm10").is_none());
    }

    #[test]
    fn malformed_value_is_soft() {
        let outcome = resolver()
            .resolve("vanilla", &"1".into(), "pm10", &RawValue::from("n/a"), &RecordContext::default())
            .unwrap();
        assert!(!outcome.accepted);
        assert!(matches!(outcome.error, Some(ConversionError::MalformedInput { .. })));
    }

    #[test]
    fn single_field_chain_uses_cached_temperature() {
        let mut store = CalibrationStore::new();
        store.insert("5", Gas::No2, CalibrationCoefficients::linear(6142.0, -0.1479, -0.1559));
        let resolver = Resolver::builder().calibration(store).build().unwrap();
        let device = DeviceId::from("5");
        let ctx = RecordContext::at(1_000);

        let first = resolver
            .resolve("ase", &device, "no2", &RawValue::Int(61_860), &ctx)
            .unwrap();
        assert!(!first.accepted);

        resolver.cache().set_last_value(&device, "temperature", 20.0, Some(1_000));
        let second = resolver
            .resolve("ase", &device, "no2", &RawValue::Int(61_860), &ctx)
            .unwrap();
        assert!(second.accepted, "{}", second.reason);
        assert_eq!(second.value, Some(69.0));
        assert_eq!(resolver.cache().get_last_value(&device, "no2").unwrap().value, 69.0);
    }

    #[test]
    fn rejected_input_makes_dependents_unobtainable() {
        let resolver = resolver();
        let record = Record::new(11820001u64, "ase").with_value("Tempe", 99i64);

        let outcome = resolver.resolve_record(&record).unwrap();
        assert!(!outcome.field("Tempe").unwrap().accepted);

        let temperature = outcome.field("temperature").unwrap();
        assert_eq!(
            temperature.error,
            Some(ConversionError::unobtainable(
                "temperature",
                UnobtainableCause::MissingInput("Tempe".into())
            ))
        );
        assert_eq!(outcome.accepted_count(), 0);
    }

    #[test]
    fn absent_chains_are_skipped() {
        let outcome = resolver()
            .resolve_record(&Record::new(1u64, "vanilla").with_value("pm10", 10i64))
            .unwrap();
        assert_eq!(outcome.fields.len(), 1);
        assert_eq!(outcome.outputs()[0].name, "pm10");
    }

    #[test]
    fn raw_channels_are_not_emitted() {
        let outcome = resolver()
            .resolve_record(&Record::new(1u64, "ase").with_value("Humid", 55i64))
            .unwrap();
        let names: Vec<_> = outcome.outputs().into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["humidity"]);
        assert!(outcome.field("Humid").unwrap().accepted);
    }
}
