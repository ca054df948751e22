//! Sensor Definition Registries
//!
//! ## Overview
//!
//! Each device type owns one registry mapping sensor and output names to
//! their [`SensorDefinition`]. Registries are built once from static tables
//! and are read-only afterwards.
//!
//! ```text
//! AirSensEUR:  NO2B43F ──digital→nA──► no2raw ──nA→µg/m³──► no2
//!                                                   ▲
//!              Tempe ──identity──► temperature ─────┘ (cached dependency)
//!
//! Vanilla:     pm10, no2, temperature, ...   (identity, validate only)
//! ```
//!
//! ## Graph Rules
//!
//! Two kinds of edges connect definitions:
//! - **inputs**: the value a definition is computed from
//! - **dependencies**: cached outputs its converter reads (temperature,
//!   humidity, no2)
//!
//! Construction rejects tables where either kind of edge points at an
//! unknown name, where the edges form a cycle, or where an electrochemical
//! converter's source carries no shield params. The topological order of
//! the combined graph is the evaluation order used by
//! [`Resolver::resolve_record`](crate::resolver::Resolver::resolve_record),
//! so `temperature` is always resolved before `no2`, and `no2` before `o3`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::converters::Converter;
use crate::errors::{ConversionError, ConversionResult, RegistryError};
use crate::record::{DeviceType, Record};
use crate::traits::SensorRegistry;

mod airsenseur;
mod vanilla;

pub use airsenseur::AirSensEurRegistry;
pub use vanilla::VanillaRegistry;

/// Whether a definition describes an upstream channel or a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorKind {
    /// Upstream channel: validated, never cached or emitted
    Raw,
    /// Product of the engine: cached and emitted when accepted
    Output,
}

/// Numeric type of accepted values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValueType {
    /// Rounded to the nearest integer on acceptance
    Integer,
    /// Kept as is
    Real,
}

/// Static shield constants of an electrochemical channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElectrochemParams {
    /// Reference voltage (V)
    pub v_ref: f64,
    /// Reference voltage of the AD converter (V)
    pub v_ref_ad: f64,
    /// Trans-impedance amplifier gain
    pub gain: f64,
    /// Load resistance (Ω)
    pub r_load: f64,
}

/// One named quantity a device type can produce
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorDefinition {
    /// Unique key within the device type
    pub name: String,
    /// Display label
    pub label: String,
    /// Unit of accepted values
    pub unit: String,
    /// Names this definition is derived from, empty for leaves
    pub inputs: Vec<String>,
    /// Vendor or datasheet identifier
    pub meta_id: Option<String>,
    /// Sensor vendor
    pub vendor: Option<String>,
    /// Raw channel or output
    pub kind: SensorKind,
    /// Converter applied to the primary input value
    pub converter: Converter,
    /// Integer or real
    pub value_type: ValueType,
    /// Inclusive lower bound
    pub min: Option<f64>,
    /// Inclusive upper bound
    pub max: Option<f64>,
    /// Shield params, only on raw electrochemical channels
    pub params: Option<ElectrochemParams>,
}

impl SensorDefinition {
    /// Unbounded real-valued identity definition
    pub fn new(name: impl Into<String>, label: impl Into<String>, unit: impl Into<String>, kind: SensorKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            unit: unit.into(),
            inputs: Vec::new(),
            meta_id: None,
            vendor: None,
            kind,
            converter: Converter::Identity,
            value_type: ValueType::Real,
            min: None,
            max: None,
            params: None,
        }
    }

    /// Raw upstream channel
    pub fn raw(name: impl Into<String>, label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::new(name, label, unit, SensorKind::Raw)
    }

    /// Emitted output
    pub fn output(name: impl Into<String>, label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::new(name, label, unit, SensorKind::Output)
    }

    /// Derive from `input` through `converter`
    pub fn from_input(mut self, input: impl Into<String>, converter: Converter) -> Self {
        self.inputs = vec![input.into()];
        self.converter = converter;
        self
    }

    /// Inclusive bounds
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Round accepted values
    pub fn integer(mut self) -> Self {
        self.value_type = ValueType::Integer;
        self
    }

    /// Attach shield params
    pub fn with_params(mut self, params: ElectrochemParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Attach a datasheet identifier
    pub fn with_meta_id(mut self, meta_id: impl Into<String>) -> Self {
        self.meta_id = Some(meta_id.into());
        self
    }

    /// Attach a vendor
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Input whose value the converter receives
    pub fn primary_input(&self) -> Option<&str> {
        self.inputs.first().map(String::as_str)
    }

    /// True for definitions read straight from the record
    pub fn is_leaf(&self) -> bool {
        self.inputs.is_empty()
    }

    /// True when accepted values are cached and emitted
    pub fn is_output(&self) -> bool {
        self.kind == SensorKind::Output
    }

    /// Apply the value type to an accepted value
    pub fn normalize(&self, value: f64) -> f64 {
        match self.value_type {
            ValueType::Integer => value.round(),
            ValueType::Real => value,
        }
    }
}

/// Validated definitions of one device type plus their evaluation order
#[derive(Debug, Clone)]
pub struct SensorTable {
    device_type: DeviceType,
    defs: BTreeMap<String, SensorDefinition>,
    order: Vec<String>,
}

impl SensorTable {
    /// Build and validate a table
    pub fn new(device_type: DeviceType, definitions: Vec<SensorDefinition>) -> Result<Self, RegistryError> {
        let mut defs = BTreeMap::new();
        for def in definitions {
            if defs.contains_key(&def.name) {
                return Err(RegistryError::Duplicate(def.name));
            }
            defs.insert(def.name.clone(), def);
        }

        check_references(&defs)?;
        let order = topological_order(&defs)?;

        Ok(Self {
            device_type,
            defs,
            order,
        })
    }

    /// Device type of this table
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Definition by name
    pub fn get(&self, name: &str) -> ConversionResult<&SensorDefinition> {
        self.defs.get(name).ok_or_else(|| ConversionError::UnknownSensor {
            device_type: self.device_type.to_string(),
            name: name.to_string(),
        })
    }

    /// All definitions keyed by name
    pub fn defs(&self) -> &BTreeMap<String, SensorDefinition> {
        &self.defs
    }

    /// Names ordered so inputs and dependencies come first
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Leaf definition a name is ultimately computed from
    pub fn leaf_of(&self, name: &str) -> ConversionResult<&SensorDefinition> {
        let mut def = self.get(name)?;
        // Acyclic by construction, so this terminates
        while let Some(input) = def.primary_input() {
            def = self.get(input)?;
        }
        Ok(def)
    }

    /// Chain from the leaf up to `name`, leaf first
    pub fn chain(&self, name: &str) -> ConversionResult<Vec<&SensorDefinition>> {
        let mut def = self.get(name)?;
        let mut chain = vec![def];
        while let Some(input) = def.primary_input() {
            def = self.get(input)?;
            chain.push(def);
        }
        chain.reverse();
        Ok(chain)
    }
}

fn edges(def: &SensorDefinition) -> impl Iterator<Item = &str> {
    def.inputs
        .iter()
        .map(String::as_str)
        .chain(def.converter.dependencies().iter().copied())
}

fn check_references(defs: &BTreeMap<String, SensorDefinition>) -> Result<(), RegistryError> {
    for def in defs.values() {
        for input in &def.inputs {
            if !defs.contains_key(input) {
                return Err(RegistryError::DanglingInput {
                    sensor: def.name.clone(),
                    input: input.clone(),
                });
            }
        }

        for dependency in def.converter.dependencies() {
            match defs.get(*dependency) {
                Some(dep) if dep.is_output() => {}
                _ => {
                    return Err(RegistryError::DanglingDependency {
                        sensor: def.name.clone(),
                        dependency: dependency.to_string(),
                    })
                }
            }
        }

        if def.converter.needs_params() {
            let source = def.primary_input().and_then(|input| defs.get(input));
            if source.map_or(true, |source| source.params.is_none()) {
                return Err(RegistryError::MissingParams(def.name.clone()));
            }
        }
    }
    Ok(())
}

/// Kahn's algorithm over inputs and dependencies
fn topological_order(defs: &BTreeMap<String, SensorDefinition>) -> Result<Vec<String>, RegistryError> {
    let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for def in defs.values() {
        let upstream: BTreeSet<&str> = edges(def).collect();
        pending.insert(def.name.as_str(), upstream.len());
        for up in upstream {
            dependents.entry(up).or_default().push(def.name.as_str());
        }
    }

    let mut ready: VecDeque<&str> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(defs.len());

    while let Some(name) = ready.pop_front() {
        order.push(name.to_string());
        for dependent in dependents.get(name).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push_back(*dependent);
                }
            }
        }
    }

    if order.len() != defs.len() {
        let stuck = pending
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        return Err(RegistryError::Cycle(stuck));
    }

    Ok(order)
}

/// Registry of one device type
#[derive(Debug, Clone)]
pub enum DeviceRegistry {
    /// AirSensEUR stations
    AirSensEur(AirSensEurRegistry),
    /// Pre-calibrated feeds
    Vanilla(VanillaRegistry),
}

impl DeviceRegistry {
    /// Registry for `device_type`
    pub fn for_type(device_type: DeviceType) -> Result<Self, RegistryError> {
        match device_type {
            DeviceType::AirSensEur => Ok(Self::AirSensEur(AirSensEurRegistry::new()?)),
            DeviceType::Vanilla => Ok(Self::Vanilla(VanillaRegistry::new()?)),
        }
    }

    /// Underlying table
    pub fn table(&self) -> &SensorTable {
        match self {
            Self::AirSensEur(registry) => registry.table(),
            Self::Vanilla(registry) => registry.table(),
        }
    }
}

impl SensorRegistry for DeviceRegistry {
    fn device_type(&self) -> DeviceType {
        self.table().device_type()
    }

    fn get_sensor_def(&self, name: &str) -> ConversionResult<&SensorDefinition> {
        self.table().get(name)
    }

    fn get_sensor_defs(&self) -> &BTreeMap<String, SensorDefinition> {
        self.table().defs()
    }

    fn can_resolve(&self, name: &str, _record: &Record) -> bool {
        self.table().defs().contains_key(name)
    }
}
