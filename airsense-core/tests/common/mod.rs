//! Shared fixtures for integration tests
//!
//! Readings of the reference AirSensEUR station `11820001`, co-located
//! with the RIVM station Breukelen in 2018.

#![allow(dead_code)]

use airsense_core::{
    time::MS_PER_MINUTE, CalibrationCoefficients, CalibrationStore, DeviceId, Gas, Record, Resolver,
};

/// Reference station with the built-in calibration
pub const REFERENCE_DEVICE: u64 = 11820001;

/// 2018-09-17 12:00 UTC
pub const T0: u64 = 1_537_185_600_000;

/// `minutes` after [`T0`]
pub fn at_minute(minutes: u64) -> u64 {
    T0 + minutes * MS_PER_MINUTE
}

/// ADC code giving NO2 ≈ 69.4 µg/m³ at 20 °C
pub const NO2_DIGITAL: i64 = 61_860;

/// ADC code giving NO2 ≈ 2.2 µg/m³ at 20 °C
pub const NO2_DIGITAL_NOISE: i64 = 62_088;

/// ADC code giving NO ≈ 33.9 µg/m³ at 20 °C (I = 2411.142 nA)
pub const NO_DIGITAL: i64 = 9_450;

/// ADC code giving CO ≈ 4122 µg/m³ at 55 %RH
pub const CO_DIGITAL: i64 = 26_000;

/// ADC code giving O3 ≈ 108 µg/m³ at 20 °C with NO2 = 69
pub const O3_DIGITAL: i64 = 61_000;

pub fn resolver() -> Resolver {
    Resolver::new().expect("built-in registries are valid")
}

/// Meteo channels only
pub fn meteo_record(device: u64, time: u64) -> Record {
    Record::new(device, "ase")
        .at(time)
        .with_value("Tempe", 20i64)
        .with_value("Humid", 55i64)
        .with_value("Press", 1013i64)
}

/// All channels of an AirSensEUR record
pub fn full_record(device: u64, time: u64) -> Record {
    meteo_record(device, time)
        .with_value("COA4", CO_DIGITAL)
        .with_value("NOB4", NO_DIGITAL)
        .with_value("NO2B43F", NO2_DIGITAL)
        .with_value("OX_A431", O3_DIGITAL)
}

/// Store holding the fitted coefficients of the JRC worked example
pub fn fitted_calibration(device: &str) -> CalibrationStore {
    let mut store = CalibrationStore::new();
    store.insert(device, Gas::No, CalibrationCoefficients::with_a3(2384.556, 0.485130, -1.573699, 0.102868));
    store.insert(device, Gas::No2, CalibrationCoefficients::linear(6141.593, -0.147910, -0.195921));
    store
}

pub fn device(id: u64) -> DeviceId {
    DeviceId::from(id)
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {} ± {}, got {}",
        expected,
        tolerance,
        actual
    );
}
