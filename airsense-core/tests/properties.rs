//! Property tests for the conversion chain, validator and cache

mod common;

use airsense_core::{
    constants::electrochem::{ASE_GAIN, ASE_R_LOAD_OHM, ASE_V_REF_AD, ASE_V_REF_NO2_B43F},
    converters::digital_to_current,
    registry::{DeviceRegistry, ElectrochemParams},
    validators::validate,
    DeviceId, DeviceType, LastValueCache, SensorRegistry,
};
use proptest::prelude::*;

fn no2_params() -> ElectrochemParams {
    ElectrochemParams {
        v_ref: ASE_V_REF_NO2_B43F,
        v_ref_ad: ASE_V_REF_AD,
        gain: ASE_GAIN,
        r_load: ASE_R_LOAD_OHM,
    }
}

proptest! {
    #[test]
    fn stage_ab_is_deterministic(digital in 0u32..=65_535) {
        let params = no2_params();
        let first = digital_to_current(digital as f64, &params);
        let second = digital_to_current(digital as f64, &params);
        prop_assert!((first - second).abs() < 1e-9);
        prop_assert!(first.is_finite());
    }

    #[test]
    fn stage_ab_is_monotonic(digital in 0u32..65_535) {
        let params = no2_params();
        prop_assert!(digital_to_current(digital as f64 + 1.0, &params) > digital_to_current(digital as f64, &params));
    }

    #[test]
    fn validator_respects_bounds(value in -1_000.0f64..2_000.0) {
        let registry = DeviceRegistry::for_type(DeviceType::Vanilla).unwrap();
        let def = registry.get_sensor_def("pm10").unwrap();
        let inside = value >= def.min.unwrap() && value <= def.max.unwrap();
        prop_assert_eq!(validate(&registry, "pm10", value).0, inside);
    }

    #[test]
    fn cache_last_write_wins(writes in prop::collection::vec((0u8..4, 0.0f64..100.0), 1..50)) {
        let cache = LastValueCache::new();
        let mut expected = [None; 4];

        for (device, value) in &writes {
            cache.set_last_value(&DeviceId::from(*device as u64), "humidity", *value, None);
            expected[*device as usize] = Some(*value);
        }

        for (device, value) in expected.iter().enumerate() {
            let cached = cache.get_last_value(&DeviceId::from(device as u64), "humidity").map(|c| c.value);
            prop_assert_eq!(cached, *value);
        }
    }
}
