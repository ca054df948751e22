//! Staleness window for cached cross-sensor values

mod common;

use airsense_core::{ConversionError, Freshness, Record, Resolver, UnobtainableCause};

use common::*;

fn no2_record(minute: u64) -> Record {
    Record::new(REFERENCE_DEVICE, "ase")
        .at(at_minute(minute))
        .with_value("NO2B43F", NO2_DIGITAL)
}

#[test]
fn unbounded_uses_any_cached_value() {
    let resolver = resolver();
    resolver.resolve_record(&meteo_record(REFERENCE_DEVICE, T0)).unwrap();

    let outcome = resolver.resolve_record(&no2_record(24 * 60)).unwrap();
    assert!(outcome.field("no2").unwrap().accepted);
}

#[test]
fn max_age_rejects_stale_temperature() {
    let resolver = Resolver::builder().freshness(Freshness::minutes(10)).build().unwrap();
    resolver.resolve_record(&meteo_record(REFERENCE_DEVICE, T0)).unwrap();

    // Inside the window, edge included
    let outcome = resolver.resolve_record(&no2_record(10)).unwrap();
    assert!(outcome.field("no2").unwrap().accepted);

    let outcome = resolver.resolve_record(&no2_record(11)).unwrap();
    let no2 = outcome.field("no2").unwrap();
    assert!(!no2.accepted);
    assert_eq!(
        no2.error,
        Some(ConversionError::unobtainable(
            "no2",
            UnobtainableCause::StaleDependency {
                name: "temperature".into(),
                age_ms: 11 * 60_000,
            }
        ))
    );
}

#[test]
fn stale_rejection_leaves_cache_untouched() {
    let resolver = Resolver::builder().freshness(Freshness::minutes(10)).build().unwrap();
    resolver.resolve_record(&meteo_record(REFERENCE_DEVICE, T0)).unwrap();
    resolver.resolve_record(&no2_record(5)).unwrap();

    resolver.resolve_record(&no2_record(30)).unwrap();
    let cached = resolver.cache().get_last_value(&device(REFERENCE_DEVICE), "no2").unwrap();
    assert_eq!(cached.timestamp, Some(at_minute(5)));
}

#[test]
fn fresh_record_refreshes_dependency() {
    let resolver = Resolver::builder().freshness(Freshness::minutes(10)).build().unwrap();
    resolver.resolve_record(&meteo_record(REFERENCE_DEVICE, T0)).unwrap();
    resolver.resolve_record(&meteo_record(REFERENCE_DEVICE, at_minute(60))).unwrap();

    let outcome = resolver.resolve_record(&no2_record(65)).unwrap();
    assert!(outcome.field("no2").unwrap().accepted);
}
