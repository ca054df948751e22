//! Calibration files feeding a resolver

use std::io::Write;

use airsense_core::{Record, Resolver};
use airsense_schemas::{load_calibration_file, SchemaError};
use tempfile::NamedTempFile;

const CALIBRATION: &str = r#"{
    "42": {
        "NO2": { "a0": 6142.0, "a1": -0.1479, "a2": -0.1559 },
        "o3":  { "a0": 6135.0, "a1": -0.2636, "a2": -0.2597, "a3": 0.1249 }
    }
}"#;

#[test]
fn calibration_file_drives_conversion() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", CALIBRATION).unwrap();
    file.flush().unwrap();

    let store = load_calibration_file(file.path()).unwrap();
    assert_eq!(store.len(), 1);

    let resolver = Resolver::builder().calibration(store).build().unwrap();
    let record = Record::new(42u64, "ase")
        .at(0)
        .with_value("Tempe", 20i64)
        .with_value("NO2B43F", 61_860i64)
        .with_value("OX_A431", 61_000i64)
        .with_value("NOB4", 9_450i64);

    let outcome = resolver.resolve_record(&record).unwrap();
    assert_eq!(outcome.field("no2").unwrap().value, Some(69.0));
    assert_eq!(outcome.field("o3").unwrap().value, Some(108.0));
    // No NO coefficients in the file
    assert!(!outcome.field("no").unwrap().accepted);
}

#[test]
fn missing_file_is_io_error() {
    let err = load_calibration_file("/nonexistent/airsense/calibration.json").unwrap_err();
    assert!(matches!(err, SchemaError::Io(_)));
}

#[test]
fn malformed_json_is_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{\"42\": ").unwrap();
    file.flush().unwrap();

    assert!(matches!(load_calibration_file(file.path()), Err(SchemaError::ParseError(_))));
}
