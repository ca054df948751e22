//! AirSense Avro schemas for persisted outputs
//!
//! Names carry their version; new fields are appended with defaults so
//! older readers keep working.

use apache_avro::Schema;
use serde_json::json;

use crate::SchemaError;

/// Namespace shared by all AirSense schemas
pub const NAMESPACE: &str = "io.airsense.v1";

/// One accepted output value
pub fn output_value_v1() -> Result<Schema, SchemaError> {
    let schema_json = json!({
        "namespace": NAMESPACE,
        "type": "record",
        "name": "OutputValue",
        "doc": "Accepted, validated output of one station",
        "fields": [
            {
                "name": "device_id",
                "type": "string",
                "doc": "Station identity in string form"
            },
            {
                "name": "name",
                "type": "string",
                "doc": "Output name, e.g. no2"
            },
            {
                "name": "value",
                "type": "double"
            },
            {
                "name": "unit",
                "type": "string",
                "doc": "Unit of value, e.g. ug/m3"
            },
            {
                "name": "label",
                "type": "string"
            },
            {
                "name": "time",
                "type": ["null", "long"],
                "default": null,
                "doc": "Record time in milliseconds since epoch (UTC)"
            }
        ]
    });

    Schema::parse(&schema_json).map_err(|e| SchemaError::ParseError(e.to_string()))
}

/// Per-field verdicts of one resolved record
pub fn record_outcome_v1() -> Result<Schema, SchemaError> {
    let schema_json = json!({
        "namespace": NAMESPACE,
        "type": "record",
        "name": "RecordOutcome",
        "doc": "Conversion verdict of every field of one record",
        "fields": [
            {
                "name": "device_id",
                "type": "string"
            },
            {
                "name": "time",
                "type": ["null", "long"],
                "default": null
            },
            {
                "name": "fields",
                "type": {
                    "type": "array",
                    "items": {
                        "type": "record",
                        "name": "FieldOutcome",
                        "fields": [
                            {"name": "name", "type": "string"},
                            {"name": "value", "type": ["null", "double"], "default": null},
                            {"name": "unit", "type": "string"},
                            {"name": "label", "type": "string"},
                            {"name": "accepted", "type": "boolean"},
                            {
                                "name": "reason",
                                "type": "string",
                                "doc": "Why the field was rejected, or '<name> OK'"
                            }
                        ]
                    }
                }
            }
        ]
    });

    Schema::parse(&schema_json).map_err(|e| SchemaError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_output_value_schema() {
        let schema = output_value_v1().unwrap();
        assert_eq!(schema.name().unwrap().name, "OutputValue");
    }

    #[test]
    fn parse_record_outcome_schema() {
        assert!(record_outcome_v1().is_ok());
    }
}
