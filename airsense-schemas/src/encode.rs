//! Avro encoding of resolver results
//!
//! Values are written as Avro object container files: the schema travels
//! in the header, so persisted outputs stay readable after schema changes.

use apache_avro::{
    types::{Record, Value},
    Schema, Writer,
};
use airsense_core::{OutputValue, RecordOutcome, Timestamp};

use crate::SchemaError;

fn optional_long(time: Option<Timestamp>) -> Result<Value, SchemaError> {
    match time {
        Some(ms) => {
            let ms = i64::try_from(ms).map_err(|_| SchemaError::Encode(format!("time {} overflows long", ms)))?;
            Ok(Value::Union(1, Box::new(Value::Long(ms))))
        }
        None => Ok(Value::Union(0, Box::new(Value::Null))),
    }
}

fn optional_double(value: Option<f64>) -> Value {
    match value {
        Some(v) => Value::Union(1, Box::new(Value::Double(v))),
        None => Value::Union(0, Box::new(Value::Null)),
    }
}

fn new_record(schema: &Schema) -> Result<Record<'_>, SchemaError> {
    Record::new(schema).ok_or_else(|| SchemaError::ValidationError("schema is not a record".to_string()))
}

fn output_record<'a>(schema: &'a Schema, output: &OutputValue) -> Result<Record<'a>, SchemaError> {
    let mut record = new_record(schema)?;
    record.put("device_id", output.device_id.as_str());
    record.put("name", output.name.as_str());
    record.put("value", output.value);
    record.put("unit", output.unit.as_str());
    record.put("label", output.label.as_str());
    record.put("time", optional_long(output.time)?);
    Ok(record)
}

/// Encode accepted outputs with the `output_value_v1` schema
pub fn encode_outputs(schema: &Schema, outputs: &[OutputValue]) -> Result<Vec<u8>, SchemaError> {
    let mut writer = Writer::new(schema, Vec::new());
    for output in outputs {
        writer
            .append(output_record(schema, output)?)
            .map_err(|e| SchemaError::Encode(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| SchemaError::Encode(e.to_string()))
}

/// Encode record outcomes with the `record_outcome_v1` schema
pub fn encode_outcomes(schema: &Schema, outcomes: &[RecordOutcome]) -> Result<Vec<u8>, SchemaError> {
    let mut writer = Writer::new(schema, Vec::new());
    for outcome in outcomes {
        let fields = outcome
            .fields
            .iter()
            .map(|field| {
                Value::Record(vec![
                    ("name".to_string(), Value::String(field.name.clone())),
                    ("value".to_string(), optional_double(field.value)),
                    ("unit".to_string(), Value::String(field.unit.clone())),
                    ("label".to_string(), Value::String(field.label.clone())),
                    ("accepted".to_string(), Value::Boolean(field.accepted)),
                    ("reason".to_string(), Value::String(field.reason.clone())),
                ])
            })
            .collect();

        let mut record = new_record(schema)?;
        record.put("device_id", outcome.device_id.as_str());
        record.put("time", optional_long(outcome.time)?);
        record.put("fields", Value::Array(fields));

        writer.append(record).map_err(|e| SchemaError::Encode(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| SchemaError::Encode(e.to_string()))
}
