//! Common validation utilities

use crate::errors::{ConversionError, ConversionResult};
use crate::traits::Validatable;

/// Inclusive range check; a missing bound never rejects, a non-finite value always does
pub fn check_range(name: &str, value: f64, min: Option<f64>, max: Option<f64>) -> ConversionResult<()> {
    if !value.is_valid() {
        return Err(ConversionError::malformed(name, format!("val({}) is not a number", value)));
    }

    let below = min.map_or(false, |min| value < min);
    let above = max.map_or(false, |max| value > max);

    if below || above {
        Err(ConversionError::OutOfRange {
            name: name.to_string(),
            value,
            min: min.unwrap_or(f64::NEG_INFINITY),
            max: max.unwrap_or(f64::INFINITY),
        })
    } else {
        Ok(())
    }
}

/// Reason string for a bound violation, `None` when in range
pub fn range_violation(name: &str, value: f64, min: Option<f64>, max: Option<f64>) -> Option<String> {
    match (min, max) {
        (Some(min), _) if value < min => Some(format!("{}: val({}) < min({})", name, value, min)),
        (_, Some(max)) if value > max => Some(format!("{}: val({}) > max({})", name, value, max)),
        _ => None,
    }
}
