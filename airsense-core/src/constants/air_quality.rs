//! Air Quality Model Thresholds

/// Lowest NO2 concentration (µg/m³) the linear B43F model is trusted for.
///
/// Below this the sensor noise dominates the regression and the result is
/// reported as unobtainable rather than emitted.
pub const NO2_NOISE_FLOOR_UGM3: f64 = 3.0;
