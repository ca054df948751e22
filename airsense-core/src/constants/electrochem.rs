//! Electrochemical Sensor Front-End Constants
//!
//! Values for the AirSensEUR (ASE) shield with AlphaSense sensors.
//!
//! Source: Spinelle, Gerboles, Kotsev, Signorini, "Evaluation of low-cost
//! sensors for air pollution monitoring", JRC technical report JRC106095
//! (2017), equation 1; shield settings per JRC communication of 2019-01-17.

/// Number of codes of the 16-bit ADC (2^16).
pub const ADC_FULL_SCALE: f64 = 65_536.0;

/// Highest digital reading the 16-bit ADC produces.
pub const ADC_MAX_DIGITAL: f64 = 65_535.0;

/// Volts/amperes to nano-units.
pub const NANO_PER_UNIT: f64 = 1e9;

/// Trans-impedance amplifier gain of the ASE shield.
pub const ASE_GAIN: f64 = 7001.0;

/// Load resistance of the ASE shield (Ohm).
pub const ASE_R_LOAD_OHM: f64 = 50.0;

/// ADC reference voltage offset, all channels (V).
pub const ASE_V_REF_AD: f64 = 0.5006105;

/// Reference voltage of the CO-A4 channel (V).
pub const ASE_V_REF_CO_A4: f64 = 1.500611;

/// Reference voltage of the NO-B4 channel (V).
pub const ASE_V_REF_NO_B4: f64 = 1.200244;

/// Reference voltage of the NO2-B43F channel (V).
pub const ASE_V_REF_NO2_B43F: f64 = 1.700855;

/// Reference voltage of the OX-A431 channel (V).
pub const ASE_V_REF_OX_A431: f64 = 1.700855;
