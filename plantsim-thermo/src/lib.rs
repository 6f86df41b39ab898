//! Water and moist-air properties for plant equipment models.
//!
//! All functions work in the units equipment models exchange with the
//! plant solver: temperatures in °C, humidity ratios in kg/kg(DA), and
//! everything else in base SI.

mod error;

pub mod psychro;
pub mod water;

pub use error::PropertyError;

/// Specific heat of dry air, J/(kg·K).
pub const CA: f64 = 1005.0;

/// Specific heat of water vapour, J/(kg·K).
pub const CV: f64 = 1846.0;

/// Latent heat of vaporisation at 0 °C, J/kg.
pub const R0: f64 = 2_501_000.0;

/// Standard atmospheric pressure, Pa.
pub const P_ATM: f64 = 101_325.0;

/// Specific heat of liquid water, J/(kg·K).
pub const CW: f64 = 4186.0;

/// Offset between °C and K.
pub const KELVIN_OFFSET: f64 = 273.15;
