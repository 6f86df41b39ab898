//! Liquid water transport properties for convection correlations.
//!
//! Fits are valid from 0 °C to 100 °C at atmospheric pressure.

use crate::{CW, PropertyError};

/// Liquid water properties at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterProperties {
    /// Density, kg/m³.
    pub density: f64,
    /// Specific heat, J/(kg·K).
    pub specific_heat: f64,
    /// Thermal conductivity, W/(m·K).
    pub conductivity: f64,
    /// Dynamic viscosity, Pa·s.
    pub viscosity: f64,
    /// Volumetric thermal expansion coefficient, 1/K.
    pub expansion: f64,
}

impl WaterProperties {
    /// Evaluates the properties at `t` °C.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::OutOfRange`] outside 0 °C to 100 °C.
    pub fn at(t: f64) -> Result<Self, PropertyError> {
        PropertyError::check_range("water_properties", t, 0.0, 100.0)?;

        let dt = 0.05;
        let expansion = -(density(t + dt) - density(t - dt)) / (2.0 * dt) / density(t);

        Ok(Self {
            density: density(t),
            specific_heat: CW,
            conductivity: 0.5706 + 1.756e-3 * t - 6.46e-6 * t * t,
            viscosity: 2.414e-5 * 10_f64.powf(247.8 / (t + 133.15)),
            expansion,
        })
    }

    /// Kinematic viscosity, m²/s.
    #[must_use]
    pub fn kinematic_viscosity(&self) -> f64 {
        self.viscosity / self.density
    }

    /// Thermal diffusivity, m²/s.
    #[must_use]
    pub fn diffusivity(&self) -> f64 {
        self.conductivity / (self.density * self.specific_heat)
    }

    /// Prandtl number.
    #[must_use]
    pub fn prandtl(&self) -> f64 {
        self.viscosity * self.specific_heat / self.conductivity
    }
}

/// Density of air-free water at atmospheric pressure, kg/m³.
fn density(t: f64) -> f64 {
    1000.0 * (1.0 - (t + 288.9414) / (508_929.2 * (t + 68.129_63)) * (t - 3.9863).powi(2))
}
