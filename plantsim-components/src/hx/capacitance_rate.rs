use std::ops::Deref;

use plantsim_core::constraint::{Constrained, ConstraintResult, StrictlyPositive};
use uom::si::{
    f64::{MassRate, SpecificHeatCapacity, ThermalConductance},
    thermal_conductance::watt_per_kelvin,
};

/// The product of mass flow rate and specific heat of a stream.
///
/// Always strictly positive; a stream with no flow has no capacitance rate
/// and is handled by the caller as a bypass.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CapacitanceRate(Constrained<ThermalConductance, StrictlyPositive>);

impl CapacitanceRate {
    /// Creates a capacitance rate in the given thermal conductance unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not strictly positive.
    pub fn new<U>(value: f64) -> ConstraintResult<Self>
    where
        U: uom::si::thermal_conductance::Unit + uom::Conversion<f64, T = f64>,
    {
        let quantity = ThermalConductance::new::<U>(value);
        Self::from_quantity(quantity)
    }

    /// Creates a capacitance rate from a uom quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is not strictly positive.
    pub fn from_quantity(quantity: ThermalConductance) -> ConstraintResult<Self> {
        Ok(Self(StrictlyPositive::new(quantity)?))
    }

    /// Creates a capacitance rate as `ṁ·cp`.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not strictly positive.
    pub fn from_mass_rate_and_specific_heat(
        mass_rate: MassRate,
        specific_heat: SpecificHeatCapacity,
    ) -> ConstraintResult<Self> {
        Self::from_quantity(mass_rate * specific_heat)
    }

    /// The rate in W/K.
    #[must_use]
    pub fn watts_per_kelvin(&self) -> f64 {
        self.get::<watt_per_kelvin>()
    }
}

impl Deref for CapacitanceRate {
    type Target = ThermalConductance;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::{
        mass_rate::kilogram_per_second, specific_heat_capacity::joule_per_kilogram_kelvin,
    };

    use super::*;

    #[test]
    fn from_mass_rate() -> ConstraintResult<()> {
        let rate = CapacitanceRate::from_mass_rate_and_specific_heat(
            MassRate::new::<kilogram_per_second>(0.5),
            SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4186.0),
        )?;
        assert_relative_eq!(rate.watts_per_kelvin(), 2093.0);
        Ok(())
    }

    #[test]
    fn zero_flow_is_not_a_rate() {
        assert!(CapacitanceRate::new::<watt_per_kelvin>(0.0).is_err());
    }
}
