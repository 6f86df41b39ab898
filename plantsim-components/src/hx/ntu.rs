use std::ops::Deref;

use plantsim_core::constraint::{Constrained, ConstraintResult, NonNegative};
use uom::si::{
    f64::{Ratio, ThermalConductance},
    ratio::ratio,
};

use crate::hx::capacitance_rate::CapacitanceRate;

/// Number of transfer units of one stream, `UA / C_stream`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ntu(Constrained<Ratio, NonNegative>);

impl Ntu {
    /// Creates an [`Ntu`] from a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is negative or not a number.
    pub fn new(value: f64) -> ConstraintResult<Self> {
        let quantity = Ratio::new::<ratio>(value);
        Self::from_quantity(quantity)
    }

    /// Creates an [`Ntu`] from a uom quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is negative or not a number.
    pub fn from_quantity(quantity: Ratio) -> ConstraintResult<Self> {
        Ok(Self(NonNegative::new(quantity)?))
    }

    /// The NTU of `stream` through a conductance `ua`.
    ///
    /// # Errors
    ///
    /// Returns an error if `ua` is negative or not a number.
    pub fn of_stream(ua: ThermalConductance, stream: CapacitanceRate) -> ConstraintResult<Self> {
        Self::from_quantity(ua / *stream)
    }

    /// The NTU as a plain number.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.get::<ratio>()
    }
}

impl Deref for Ntu {
    type Target = Ratio;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
