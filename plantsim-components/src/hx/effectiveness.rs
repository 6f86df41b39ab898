use std::ops::Deref;

use plantsim_core::constraint::{Constrained, ConstraintResult, UnitInterval};
use uom::si::{f64::Ratio, ratio::ratio};

/// The effectiveness of a heat exchanger.
///
/// The ratio of the heat actually transferred to the most that could be
/// transferred between the two inlet temperatures.
///
/// The effectiveness must be in the interval [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effectiveness(Constrained<Ratio, UnitInterval>);

impl Effectiveness {
    /// Creates an [`Effectiveness`] from a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the interval [0, 1].
    pub fn new(value: f64) -> ConstraintResult<Self> {
        let quantity = Ratio::new::<ratio>(value);
        Self::from_quantity(quantity)
    }

    /// Creates an [`Effectiveness`] from a uom quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is not in the interval [0, 1].
    pub fn from_quantity(quantity: Ratio) -> ConstraintResult<Self> {
        Ok(Self(UnitInterval::new(quantity)?))
    }

    /// Zero effectiveness, for an exchanger with no flow.
    #[must_use]
    pub fn zero() -> Self {
        Self(UnitInterval::zero())
    }

    /// Clamps a computed value into `[0, 1]` before wrapping it.
    ///
    /// Closed-form relations can overshoot one by a rounding error at
    /// very large NTU.
    pub(super) fn saturating(value: f64) -> ConstraintResult<Self> {
        Self::new(value.clamp(0.0, 1.0))
    }

    /// The effectiveness as a plain fraction.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.get::<ratio>()
    }
}

impl Deref for Effectiveness {
    type Target = Ratio;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
