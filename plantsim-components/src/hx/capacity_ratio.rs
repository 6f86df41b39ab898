use std::ops::Deref;

use plantsim_core::constraint::{Constrained, ConstraintResult, NonNegative};
use uom::si::{f64::Ratio, ratio::ratio};

use crate::hx::capacitance_rate::CapacitanceRate;

/// Capacitance rate of one stream over that of the stream it exchanges with.
///
/// Effectiveness is always reported for a particular stream, so the ratio is
/// `C_stream / C_other` rather than `C_min / C_max`. It exceeds one when the
/// stream of interest carries the larger rate, and is zero when the other
/// side is a reservoir such as a well-mixed tank layer.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CapacityRatio(Constrained<Ratio, NonNegative>);

impl CapacityRatio {
    /// Creates a [`CapacityRatio`] from a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is negative or not a number.
    pub fn new(value: f64) -> ConstraintResult<Self> {
        Ok(Self(NonNegative::new(Ratio::new::<ratio>(value))?))
    }

    /// The ratio seen by `stream` when it exchanges with `other`.
    #[must_use]
    pub fn of_stream(stream: CapacitanceRate, other: CapacitanceRate) -> Self {
        // Both rates are strictly positive, so the quotient is too.
        Self(Constrained::new(*stream / *other).unwrap_or_else(|_| NonNegative::zero()))
    }

    /// The ratio against an infinite reservoir.
    #[must_use]
    pub fn against_reservoir() -> Self {
        Self(NonNegative::zero())
    }

    /// Whether the two streams are balanced to within `tolerance`.
    #[must_use]
    pub fn is_balanced(&self, tolerance: f64) -> bool {
        (self.value() - 1.).abs() < tolerance
    }

    /// The ratio as a plain number.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.get::<ratio>()
    }
}

impl Deref for CapacityRatio {
    type Target = Ratio;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::thermal_conductance::watt_per_kelvin;

    use super::*;

    #[test]
    fn ratio_depends_on_which_stream_is_asked() -> ConstraintResult<()> {
        let hot = CapacitanceRate::new::<watt_per_kelvin>(40.)?;
        let cold = CapacitanceRate::new::<watt_per_kelvin>(10.)?;

        assert_relative_eq!(CapacityRatio::of_stream(hot, cold).value(), 4.0);
        assert_relative_eq!(CapacityRatio::of_stream(cold, hot).value(), 0.25);
        Ok(())
    }

    #[test]
    fn reservoir_and_balance() -> ConstraintResult<()> {
        assert_eq!(CapacityRatio::against_reservoir().value(), 0.0);
        assert!(CapacityRatio::new(1.000_001)?.is_balanced(1e-5));
        assert!(!CapacityRatio::new(1.1)?.is_balanced(1e-5));
        assert!(CapacityRatio::new(-0.1).is_err());
        Ok(())
    }
}
