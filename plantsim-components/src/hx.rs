//! Heat exchanger effectiveness and a two-stream exchanger model.
//!
//! The effectiveness-NTU types here serve both the standalone [`Hex`] and
//! the immersed coils of a [`stank`](crate::stank), whose segments exchange
//! with a layer treated as an infinite reservoir.

mod arrangement;
mod capacitance_rate;
mod capacity_ratio;
mod catalog;
mod effectiveness;
mod exchanger;
mod ntu;

pub use arrangement::{Arrangement, CounterFlow};
pub use capacitance_rate::CapacitanceRate;
pub use capacity_ratio::CapacityRatio;
pub use catalog::{HexCatalog, RawHexCatalog};
pub use effectiveness::Effectiveness;
pub use exchanger::{Hex, HexError, HexReport};
pub use ntu::Ntu;

use plantsim_core::constraint::ConstraintResult;
use uom::si::f64::ThermalConductance;

/// Temperature effectiveness of one stream in a counter-flow exchanger.
///
/// The result is `(T_in − T_out) / (T_in − T_in,other)` for `stream`. Its NTU
/// is `UA / C_stream` and its capacity ratio `C = C_stream / C_other`, so the
/// two sides of one exchanger satisfy `C₀·ε₀ = C₁·ε₁`. Balanced rates use the
/// `NTU / (1 + NTU)` limit. At very large NTU the result saturates at one when
/// `C < 1` and at `1 / C` when `C > 1`.
///
/// # Example
///
/// ```
/// use plantsim_components::hx::{CapacitanceRate, temperature_effectiveness};
/// use uom::si::{f64::ThermalConductance, ratio::ratio, thermal_conductance::watt_per_kelvin};
///
/// let eff = temperature_effectiveness(
///     CapacitanceRate::new::<watt_per_kelvin>(1000.0)?,
///     CapacitanceRate::new::<watt_per_kelvin>(1000.0)?,
///     ThermalConductance::new::<watt_per_kelvin>(1000.0),
/// )?;
/// assert!((eff.get::<ratio>() - 0.5).abs() < 1e-12);
/// # Ok::<(), plantsim_core::constraint::ConstraintError>(())
/// ```
///
/// # Errors
///
/// Returns an error if `ua` is negative or not a number.
pub fn temperature_effectiveness(
    stream: CapacitanceRate,
    other: CapacitanceRate,
    ua: ThermalConductance,
) -> ConstraintResult<Effectiveness> {
    let ntu = Ntu::of_stream(ua, stream)?;
    Ok(CounterFlow.effectiveness(ntu, CapacityRatio::of_stream(stream, other)))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::{ratio::ratio, thermal_conductance::watt_per_kelvin};

    use super::*;

    fn eff(stream: f64, other: f64, ua: f64) -> ConstraintResult<f64> {
        let e = temperature_effectiveness(
            CapacitanceRate::new::<watt_per_kelvin>(stream)?,
            CapacitanceRate::new::<watt_per_kelvin>(other)?,
            ThermalConductance::new::<watt_per_kelvin>(ua),
        )?;
        Ok(e.get::<ratio>())
    }

    #[test]
    fn both_sides_move_the_same_heat() -> ConstraintResult<()> {
        for ua in [10.0, 500.0, 5e3] {
            let small = 200.0 * eff(200.0, 800.0, ua)?;
            let large = 800.0 * eff(800.0, 200.0, ua)?;
            assert_relative_eq!(small, large, max_relative = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn balanced_branch() -> ConstraintResult<()> {
        // NTU = 3
        assert_relative_eq!(eff(200.0, 200.0, 600.0)?, 0.75, epsilon = 1e-12);
        // Within 1e-5 of balanced still uses the limit.
        assert_relative_eq!(eff(200.0, 200.000_1, 600.0)?, 0.75, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn huge_ntu_saturates_per_stream() -> ConstraintResult<()> {
        assert_relative_eq!(eff(10.0, 40.0, 1e9)?, 1.0);
        assert_relative_eq!(eff(40.0, 10.0, 1e9)?, 0.25);
        Ok(())
    }

    #[test]
    fn bounded_for_all_inputs() -> ConstraintResult<()> {
        for ua in [0.0, 1.0, 50.0, 1e3, 1e5, 1e9] {
            for (a, b) in [(1.0, 1.0), (1.0, 2.0), (2.0, 1.0), (10.0, 1e4), (1e4, 10.0), (1e3, 1e3 + 1.0)] {
                let e = eff(a, b, ua)?;
                assert!((0.0..=1.0).contains(&e), "ua={ua} rates=({a}, {b}) eff={e}");
                assert!(e <= (b / a).min(1.0) + 1e-12, "ua={ua} rates=({a}, {b}) eff={e}");
            }
        }
        Ok(())
    }

    #[test]
    fn negative_conductance_is_rejected() {
        assert!(eff(10.0, 10.0, -1.0).is_err());
    }
}
