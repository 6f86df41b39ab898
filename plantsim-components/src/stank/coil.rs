//! Immersed coil heat transfer.
//!
//! A coil crossing `m` layers is split into `m` equal segments. Each segment
//! is a counter-flow exchanger whose other side is its layer, a reservoir of
//! infinite capacitance, so its effectiveness is `1 − exp(−NTU / m)`.

use std::f64::consts::PI;

use plantsim_thermo::{PropertyError, water::WaterProperties};

use crate::{
    hx::{Arrangement, CapacityRatio, CounterFlow, Effectiveness, Ntu},
    stank::catalog::KaInput,
};

/// Standard gravity, m/s².
const GRAVITY: f64 = 9.806_65;

/// Reynolds number above which the tube flow is taken as turbulent.
const TRANSITION_RE: f64 = 2300.0;

/// Operating point needed to evaluate a computed coil conductance.
#[derive(Debug, Clone, Copy)]
pub(super) struct CoilConditions {
    /// Coil mass flow rate, kg/s.
    pub mass_rate: f64,
    /// Coil inlet temperature, °C.
    pub fluid_temperature: f64,
    /// Mean temperature of the layers the coil crosses, °C.
    pub tank_temperature: f64,
}

/// Effectiveness of each of `segments` coil segments at capacitance rate
/// `rate` (W/K).
///
/// # Errors
///
/// Returns an error if a computed conductance needs water properties
/// outside their valid range.
pub(super) fn segment_effectiveness(
    ka: KaInput,
    rate: f64,
    segments: usize,
    conditions: CoilConditions,
) -> Result<Vec<f64>, PropertyError> {
    #[allow(clippy::cast_precision_loss)]
    let m = segments as f64;

    let reservoir = CapacityRatio::against_reservoir();

    let ntu = match ka {
        KaInput::Conductance(ka) => ka / rate,
        KaInput::Effectiveness(eff) => {
            let total = Effectiveness::new(eff).map_err(invalid)?;
            CounterFlow
                .ntu(total, reservoir)
                .ok_or_else(|| invalid(format!("effectiveness {eff} is unreachable")))?
                .value()
        }
        KaInput::Computed { diameter, length } => {
            computed_conductance(diameter, length, conditions)? / rate
        }
    };

    let segment = Ntu::new(ntu / m).map_err(invalid)?;
    let eff = CounterFlow.effectiveness(segment, reservoir).value();

    Ok(vec![eff; segments])
}

fn invalid(context: impl ToString) -> PropertyError {
    PropertyError::InvalidInput {
        property: "coil effectiveness",
        context: context.to_string(),
    }
}

/// Overall conductance of a bare tube coil immersed in still water, W/K.
///
/// The inside film uses Dittus-Boelter (turbulent) or the fully developed
/// laminar limit `Nu = 3.66`. The outside film uses the Churchill-Chu
/// correlation for natural convection around a horizontal cylinder. The
/// wall is taken as thin.
///
/// # Errors
///
/// Returns an error if either temperature is outside 0 °C to 100 °C.
pub(super) fn computed_conductance(
    diameter: f64,
    length: f64,
    conditions: CoilConditions,
) -> Result<f64, PropertyError> {
    let area = PI * diameter * length;

    let inside = WaterProperties::at(conditions.fluid_temperature)?;
    let re = 4.0 * conditions.mass_rate / (PI * diameter * inside.viscosity);
    let nu_inside = if re < TRANSITION_RE {
        3.66
    } else {
        0.023 * re.powf(0.8) * inside.prandtl().powf(0.4)
    };
    let h_inside = nu_inside * inside.conductivity / diameter;

    let film = WaterProperties::at(0.5 * (conditions.fluid_temperature + conditions.tank_temperature))?;
    let dt = (conditions.fluid_temperature - conditions.tank_temperature).abs();
    let ra = GRAVITY * film.expansion.abs() * dt * diameter.powi(3)
        / (film.kinematic_viscosity() * film.diffusivity());
    let pr = film.prandtl();
    let nu_outside = (0.60
        + 0.387 * ra.powf(1.0 / 6.0) / (1.0 + (0.559 / pr).powf(9.0 / 16.0)).powf(8.0 / 27.0))
    .powi(2);
    let h_outside = nu_outside * film.conductivity / diameter;

    Ok(area / (1.0 / h_inside + 1.0 / h_outside))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn still() -> CoilConditions {
        CoilConditions {
            mass_rate: 0.0,
            fluid_temperature: 20.0,
            tank_temperature: 20.0,
        }
    }

    #[test]
    fn effectiveness_input_compounds_to_the_total() -> Result<(), PropertyError> {
        let segs = segment_effectiveness(KaInput::Effectiveness(0.75), 100.0, 2, still())?;
        assert_eq!(segs.len(), 2);
        assert_relative_eq!(segs[0], 0.5, epsilon = 1e-12);

        // Fluid temperature excess decays by (1 − ε) per segment.
        let remaining: f64 = segs.iter().map(|e| 1.0 - e).product();
        assert_relative_eq!(1.0 - remaining, 0.75, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn conductance_input_splits_evenly() -> Result<(), PropertyError> {
        let one = segment_effectiveness(KaInput::Conductance(200.0), 100.0, 1, still())?;
        let four = segment_effectiveness(KaInput::Conductance(200.0), 100.0, 4, still())?;

        assert_relative_eq!(one[0], 1.0 - (-2.0_f64).exp());
        let remaining: f64 = four.iter().map(|e| 1.0 - e).product();
        assert_relative_eq!(1.0 - remaining, one[0], epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn negative_conductance_is_reported() {
        let result = segment_effectiveness(KaInput::Conductance(-5.0), 100.0, 2, still());
        assert!(matches!(result, Err(PropertyError::InvalidInput { .. })));
    }

    #[test]
    fn computed_conductance_grows_with_flow_and_temperature_difference() -> Result<(), PropertyError>
    {
        let slow = CoilConditions {
            mass_rate: 0.01,
            fluid_temperature: 60.0,
            tank_temperature: 40.0,
        };
        let fast = CoilConditions {
            mass_rate: 0.3,
            ..slow
        };
        let hotter = CoilConditions {
            fluid_temperature: 80.0,
            ..fast
        };

        let ka_slow = computed_conductance(0.02, 10.0, slow)?;
        let ka_fast = computed_conductance(0.02, 10.0, fast)?;
        let ka_hotter = computed_conductance(0.02, 10.0, hotter)?;

        assert!(ka_slow > 0.0);
        assert!(ka_fast > ka_slow);
        assert!(ka_hotter > ka_fast);

        // Order of magnitude for a 10 m, 20 mm coil.
        assert!((50.0..2000.0).contains(&ka_fast), "KA = {ka_fast}");
        Ok(())
    }

    #[test]
    fn computed_conductance_rejects_steam() {
        let hot = CoilConditions {
            mass_rate: 0.1,
            fluid_temperature: 130.0,
            tank_temperature: 60.0,
        };
        assert!(computed_conductance(0.02, 10.0, hot).is_err());
    }
}
