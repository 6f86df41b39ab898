//! Moist-air psychrometrics at standard atmospheric pressure.
//!
//! Saturation vapour pressure uses the Wexler-Hyland formulation over water
//! (above 0 °C) and over ice (at or below 0 °C).

use crate::{CA, CV, KELVIN_OFFSET, P_ATM, PropertyError, R0};

/// Ratio of the molar masses of water vapour and dry air.
const EPSILON_MW: f64 = 0.621_98;

/// Returns the saturation vapour pressure in Pa at `t` °C.
///
/// # Errors
///
/// Returns [`PropertyError::OutOfRange`] outside −100 °C to 200 °C.
pub fn saturation_pressure(t: f64) -> Result<f64, PropertyError> {
    PropertyError::check_range("saturation_pressure", t, -100.0, 200.0)?;

    let tk = t + KELVIN_OFFSET;
    let ln_p = if t > 0.0 {
        -5.800_220_6e3 / tk + 1.391_499_3 - 4.864_023_9e-2 * tk + 4.176_476_8e-5 * tk.powi(2)
            - 1.445_209_3e-8 * tk.powi(3)
            + 6.545_967_3 * tk.ln()
    } else {
        -5.674_535_9e3 / tk + 6.392_524_7 - 9.677_843e-3 * tk + 6.221_570_1e-7 * tk.powi(2)
            + 2.074_782_5e-9 * tk.powi(3)
            - 9.484_024e-13 * tk.powi(4)
            + 4.163_501_9 * tk.ln()
    };

    Ok(ln_p.exp())
}

/// Returns the saturation humidity ratio in kg/kg(DA) at `t` °C.
///
/// # Errors
///
/// Returns [`PropertyError::OutOfRange`] outside −100 °C to 95 °C, where the
/// saturation pressure approaches atmospheric pressure.
pub fn saturation_humidity(t: f64) -> Result<f64, PropertyError> {
    PropertyError::check_range("saturation_humidity", t, -100.0, 95.0)?;
    Ok(humidity_from_vapour_pressure(saturation_pressure(t)?))
}

/// Converts a water vapour partial pressure in Pa into a humidity ratio.
#[must_use]
pub fn humidity_from_vapour_pressure(pw: f64) -> f64 {
    EPSILON_MW * pw / (P_ATM - pw)
}

/// Converts a humidity ratio into a water vapour partial pressure in Pa.
#[must_use]
pub fn vapour_pressure(x: f64) -> f64 {
    x * P_ATM / (EPSILON_MW + x)
}

/// Returns the relative humidity (as a fraction) of air at `t` °C and `x` kg/kg.
///
/// The result is not clamped; supersaturated inputs return values above 1.
///
/// # Errors
///
/// Returns an error if `x` is negative or `t` is out of range.
pub fn relative_humidity(t: f64, x: f64) -> Result<f64, PropertyError> {
    if !(x >= 0.0) {
        return Err(PropertyError::InvalidInput {
            property: "relative_humidity",
            context: format!("humidity ratio must be non-negative, got {x}"),
        });
    }
    Ok(vapour_pressure(x) / saturation_pressure(t)?)
}

/// Returns the humidity ratio of air at `t` °C and relative humidity `rh` (fraction).
///
/// # Errors
///
/// Returns an error if `rh` is outside `[0, 1]` or `t` is out of range.
pub fn humidity_from_relative(t: f64, rh: f64) -> Result<f64, PropertyError> {
    PropertyError::check_range("humidity_from_relative", rh, 0.0, 1.0)?;
    PropertyError::check_range("humidity_from_relative", t, -100.0, 95.0)?;
    Ok(humidity_from_vapour_pressure(rh * saturation_pressure(t)?))
}

/// Specific enthalpy of moist air in J/kg(DA), referenced to dry air and liquid water at 0 °C.
#[must_use]
pub fn enthalpy(t: f64, x: f64) -> f64 {
    CA * t + (CV * t + R0) * x
}

/// Humid specific heat `Ca + Cv·x` in J/(kg(DA)·K).
#[must_use]
pub fn humid_heat(x: f64) -> f64 {
    CA + CV * x
}

/// A local straight-line approximation of the saturation curve.
///
/// `xs(t) ≈ slope · t + intercept` near the point it was built at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatLine {
    pub slope: f64,
    pub intercept: f64,
}

impl SatLine {
    /// Step used for the central-difference slope, K.
    const DT: f64 = 0.01;

    /// Builds the tangent to the saturation curve at `t` °C.
    ///
    /// The line passes exactly through `(t, xs(t))`.
    ///
    /// # Errors
    ///
    /// Returns an error if `t ± 0.01` is out of range.
    pub fn linearize(t: f64) -> Result<Self, PropertyError> {
        let xs = saturation_humidity(t)?;
        let slope = (saturation_humidity(t + Self::DT)? - saturation_humidity(t - Self::DT)?)
            / (2.0 * Self::DT);

        Ok(Self {
            slope,
            intercept: xs - slope * t,
        })
    }

    /// Evaluates the line at `t` °C.
    #[must_use]
    pub fn at(&self, t: f64) -> f64 {
        self.slope * t + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn saturation_pressure_matches_tables() -> Result<(), PropertyError> {
        // ASHRAE Fundamentals, Chapter 1, Table 3.
        assert_relative_eq!(saturation_pressure(0.01)?, 611.7, max_relative = 2e-3);
        assert_relative_eq!(saturation_pressure(20.0)?, 2339.3, max_relative = 2e-3);
        assert_relative_eq!(saturation_pressure(35.0)?, 5629.0, max_relative = 2e-3);
        assert_relative_eq!(saturation_pressure(-10.0)?, 259.9, max_relative = 5e-3);
        Ok(())
    }

    #[test]
    fn saturation_humidity_matches_tables() -> Result<(), PropertyError> {
        assert_relative_eq!(saturation_humidity(20.0)?, 0.014_758, max_relative = 1e-2);
        assert_relative_eq!(saturation_humidity(35.0)?, 0.036_756, max_relative = 1e-2);
        Ok(())
    }

    #[test]
    fn out_of_range_is_an_error() {
        assert!(matches!(
            saturation_humidity(120.0),
            Err(PropertyError::OutOfRange { .. })
        ));
        assert!(saturation_pressure(f64::NAN).is_err());
        assert!(relative_humidity(20.0, -0.001).is_err());
        assert!(humidity_from_relative(20.0, 1.2).is_err());
    }

    #[test]
    fn relative_humidity_round_trip() -> Result<(), PropertyError> {
        for (t, rh) in [(5.0, 0.3), (20.0, 0.5), (35.0, 0.995)] {
            let x = humidity_from_relative(t, rh)?;
            assert_relative_eq!(relative_humidity(t, x)?, rh, max_relative = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn saturated_air_has_unit_relative_humidity() -> Result<(), PropertyError> {
        let x = saturation_humidity(25.0)?;
        assert_relative_eq!(relative_humidity(25.0, x)?, 1.0, max_relative = 1e-12);
        Ok(())
    }

    #[test]
    fn sat_line_is_tangent() -> Result<(), PropertyError> {
        let line = SatLine::linearize(25.0)?;

        assert_relative_eq!(line.at(25.0), saturation_humidity(25.0)?, max_relative = 1e-12);
        assert!(line.slope > 0.0);

        // The curve is convex, so the tangent sits below it nearby.
        let xs_27 = saturation_humidity(27.0)?;
        assert!(line.at(27.0) < xs_27);
        assert_relative_eq!(line.at(27.0), xs_27, max_relative = 1e-2);
        Ok(())
    }

    #[test]
    fn enthalpy_of_typical_air() {
        // 25 °C, 10 g/kg -> about 50.6 kJ/kg(DA)
        assert_relative_eq!(enthalpy(25.0, 0.010), 50_596.5, max_relative = 1e-9);
        assert_relative_eq!(humid_heat(0.010), 1023.46, max_relative = 1e-9);
    }
}
