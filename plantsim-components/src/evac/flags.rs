use plantsim_thermo::{
    PropertyError,
    psychro::{SatLine, relative_humidity},
};

/// Relative humidity above which incoming wet air is taken as saturated.
pub(super) const SATURATED_RH: f64 = 0.99;

/// Why a layer does not evaporate during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// The wet air already passed a suppressed layer.
    Upstream,
    /// The surface holds less moisture at saturation than the incoming air.
    SurfaceBelowAir,
    /// The incoming air is at or near saturation.
    Saturated,
}

/// Evaporation state of one layer for the current build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LayerFlag {
    /// Saturation line at the previous surface temperature.
    pub line: SatLine,
    /// Saturation humidity at the previous surface temperature, kg/kg.
    pub xs: f64,
    pub suppression: Option<Suppression>,
}

impl LayerFlag {
    pub fn evaporating(&self) -> bool {
        self.suppression.is_none()
    }
}

/// Evaluates evaporation flags along the wet-air path.
///
/// Wet air enters at layer `N − 1` with state `inlet` and leaves from layer
/// 0, so layer `i` receives the air leaving layer `i + 1`, whose previous
/// state is `wet[i + 1]`. States are `(temperature °C, humidity kg/kg)`.
///
/// Once a layer is suppressed every layer downstream of it is too.
///
/// # Errors
///
/// Returns an error if a surface or air temperature is outside the range of
/// the saturation correlation.
pub(super) fn scan(
    surface: &[f64],
    wet: &[(f64, f64)],
    inlet: (f64, f64),
) -> Result<Vec<LayerFlag>, PropertyError> {
    let n = surface.len();
    let mut flags = Vec::with_capacity(n);
    let mut blocked = false;

    for i in (0..n).rev() {
        let line = SatLine::linearize(surface[i])?;
        let xs = line.at(surface[i]);
        let (t_air, x_air) = if i + 1 == n { inlet } else { wet[i + 1] };

        let suppression = if blocked {
            Some(Suppression::Upstream)
        } else if xs < x_air {
            Some(Suppression::SurfaceBelowAir)
        } else if relative_humidity(t_air, x_air)? > SATURATED_RH {
            Some(Suppression::Saturated)
        } else {
            None
        };
        blocked = suppression.is_some();

        flags.push(LayerFlag {
            line,
            xs,
            suppression,
        });
    }

    flags.reverse();
    Ok(flags)
}
