//! Cooler matrix assembly.
//!
//! Each layer has five unknowns, `unknown(i, var)`. Dry air runs from layer
//! 0 to `N − 1`, wet air from `N − 1` to 0, and every balance is written
//! upwind against the neighbouring layer the air came from:
//!
//! ```text
//! U · x = C + Σ_m B_m · in_m
//! ```
//!
//! with `in_m` the four inlet values in [`Channel`] order.

use plantsim_solve::{DenseMatrix, InversionError};
use plantsim_thermo::R0;

use crate::evac::{Channel, EvacCatalog, flags::LayerFlag};

/// Per-layer unknowns in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Var {
    WetTemperature = 0,
    WetHumidity = 1,
    Surface = 2,
    DryTemperature = 3,
    DryHumidity = 4,
}

pub(super) const VARS: usize = 5;

/// Index of `var` in layer `layer`.
pub(super) fn unknown(layer: usize, var: Var) -> usize {
    VARS * layer + var as usize
}

/// Unknown that leaves through `channel`'s outlet.
pub(super) fn outlet_unknown(channel: Channel, layers: usize) -> usize {
    match channel {
        Channel::DryTemperature => unknown(layers - 1, Var::DryTemperature),
        Channel::DryHumidity => unknown(layers - 1, Var::DryHumidity),
        Channel::WetTemperature => unknown(0, Var::WetTemperature),
        Channel::WetHumidity => unknown(0, Var::WetHumidity),
    }
}

/// Flow state of both air streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Streams {
    /// Dry air mass flow, kg/s.
    pub dry_flow: f64,
    /// Dry side humid heat at the inlet, J/(kg·K).
    pub dry_heat: f64,
    /// Wet air mass flow, kg/s.
    pub wet_flow: f64,
    /// Wet side humid heat at the inlet, J/(kg·K).
    pub wet_heat: f64,
}

/// Per-layer transfer coefficients for one build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LayerTransfer {
    pub flag: LayerFlag,
    /// Mass transfer coefficient, kg/(m²·s); zero when not evaporating.
    pub kx: f64,
}

/// An inverted cooler system.
#[derive(Debug, Clone)]
pub(super) struct EvacSystem {
    /// `UX · C`.
    constants: Vec<f64>,
    /// `UX · B_m` per inlet channel.
    sensitivities: [Vec<f64>; 4],
}

impl EvacSystem {
    /// Assembles and inverts the cooler matrix.
    ///
    /// # Errors
    ///
    /// Returns an [`InversionError`] if the matrix cannot be inverted.
    pub fn build(
        catalog: &EvacCatalog,
        streams: &Streams,
        layers: &[LayerTransfer],
    ) -> Result<Self, InversionError> {
        let (mut matrix, c, b) = assemble(catalog, streams, layers);
        matrix.invert()?;

        let constants = matrix.mul_vec(&c);
        let sensitivities = b.map(|b| matrix.mul_vec(&b));
        Ok(Self {
            constants,
            sensitivities,
        })
    }

    /// Outlet equation for unknown `index`: `(co, coeffin)`.
    pub fn outlet_coefficients(&self, index: usize) -> (f64, [f64; 4]) {
        let coeffin = [0, 1, 2, 3].map(|m| -self.sensitivities[m][index]);
        (self.constants[index], coeffin)
    }

    /// Recovers every unknown from solved inlet values.
    pub fn solve(&self, inlets: &[f64; 4]) -> Vec<f64> {
        let mut x = self.constants.clone();
        for (sensitivity, &value) in self.sensitivities.iter().zip(inlets) {
            for (xi, s) in x.iter_mut().zip(sensitivity) {
                *xi += s * value;
            }
        }
        x
    }
}

/// Fills `U`, `C`, and the four inlet vectors `B_m`.
fn assemble(
    catalog: &EvacCatalog,
    streams: &Streams,
    layers: &[LayerTransfer],
) -> (DenseMatrix, Vec<f64>, [Vec<f64>; 4]) {
    let n = layers.len();
    let size = VARS * n;
    let mut u = DenseMatrix::zeros(size);
    let mut c = vec![0.0; size];
    let mut b: [Vec<f64>; 4] = std::array::from_fn(|_| vec![0.0; size]);

    let hd_a = catalog.h_dry() * catalog.dry_area();
    let hw_a = catalog.h_wet() * catalog.wet_area();
    let gd_c = streams.dry_flow * streams.dry_heat;
    let gw_c = streams.wet_flow * streams.wet_heat;
    let gw = streams.wet_flow;

    for (i, layer) in layers.iter().enumerate() {
        let idx = |var| unknown(i, var);
        let kx_a = layer.kx * catalog.wet_area();
        let a = layer.flag.line.slope;
        let bs = layer.flag.line.intercept;

        // Dry temperature.
        let row = idx(Var::DryTemperature);
        u.add(row, row, gd_c + hd_a);
        u.add(row, idx(Var::Surface), -hd_a);
        if i == 0 {
            b[Channel::DryTemperature as usize][row] += gd_c;
        } else {
            u.add(row, unknown(i - 1, Var::DryTemperature), -gd_c);
        }

        // Dry humidity is carried through unchanged.
        let row = idx(Var::DryHumidity);
        u.add(row, row, 1.0);
        if i == 0 {
            b[Channel::DryHumidity as usize][row] += 1.0;
        } else {
            u.add(row, unknown(i - 1, Var::DryHumidity), -1.0);
        }

        // Wet temperature.
        let row = idx(Var::WetTemperature);
        u.add(row, row, gw_c + hw_a);
        u.add(row, idx(Var::Surface), -hw_a);
        if i + 1 == n {
            b[Channel::WetTemperature as usize][row] += gw_c;
        } else {
            u.add(row, unknown(i + 1, Var::WetTemperature), -gw_c);
        }

        // Wet humidity, with xs ≈ a·Ts + b at the surface.
        let row = idx(Var::WetHumidity);
        u.add(row, row, gw + kx_a);
        u.add(row, idx(Var::Surface), -kx_a * a);
        c[row] += kx_a * bs;
        if i + 1 == n {
            b[Channel::WetHumidity as usize][row] += gw;
        } else {
            u.add(row, unknown(i + 1, Var::WetHumidity), -gw);
        }

        // Surface: sensible heat from the dry side leaves as sensible and
        // latent heat on the wet side.
        let row = idx(Var::Surface);
        u.add(row, row, hd_a + hw_a + R0 * kx_a * a);
        u.add(row, idx(Var::DryTemperature), -hd_a);
        u.add(row, idx(Var::WetTemperature), -hw_a);
        u.add(row, idx(Var::WetHumidity), -R0 * kx_a);
        c[row] -= R0 * kx_a * bs;
    }

    (u, c, b)
}
