//! Tank matrix assembly and its cached inverse.
//!
//! Unknowns are the layer temperatures (`0..n`, top first) followed by one
//! coil fluid temperature per segment of every coil port, in port order.
//! The system reads
//!
//! ```text
//! U · x = R + Σ_j b_j · Tin_j
//! ```
//!
//! where `R` holds the previous temperatures and ambient losses, and `b_j` is
//! the sensitivity of the right-hand side to the inlet temperature of port
//! `j`. `U` depends only on the [`SystemKey`], so `UX = U⁻¹` and every
//! `UX · b_j` are kept until the key changes.

use plantsim_solve::{DenseMatrix, InversionError};

use crate::stank::catalog::{PortKind, StankCatalog};

/// Everything `U` depends on.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct SystemKey {
    /// Port capacitance rates, W/K.
    pub rates: Vec<f64>,
    /// Coil segment effectiveness per port; empty for direct ports.
    pub segments: Vec<Vec<f64>>,
    pub filled: Vec<bool>,
    /// Timestep, s.
    pub timestep: f64,
}

/// Position of each port's unknowns in the tank system.
#[derive(Debug, Clone)]
struct Layout {
    paths: Vec<Vec<usize>>,
    /// Index of the first coil segment unknown, for coil ports.
    coils: Vec<Option<usize>>,
    size: usize,
}

impl Layout {
    fn new(catalog: &StankCatalog) -> Self {
        let mut size = catalog.layers();
        let mut paths = Vec::with_capacity(catalog.ports().len());
        let mut coils = Vec::with_capacity(catalog.ports().len());

        for port in catalog.ports() {
            let path = port.path();
            if port.is_coil() {
                coils.push(Some(size));
                size += path.len();
            } else {
                coils.push(None);
            }
            paths.push(path);
        }

        Self { paths, coils, size }
    }
}

/// An inverted tank system ready to map inlet temperatures to unknowns.
#[derive(Debug, Clone)]
pub(super) struct TankSystem {
    key: SystemKey,
    inverse: DenseMatrix,
    /// `UX · b_j` per port.
    sensitivities: Vec<Vec<f64>>,
    /// Unknown read by each port's outlet.
    outlets: Vec<usize>,
}

impl TankSystem {
    /// Assembles and inverts the tank matrix for `key`.
    ///
    /// # Errors
    ///
    /// Returns an [`InversionError`] if the matrix cannot be inverted.
    pub fn build(catalog: &StankCatalog, key: SystemKey) -> Result<Self, InversionError> {
        let layout = Layout::new(catalog);
        let (mut matrix, inputs) = assemble(catalog, &key, &layout);
        matrix.invert()?;

        let sensitivities = inputs.iter().map(|b| matrix.mul_vec(b)).collect();
        let outlets = layout
            .paths
            .iter()
            .zip(&layout.coils)
            .zip(&key.rates)
            .map(|((path, coil), &rate)| {
                let last = path.len() - 1;
                match coil {
                    Some(start) if rate > 0.0 => start + last,
                    _ => path[last],
                }
            })
            .collect();

        Ok(Self {
            key,
            inverse: matrix,
            sensitivities,
            outlets,
        })
    }

    pub fn key(&self) -> &SystemKey {
        &self.key
    }

    /// Number of unknowns.
    pub fn size(&self) -> usize {
        self.inverse.dim()
    }

    /// Returns `UX · R`.
    pub fn constants(&self, rhs: &[f64]) -> Vec<f64> {
        self.inverse.mul_vec(rhs)
    }

    /// Returns `UX · b_j` for port `j`.
    pub fn sensitivity(&self, port: usize) -> &[f64] {
        &self.sensitivities[port]
    }

    /// Unknown whose value leaves through port `j`'s outlet.
    pub fn outlet(&self, port: usize) -> usize {
        self.outlets[port]
    }

    /// Recovers every unknown from `UX · R` and the solved inlet values.
    pub fn solve(&self, constants: &[f64], inlets: &[f64]) -> Vec<f64> {
        let mut x = constants.to_vec();
        for (sensitivity, &tin) in self.sensitivities.iter().zip(inlets) {
            for (xi, s) in x.iter_mut().zip(sensitivity) {
                *xi += s * tin;
            }
        }
        x
    }
}

/// Number of unknowns for a tank catalog.
pub(super) fn system_size(catalog: &StankCatalog) -> usize {
    Layout::new(catalog).size
}

/// Builds `R` from the previous layer temperatures.
///
/// Filled layers carry `Mdt·T_old + KA·T_env`, empty layers hold `T_old`,
/// and coil rows are zero.
pub(super) fn constant_rhs(
    catalog: &StankCatalog,
    key: &SystemKey,
    previous: &[f64],
    ambient: f64,
) -> Vec<f64> {
    let mdt = capacity_per_step(catalog, key.timestep);
    let mut rhs = vec![0.0; system_size(catalog)];
    for (i, (&t, &filled)) in previous.iter().zip(&key.filled).enumerate() {
        rhs[i] = if filled {
            mdt * t + catalog.layer_conductance(i) * ambient
        } else {
            t
        };
    }
    rhs
}

/// `m·Cp/Δt` for one full layer, W/K.
fn capacity_per_step(catalog: &StankCatalog, timestep: f64) -> f64 {
    catalog.layer_mass() * catalog.specific_heat() / timestep
}

/// Fills `U` and the inlet sensitivities `b_j`.
fn assemble(
    catalog: &StankCatalog,
    key: &SystemKey,
    layout: &Layout,
) -> (DenseMatrix, Vec<Vec<f64>>) {
    let n = catalog.layers();
    let mdt = capacity_per_step(catalog, key.timestep);
    let mixing = catalog.mixing_conductance();

    let mut u = DenseMatrix::zeros(layout.size);
    let mut inputs = vec![vec![0.0; layout.size]; catalog.ports().len()];

    for i in 0..n {
        if !key.filled[i] {
            u[(i, i)] = 1.0;
            continue;
        }
        u.add(i, i, mdt + catalog.layer_conductance(i));
        for adj in [i.checked_sub(1), Some(i + 1)].into_iter().flatten() {
            if adj < n && key.filled[adj] {
                u.add(i, i, mixing);
                u.add(i, adj, -mixing);
            }
        }
    }

    for (j, port) in catalog.ports().iter().enumerate() {
        let path = &layout.paths[j];
        let c = key.rates[j];
        let b = &mut inputs[j];

        match (port.kind, layout.coils[j]) {
            (PortKind::Direct, _) => {
                if c <= 0.0 {
                    continue;
                }
                for (s, &p) in path.iter().enumerate() {
                    u.add(p, p, c);
                    if s == 0 {
                        b[p] += c;
                    } else {
                        u.add(p, path[s - 1], -c);
                    }
                }
            }
            (PortKind::Coil(_), Some(start)) => {
                let eps = &key.segments[j];
                for (s, &p) in path.iter().enumerate() {
                    let us = start + s;
                    u[(us, us)] = 1.0;
                    if c <= 0.0 {
                        continue;
                    }

                    // θ_s = (1 − ε)·θ_{s−1} + ε·T_p
                    u.add(us, p, -eps[s]);
                    // Layer gains c·ε·(θ_{s−1} − T_p).
                    u.add(p, p, c * eps[s]);
                    if s == 0 {
                        b[us] += 1.0 - eps[s];
                        b[p] += c * eps[s];
                    } else {
                        u.add(us, us - 1, -(1.0 - eps[s]));
                        u.add(p, us - 1, -c * eps[s]);
                    }
                }
            }
            (PortKind::Coil(_), None) => {}
        }
    }

    (u, inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::stank::catalog::{RawKaInput, RawPort, RawPortKind, RawStankCatalog};

    fn catalog(layers: usize, ports: Vec<RawPort>) -> StankCatalog {
        let raw = RawStankCatalog {
            volume: Some(0.5),
            layers: Some(layers),
            ua_side: Some(3.0),
            ua_top: Some(0.4),
            ua_bottom: Some(0.4),
            mixing_conductance: Some(5.0),
            ports,
            ..RawStankCatalog::default()
        };
        match StankCatalog::validate("t", raw) {
            Ok(cat) => cat,
            Err(err) => panic!("invalid test catalog: {err}"),
        }
    }

    fn direct(inlet: usize, outlet: usize) -> RawPort {
        RawPort {
            name: "load".into(),
            kind: RawPortKind::Direct,
            inlet_layer: Some(inlet),
            outlet_layer: Some(outlet),
            ka_input: None,
            ka: None,
            effectiveness: None,
            diameter: None,
            length: None,
        }
    }

    fn coil(inlet: usize, outlet: usize) -> RawPort {
        RawPort {
            name: "coil".into(),
            kind: RawPortKind::Coil,
            ka_input: Some(RawKaInput::Conductance),
            ka: Some(400.0),
            ..direct(inlet, outlet)
        }
    }

    fn key(cat: &StankCatalog, rates: Vec<f64>) -> SystemKey {
        let segments = cat
            .ports()
            .iter()
            .zip(&rates)
            .map(|(p, &c)| {
                if p.is_coil() {
                    let m = p.path().len();
                    vec![if c > 0.0 { 0.3 } else { 0.0 }; m]
                } else {
                    Vec::new()
                }
            })
            .collect();
        SystemKey {
            rates,
            segments,
            filled: vec![true; cat.layers()],
            timestep: 600.0,
        }
    }

    #[test]
    fn inverse_round_trips() -> Result<(), InversionError> {
        for n in [1, 3, 10] {
            let cat = catalog(n, vec![direct(0, n - 1), coil(n - 1, 0)]);
            let key = key(&cat, vec![0.1 * 4186.0, 0.2 * 4186.0]);
            let layout = Layout::new(&cat);
            assert_eq!(layout.size, 2 * n);

            let (u, _) = assemble(&cat, &key, &layout);
            let mut ux = u.clone();
            ux.invert()?;

            let product = u.mul_mat(&ux);
            for r in 0..layout.size {
                for c in 0..layout.size {
                    let expected = if r == c { 1.0 } else { 0.0 };
                    assert_relative_eq!(product[(r, c)], expected, epsilon = 1e-9);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn still_tank_stays_at_ambient() -> Result<(), InversionError> {
        let cat = catalog(4, vec![direct(0, 3)]);
        let key = key(&cat, vec![0.0]);
        let system = TankSystem::build(&cat, key.clone())?;

        let rhs = constant_rhs(&cat, &key, &[15.0; 4], 15.0);
        let x = system.solve(&system.constants(&rhs), &[80.0]);
        for t in x {
            assert_relative_eq!(t, 15.0, epsilon = 1e-10);
        }
        Ok(())
    }

    #[test]
    fn outlets_follow_flow_state() -> Result<(), InversionError> {
        let cat = catalog(3, vec![direct(2, 0), coil(0, 2)]);

        let flowing = TankSystem::build(&cat, key(&cat, vec![100.0, 100.0]))?;
        assert_eq!(flowing.outlet(0), 0);
        assert_eq!(flowing.outlet(1), 3 + 2);

        let idle = TankSystem::build(&cat, key(&cat, vec![100.0, 0.0]))?;
        assert_eq!(idle.outlet(1), 2);
        Ok(())
    }

    #[test]
    fn empty_layers_hold_their_temperature() -> Result<(), InversionError> {
        let cat = catalog(3, vec![]);
        let mut key = key(&cat, vec![]);
        key.filled = vec![false, true, true];
        let system = TankSystem::build(&cat, key.clone())?;

        let rhs = constant_rhs(&cat, &key, &[60.0, 30.0, 30.0], 30.0);
        let x = system.solve(&system.constants(&rhs), &[]);
        assert_relative_eq!(x[0], 60.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 30.0, epsilon = 1e-10);
        Ok(())
    }

    #[test]
    fn coil_fluid_cools_along_its_path() -> Result<(), InversionError> {
        let cat = catalog(3, vec![coil(0, 2)]);
        let key = key(&cat, vec![200.0]);
        let system = TankSystem::build(&cat, key.clone())?;

        let rhs = constant_rhs(&cat, &key, &[20.0; 3], 20.0);
        let x = system.solve(&system.constants(&rhs), &[70.0]);

        let fluid = &x[3..6];
        assert!(fluid[0] < 70.0);
        assert!(fluid[1] < fluid[0]);
        assert!(fluid[2] < fluid[1]);
        assert!(x[0] > x[1] && x[1] > x[2] && x[2] > 20.0);
        Ok(())
    }
}
