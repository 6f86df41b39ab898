//! Connection points between equipment and the plant network.
//!
//! Every equipment instance owns a list of [`Inlet`]s and [`Outlet`]s.
//! The network resolver writes flows into inlets before the coefficient
//! phase; the equipment writes a linear characteristic equation into each
//! outlet; the plant solver then writes solved values back.
//!
//! Each outlet carries one equation of the form
//!
//! ```text
//! coeffo · sysv + Σ coeffin[i] · sysvin[i] = co
//! ```
//!
//! where `sysvin[i]` is the solved value at the equipment's `i`th inlet.

use thiserror::Error;

/// What a terminal carries, which fixes the meaning of its system value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluidKind {
    /// Liquid water; the system value is a temperature in °C.
    Water,
    /// Moist air, temperature channel; the system value is °C.
    AirTemperature,
    /// Moist air, humidity channel; the system value is kg/kg(DA).
    AirHumidity,
}

/// Errors raised when terminal wiring and coefficient vectors disagree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerminalError {
    #[error("terminal `{terminal}` expects {expected} inputs, got {found}")]
    InputCount {
        terminal: String,
        expected: usize,
        found: usize,
    },

    #[error("terminal `{terminal}` has a zero self coefficient")]
    ZeroSelfCoefficient { terminal: String },
}

/// An inbound connection point (ELIN).
#[derive(Debug, Clone, PartialEq)]
pub struct Inlet {
    name: String,
    fluid: FluidKind,
    flow: f64,
    sysvin: f64,
}

impl Inlet {
    #[must_use]
    pub fn new(name: impl Into<String>, fluid: FluidKind) -> Self {
        Self {
            name: name.into(),
            fluid,
            flow: 0.0,
            sysvin: 0.0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fluid(&self) -> FluidKind {
        self.fluid
    }

    /// Mass flow rate in kg/s, as set by the network resolver.
    #[must_use]
    pub fn flow(&self) -> f64 {
        self.flow
    }

    /// Sets the mass flow rate in kg/s.
    ///
    /// Negative or non-finite rates are stored as zero; a reversed branch is
    /// the network's concern, not the equipment's.
    pub fn set_flow(&mut self, flow: f64) {
        self.flow = if flow.is_finite() && flow > 0.0 {
            flow
        } else {
            0.0
        };
    }

    /// Returns `true` if the inlet carries a positive flow.
    #[must_use]
    pub fn has_flow(&self) -> bool {
        self.flow > 0.0
    }

    /// The most recently solved value at this inlet.
    #[must_use]
    pub fn sysvin(&self) -> f64 {
        self.sysvin
    }

    pub fn set_sysvin(&mut self, value: f64) {
        self.sysvin = value;
    }
}

/// An outbound connection point (ELOUT) carrying one characteristic equation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outlet {
    name: String,
    fluid: FluidKind,
    flow: f64,
    coeffo: f64,
    co: f64,
    coeffin: Vec<f64>,
    sysv: f64,
}

impl Outlet {
    /// Creates an outlet wired to `inputs` upstream inlets.
    ///
    /// The coefficient vector length is fixed here and never changes.
    /// Until coefficients are written the outlet reads `sysv = 0`.
    #[must_use]
    pub fn new(name: impl Into<String>, fluid: FluidKind, inputs: usize) -> Self {
        Self {
            name: name.into(),
            fluid,
            flow: 0.0,
            coeffo: 1.0,
            co: 0.0,
            coeffin: vec![0.0; inputs],
            sysv: 0.0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fluid(&self) -> FluidKind {
        self.fluid
    }

    /// Mass flow rate leaving through this outlet in kg/s.
    #[must_use]
    pub fn flow(&self) -> f64 {
        self.flow
    }

    pub fn set_flow(&mut self, flow: f64) {
        self.flow = flow;
    }

    #[must_use]
    pub fn coeffo(&self) -> f64 {
        self.coeffo
    }

    #[must_use]
    pub fn co(&self) -> f64 {
        self.co
    }

    #[must_use]
    pub fn coeffin(&self) -> &[f64] {
        &self.coeffin
    }

    /// The solved value at this outlet.
    #[must_use]
    pub fn sysv(&self) -> f64 {
        self.sysv
    }

    pub fn set_sysv(&mut self, value: f64) {
        self.sysv = value;
    }

    /// Writes a full characteristic equation.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::InputCount`] if `coeffin` does not match the
    /// number of inputs this outlet was wired with, or
    /// [`TerminalError::ZeroSelfCoefficient`] if `coeffo` is zero.
    pub fn set_coefficients(
        &mut self,
        coeffo: f64,
        co: f64,
        coeffin: &[f64],
    ) -> Result<(), TerminalError> {
        self.check_inputs(coeffin.len())?;
        if coeffo == 0.0 {
            return Err(TerminalError::ZeroSelfCoefficient {
                terminal: self.name.clone(),
            });
        }

        self.coeffo = coeffo;
        self.co = co;
        self.coeffin.copy_from_slice(coeffin);
        Ok(())
    }

    /// Writes `sysv = sysvin[input]`, an outlet that copies one inlet.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::InputCount`] if `input` is not a wired input.
    pub fn set_pass_through(&mut self, input: usize) -> Result<(), TerminalError> {
        if input >= self.coeffin.len() {
            return Err(TerminalError::InputCount {
                terminal: self.name.clone(),
                expected: self.coeffin.len(),
                found: input + 1,
            });
        }

        self.coeffo = 1.0;
        self.co = 0.0;
        self.coeffin.fill(0.0);
        self.coeffin[input] = -1.0;
        Ok(())
    }

    /// Writes `sysv = value`, an outlet independent of every inlet.
    pub fn set_constant(&mut self, value: f64) {
        self.coeffo = 1.0;
        self.co = value;
        self.coeffin.fill(0.0);
    }

    /// Returns the outlet value implied by the current coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::InputCount`] if `inputs` has the wrong length.
    pub fn evaluate(&self, inputs: &[f64]) -> Result<f64, TerminalError> {
        self.check_inputs(inputs.len())?;
        let upstream: f64 = self
            .coeffin
            .iter()
            .zip(inputs)
            .map(|(coeff, value)| coeff * value)
            .sum();
        Ok((self.co - upstream) / self.coeffo)
    }

    /// Evaluates the equation against `inlets` and stores the result as `sysv`.
    ///
    /// Stands in for the plant solver when the network is open-loop.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::InputCount`] if `inlets` has the wrong length.
    pub fn resolve(&mut self, inlets: &[Inlet]) -> Result<f64, TerminalError> {
        let inputs: Vec<f64> = inlets.iter().map(Inlet::sysvin).collect();
        let value = self.evaluate(&inputs)?;
        self.sysv = value;
        Ok(value)
    }

    fn check_inputs(&self, found: usize) -> Result<(), TerminalError> {
        if found == self.coeffin.len() {
            Ok(())
        } else {
            Err(TerminalError::InputCount {
                terminal: self.name.clone(),
                expected: self.coeffin.len(),
                found,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn evaluate_follows_sign_convention() -> Result<(), TerminalError> {
        // 2·out − 0.5·a − 0.25·b = 3
        let mut out = Outlet::new("o", FluidKind::Water, 2);
        out.set_coefficients(2.0, 3.0, &[-0.5, -0.25])?;

        let value = out.evaluate(&[10.0, 20.0])?;
        assert_relative_eq!(value, (3.0 + 5.0 + 5.0) / 2.0);
        Ok(())
    }

    #[test]
    fn wrong_input_count_is_rejected() {
        let mut out = Outlet::new("o", FluidKind::Water, 2);
        assert_eq!(
            out.set_coefficients(1.0, 0.0, &[1.0]),
            Err(TerminalError::InputCount {
                terminal: "o".into(),
                expected: 2,
                found: 1,
            })
        );
        assert!(out.evaluate(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn zero_self_coefficient_is_rejected() {
        let mut out = Outlet::new("o", FluidKind::Water, 1);
        assert!(matches!(
            out.set_coefficients(0.0, 1.0, &[0.0]),
            Err(TerminalError::ZeroSelfCoefficient { .. })
        ));
    }

    #[test]
    fn pass_through_copies_one_inlet() -> Result<(), TerminalError> {
        let mut inlets = [
            Inlet::new("t", FluidKind::AirTemperature),
            Inlet::new("x", FluidKind::AirHumidity),
        ];
        inlets[0].set_sysvin(30.0);
        inlets[1].set_sysvin(0.012);

        let mut out = Outlet::new("x_out", FluidKind::AirHumidity, 2);
        out.set_pass_through(1)?;
        assert_relative_eq!(out.resolve(&inlets)?, 0.012);
        assert_relative_eq!(out.sysv(), 0.012);

        assert!(out.set_pass_through(2).is_err());
        Ok(())
    }

    #[test]
    fn negative_flows_are_clamped() {
        let mut inlet = Inlet::new("in", FluidKind::Water);
        inlet.set_flow(-0.3);
        assert!(!inlet.has_flow());
        inlet.set_flow(f64::NAN);
        assert_eq!(inlet.flow(), 0.0);
        inlet.set_flow(0.2);
        assert!(inlet.has_flow());
    }
}
