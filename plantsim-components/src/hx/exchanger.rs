use std::rc::Rc;

use plantsim_core::{
    Equipment, FluidKind, Inlet, Outlet, Settlement, TerminalError,
    constraint::ConstraintError,
};
use plantsim_thermo::{CA, CW};
use thiserror::Error;
use uom::si::{
    f64::{Power, ThermalConductance},
    power::watt,
    thermal_conductance::watt_per_kelvin,
};

use crate::hx::{CapacitanceRate, Effectiveness, HexCatalog, temperature_effectiveness};

/// Errors raised by a [`Hex`].
#[derive(Debug, Error)]
pub enum HexError {
    #[error("heat exchanger `{name}`: invalid operating point")]
    Constraint {
        name: String,
        #[source]
        source: ConstraintError,
    },

    #[error("heat exchanger `{name}` cannot carry {fluid:?}")]
    Fluid { name: String, fluid: FluidKind },

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// Quantities produced by one [`Hex`] settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexReport {
    pub settlement: Settlement,
    /// Heat moved from the first stream to the second.
    pub heat_flow: Power,
    /// Temperature effectiveness of each stream.
    pub effectiveness: [Effectiveness; 2],
}

/// A two-stream counter-flow heat exchanger.
///
/// Inlet and outlet 0 carry the first stream, 1 the second. Each outlet
/// depends on both inlets:
///
/// ```text
/// T_out,0 = (1 − ε₀)·T_in,0 + ε₀·T_in,1
/// ```
///
/// where `ε₀` is the temperature effectiveness of stream 0 against stream 1
/// (see [`temperature_effectiveness`]). Stream 1 is symmetric. With no flow
/// on either side both outlets copy their own inlet.
#[derive(Debug, Clone)]
pub struct Hex {
    name: String,
    catalog: Rc<HexCatalog>,
    inlets: Vec<Inlet>,
    outlets: Vec<Outlet>,
    operating: Option<Operating>,
}

#[derive(Debug, Clone, Copy)]
struct Operating {
    effectiveness: [Effectiveness; 2],
    /// `ε₀·C₀` in W/K.
    conductance: f64,
}

impl Hex {
    /// Creates an exchanger carrying `fluids` on its two streams.
    ///
    /// # Errors
    ///
    /// Returns [`HexError::Fluid`] if a stream is a humidity channel.
    pub fn new(
        name: impl Into<String>,
        catalog: Rc<HexCatalog>,
        fluids: [FluidKind; 2],
    ) -> Result<Self, HexError> {
        let name = name.into();
        for fluid in fluids {
            specific_heat(&name, fluid)?;
        }

        let inlets = fluids
            .iter()
            .enumerate()
            .map(|(i, &fluid)| Inlet::new(format!("{name}:{i}:in"), fluid))
            .collect();
        let outlets = fluids
            .iter()
            .enumerate()
            .map(|(i, &fluid)| Outlet::new(format!("{name}:{i}:out"), fluid, 2))
            .collect();

        Ok(Self {
            name,
            catalog,
            inlets,
            outlets,
            operating: None,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &HexCatalog {
        &self.catalog
    }

    fn capacitance_rates(&self) -> Result<[f64; 2], HexError> {
        let mut rates = [0.0; 2];
        for (rate, inlet) in rates.iter_mut().zip(&self.inlets) {
            *rate = inlet.flow() * specific_heat(&self.name, inlet.fluid())?;
        }
        Ok(rates)
    }
}

impl Equipment for Hex {
    type Report = HexReport;
    type Error = HexError;

    fn name(&self) -> &str {
        &self.name
    }

    fn inlets(&self) -> &[Inlet] {
        &self.inlets
    }

    fn inlets_mut(&mut self) -> &mut [Inlet] {
        &mut self.inlets
    }

    fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    fn outlets_mut(&mut self) -> &mut [Outlet] {
        &mut self.outlets
    }

    fn update_coefficients(&mut self) -> Result<(), HexError> {
        let rates = self.capacitance_rates()?;
        for (outlet, inlet) in self.outlets.iter_mut().zip(&self.inlets) {
            outlet.set_flow(inlet.flow());
        }

        if rates.iter().any(|&c| c <= 0.0) {
            self.operating = None;
            for (i, outlet) in self.outlets.iter_mut().enumerate() {
                outlet.set_pass_through(i)?;
            }
            return Ok(());
        }

        let constraint = |source| HexError::Constraint {
            name: self.name.clone(),
            source,
        };
        let ua = ThermalConductance::new::<watt_per_kelvin>(self.catalog.ua());
        let first = CapacitanceRate::new::<watt_per_kelvin>(rates[0]).map_err(constraint)?;
        let second = CapacitanceRate::new::<watt_per_kelvin>(rates[1]).map_err(constraint)?;
        let effectiveness = [
            temperature_effectiveness(first, second, ua).map_err(constraint)?,
            temperature_effectiveness(second, first, ua).map_err(constraint)?,
        ];

        let k = effectiveness.map(|e| e.value());
        let conductance = k[0] * rates[0];

        self.outlets[0].set_coefficients(1.0, 0.0, &[-(1.0 - k[0]), -k[0]])?;
        self.outlets[1].set_coefficients(1.0, 0.0, &[-k[1], -(1.0 - k[1])])?;

        self.operating = Some(Operating {
            effectiveness,
            conductance,
        });
        Ok(())
    }

    fn settle(&mut self) -> Result<HexReport, HexError> {
        let (heat_flow, effectiveness) = match self.operating {
            Some(op) => {
                let dt = self.inlets[0].sysvin() - self.inlets[1].sysvin();
                (op.conductance * dt, op.effectiveness)
            }
            None => (0.0, [Effectiveness::zero(); 2]),
        };

        Ok(HexReport {
            settlement: Settlement::unchanged(),
            heat_flow: Power::new::<watt>(heat_flow),
            effectiveness,
        })
    }
}

fn specific_heat(name: &str, fluid: FluidKind) -> Result<f64, HexError> {
    match fluid {
        FluidKind::Water => Ok(CW),
        FluidKind::AirTemperature => Ok(CA),
        FluidKind::AirHumidity => Err(HexError::Fluid {
            name: name.to_owned(),
            fluid,
        }),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::hx::RawHexCatalog;

    fn exchanger(ua: f64) -> Result<Hex, Box<dyn std::error::Error>> {
        let catalog = Rc::new(HexCatalog::validate("plate", RawHexCatalog { ua: Some(ua) })?);
        Ok(Hex::new("hx1", catalog, [FluidKind::Water; 2])?)
    }

    fn solve(hex: &mut Hex) -> Result<[f64; 2], TerminalError> {
        let inlets = hex.inlets.clone();
        Ok([
            hex.outlets[0].resolve(&inlets)?,
            hex.outlets[1].resolve(&inlets)?,
        ])
    }

    #[test]
    fn balanced_streams() -> Result<(), Box<dyn std::error::Error>> {
        // NTU = 1 with C = 1: ε = 0.5
        let mut hex = exchanger(CW * 0.2)?;
        for (inlet, t) in hex.inlets_mut().iter_mut().zip([80.0, 20.0]) {
            inlet.set_flow(0.2);
            inlet.set_sysvin(t);
        }

        hex.update_coefficients()?;
        let [hot, cold] = solve(&mut hex)?;
        assert_relative_eq!(hot, 50.0, epsilon = 1e-12);
        assert_relative_eq!(cold, 50.0, epsilon = 1e-12);

        let report = hex.settle()?;
        for effectiveness in report.effectiveness {
            assert_relative_eq!(effectiveness.value(), 0.5, epsilon = 1e-12);
        }
        assert_relative_eq!(
            report.heat_flow.get::<watt>(),
            0.2 * CW * 30.0,
            max_relative = 1e-12
        );
        Ok(())
    }

    #[test]
    fn energy_balances_for_unequal_streams() -> Result<(), Box<dyn std::error::Error>> {
        let mut hex = exchanger(2500.0)?;
        hex.inlets[0].set_flow(0.1);
        hex.inlets[0].set_sysvin(60.0);
        hex.inlets[1].set_flow(0.4);
        hex.inlets[1].set_sysvin(10.0);

        hex.update_coefficients()?;
        let [first, second] = solve(&mut hex)?;
        let q_first = 0.1 * CW * (60.0 - first);
        let q_second = 0.4 * CW * (second - 10.0);
        assert_relative_eq!(q_first, q_second, max_relative = 1e-12);

        let report = hex.settle()?;
        assert_relative_eq!(report.heat_flow.get::<watt>(), q_first, max_relative = 1e-12);
        Ok(())
    }

    #[test]
    fn larger_stream_is_limited_by_the_smaller() -> Result<(), Box<dyn std::error::Error>> {
        // Huge UA: the small stream reaches the large stream's inlet, and the
        // large stream moves a quarter of the span.
        let mut hex = exchanger(1e9)?;
        hex.inlets[0].set_flow(0.4);
        hex.inlets[0].set_sysvin(60.0);
        hex.inlets[1].set_flow(0.1);
        hex.inlets[1].set_sysvin(20.0);

        hex.update_coefficients()?;
        let [large, small] = solve(&mut hex)?;
        assert_relative_eq!(small, 60.0, max_relative = 1e-9);
        assert_relative_eq!(large, 50.0, max_relative = 1e-9);

        let [eff_large, eff_small] = hex.settle()?.effectiveness;
        assert_relative_eq!(eff_large.value(), 0.25, max_relative = 1e-9);
        assert_relative_eq!(eff_small.value(), 1.0, max_relative = 1e-9);
        Ok(())
    }

    #[test]
    fn no_flow_passes_through() -> Result<(), Box<dyn std::error::Error>> {
        let mut hex = exchanger(2500.0)?;
        hex.inlets[0].set_flow(0.1);
        hex.inlets[0].set_sysvin(60.0);
        hex.inlets[1].set_sysvin(10.0);

        hex.update_coefficients()?;
        assert_eq!(solve(&mut hex)?, [60.0, 10.0]);
        assert_relative_eq!(hex.settle()?.heat_flow.get::<watt>(), 0.0);
        Ok(())
    }

    #[test]
    fn humidity_streams_are_rejected() -> Result<(), crate::CatalogError> {
        let catalog = Rc::new(HexCatalog::validate("plate", RawHexCatalog { ua: Some(1.0) })?);
        assert!(matches!(
            Hex::new("hx", catalog, [FluidKind::Water, FluidKind::AirHumidity]),
            Err(HexError::Fluid { .. })
        ));
        Ok(())
    }
}
