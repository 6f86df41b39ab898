//! Stratified storage tank.
//!
//! A vertical tank split into equal, fully mixed layers (layer 0 on top).
//! Direct ports push water through the layers between their inlet and outlet;
//! coil ports exchange heat with those layers without mixing. Each step the
//! tank solves an implicit energy balance for every layer, reusing the
//! inverted matrix for as long as port flows and fill state stay the same.

mod catalog;
mod coil;
mod event;
mod stratify;
mod system;

use std::rc::Rc;

use plantsim_core::{Equipment, FluidKind, Inlet, Observer, Outlet, Settlement, TerminalError};
use plantsim_solve::InversionError;
use plantsim_thermo::PropertyError;
use thiserror::Error;
use uom::si::{
    f64::{Power, ThermodynamicTemperature, Time},
    power::watt,
    thermodynamic_temperature::degree_celsius,
    time::second,
};

pub use catalog::{
    DEFAULT_DENSITY, DEFAULT_TOLERANCE, KaInput, PortKind, PortSpec, RawKaInput, RawPort,
    RawPortKind, RawStankCatalog, StankCatalog,
};
pub use event::TankEvent;

use crate::catalog::{CatalogError, CatalogSet};
use coil::{CoilConditions, segment_effectiveness};
use system::{SystemKey, TankSystem, constant_rhs};

/// Errors raised by a [`Stank`].
#[derive(Debug, Error)]
pub enum StankError {
    #[error("tank `{name}`: timestep must be positive, got {seconds} s")]
    Timestep { name: String, seconds: f64 },

    #[error("tank `{name}`: invalid catalog")]
    Catalog {
        name: String,
        #[source]
        source: CatalogError,
    },

    #[error("tank `{name}`: layer system cannot be inverted")]
    Singular {
        name: String,
        #[source]
        source: InversionError,
    },

    #[error("tank `{name}`: coil conductance out of range")]
    Property {
        name: String,
        #[source]
        source: PropertyError,
    },

    #[error("tank `{name}`: settled before coefficients were built")]
    NotBuilt { name: String },

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// A fill or drain applied in place of one step's layer balance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BatchOperation {
    #[default]
    None,
    /// Tops up every empty layer with water at `temperature`, then mixes the
    /// whole tank.
    Fill { temperature: ThermodynamicTemperature },
    /// Empties every layer.
    Drain,
}

/// Quantities produced by one [`Stank`] settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct StankReport {
    pub settlement: Settlement,
    /// Heat gained from the surroundings.
    pub heat_loss: Power,
    /// Rate of change of stored energy.
    pub heat_stored: Power,
    /// Heat delivered to the tank by each port.
    pub port_heat: Vec<Power>,
    pub layer_temperatures: Vec<ThermodynamicTemperature>,
}

/// Result of a batch operation, previewed during the coefficient build.
#[derive(Debug, Clone)]
struct BatchPreview {
    operation: BatchOperation,
    temperatures: Vec<f64>,
    filled: Vec<bool>,
}

/// What the coefficient build left for settlement.
#[derive(Debug, Clone)]
enum Step {
    Balance {
        /// `UX · R`.
        constants: Vec<f64>,
    },
    Batch(BatchPreview),
}

/// A stratified storage tank instance.
///
/// Port `j` owns inlet `j` and outlet `j`. Every outlet is wired to all
/// inlets, since any port's inflow can reach any layer.
#[derive(Debug, Clone)]
pub struct Stank {
    name: String,
    catalog: Rc<StankCatalog>,
    inlets: Vec<Inlet>,
    outlets: Vec<Outlet>,
    /// Timestep, s.
    timestep: f64,
    /// Ambient temperature, °C.
    ambient: f64,
    /// Layer temperatures at the end of the last settled step, °C.
    temperatures: Vec<f64>,
    filled: Vec<bool>,
    batch: BatchOperation,
    system: Option<TankSystem>,
    step: Option<Step>,
    force_rebuild: bool,
    rebuilds: usize,
}

impl Stank {
    /// Creates a full tank at a uniform `initial` temperature.
    ///
    /// The ambient temperature starts equal to `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`StankError::Timestep`] if `timestep` is not positive.
    pub fn new(
        name: impl Into<String>,
        catalog: Rc<StankCatalog>,
        initial: ThermodynamicTemperature,
        timestep: Time,
    ) -> Result<Self, StankError> {
        let name = name.into();
        let seconds = timestep.get::<second>();
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(StankError::Timestep { name, seconds });
        }

        let ports = catalog.ports();
        let inlets = ports
            .iter()
            .map(|p| Inlet::new(format!("{name}:{}:in", p.name), FluidKind::Water))
            .collect();
        let outlets = ports
            .iter()
            .map(|p| Outlet::new(format!("{name}:{}:out", p.name), FluidKind::Water, ports.len()))
            .collect();

        let t0 = initial.get::<degree_celsius>();
        let n = catalog.layers();
        Ok(Self {
            name,
            inlets,
            outlets,
            timestep: seconds,
            ambient: t0,
            temperatures: vec![t0; n],
            filled: vec![true; n],
            batch: BatchOperation::None,
            system: None,
            step: None,
            force_rebuild: false,
            rebuilds: 0,
            catalog,
        })
    }

    /// Creates a tank from the catalog `catalog` in `catalogs`.
    ///
    /// # Errors
    ///
    /// Returns [`StankError::Catalog`] if no such catalog exists, or any
    /// error from [`Stank::new`].
    pub fn from_catalogs(
        name: impl Into<String>,
        catalogs: &CatalogSet,
        catalog: &str,
        initial: ThermodynamicTemperature,
        timestep: Time,
    ) -> Result<Self, StankError> {
        let name = name.into();
        match catalogs.stank(catalog) {
            Ok(catalog) => Self::new(name, catalog, initial, timestep),
            Err(source) => Err(StankError::Catalog { name, source }),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &StankCatalog {
        &self.catalog
    }

    pub fn set_ambient(&mut self, ambient: ThermodynamicTemperature) {
        self.ambient = ambient.get::<degree_celsius>();
    }

    /// Schedules a fill or drain for the next step.
    pub fn set_batch_operation(&mut self, operation: BatchOperation) {
        self.batch = operation;
    }

    #[must_use]
    pub fn layer_temperatures(&self) -> Vec<ThermodynamicTemperature> {
        celsius(&self.temperatures)
    }

    /// Which layers currently hold water.
    #[must_use]
    pub fn filled(&self) -> &[bool] {
        &self.filled
    }

    /// How many times the layer system has been inverted.
    #[must_use]
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Builds the outlet equations, reporting decisions to `observer`.
    ///
    /// # Errors
    ///
    /// Returns a [`StankError`] if a coil conductance cannot be evaluated or
    /// the layer system is singular.
    pub fn update_coefficients_observed(
        &mut self,
        observer: &mut impl Observer<TankEvent>,
    ) -> Result<(), StankError> {
        // A port whose path crosses an empty layer passes nothing through.
        let filled = &self.filled;
        let ports = self.catalog.ports();
        for ((outlet, inlet), port) in self.outlets.iter_mut().zip(&self.inlets).zip(ports) {
            let wet = port.path().iter().all(|&i| filled[i]);
            outlet.set_flow(if wet { inlet.flow() } else { 0.0 });
        }

        if self.batch != BatchOperation::None {
            let preview = self.preview_batch();
            for (outlet, port) in self.outlets.iter_mut().zip(self.catalog.ports()) {
                outlet.set_constant(preview.temperatures[port.outlet_layer]);
            }
            self.step = Some(Step::Batch(preview));
            return Ok(());
        }

        let key = self.system_key()?;
        let stale = self.system.as_ref().is_none_or(|s| *s.key() != key);
        if stale || self.force_rebuild {
            let system = TankSystem::build(&self.catalog, key).map_err(|source| {
                StankError::Singular {
                    name: self.name.clone(),
                    source,
                }
            })?;
            self.rebuilds += 1;
            self.force_rebuild = false;
            observer.observe(&TankEvent::SystemRebuilt {
                unknowns: system.size(),
            });
            self.system = Some(system);
        }

        let Some(system) = &self.system else {
            return Err(StankError::NotBuilt {
                name: self.name.clone(),
            });
        };

        let rhs = constant_rhs(&self.catalog, system.key(), &self.temperatures, self.ambient);
        let constants = system.constants(&rhs);

        let ports = self.catalog.ports().len();
        let mut coeffin = vec![0.0; ports];
        for (k, outlet) in self.outlets.iter_mut().enumerate() {
            let out = system.outlet(k);
            for (j, c) in coeffin.iter_mut().enumerate() {
                *c = -system.sensitivity(j)[out];
            }
            outlet.set_coefficients(1.0, constants[out], &coeffin)?;
        }

        self.step = Some(Step::Balance { constants });
        Ok(())
    }

    /// Advances the layer state, reporting decisions to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`StankError::NotBuilt`] if no coefficient build preceded this
    /// call.
    pub fn settle_observed(
        &mut self,
        observer: &mut impl Observer<TankEvent>,
    ) -> Result<StankReport, StankError> {
        let step = self.step.take().ok_or_else(|| StankError::NotBuilt {
            name: self.name.clone(),
        })?;

        match step {
            Step::Batch(preview) => Ok(self.commit_batch(preview, observer)),
            Step::Balance { constants } => self.settle_balance(&constants, observer),
        }
    }

    fn settle_balance(
        &mut self,
        constants: &[f64],
        observer: &mut impl Observer<TankEvent>,
    ) -> Result<StankReport, StankError> {
        let Some(system) = &self.system else {
            return Err(StankError::NotBuilt {
                name: self.name.clone(),
            });
        };

        let inlets: Vec<f64> = self.inlets.iter().map(Inlet::sysvin).collect();
        let x = system.solve(constants, &inlets);
        let n = self.catalog.layers();
        let new = &x[..n];

        let cp = self.catalog.specific_heat();
        let mass = self.catalog.layer_mass();
        let mut heat_loss = 0.0;
        let mut heat_stored = 0.0;
        for (i, (&t, &old)) in new.iter().zip(&self.temperatures).enumerate() {
            if self.filled[i] {
                heat_loss += self.catalog.layer_conductance(i) * (self.ambient - t);
                heat_stored += mass * cp * (t - old) / self.timestep;
            }
        }

        let port_heat = system
            .key()
            .rates
            .iter()
            .zip(&inlets)
            .enumerate()
            .map(|(j, (&c, &tin))| Power::new::<watt>(c * (tin - x[system.outlet(j)])))
            .collect();

        self.temperatures.copy_from_slice(new);

        let masses = vec![mass; n];
        let mixed = stratify::stabilize(
            &mut self.temperatures,
            &masses,
            &self.filled,
            self.catalog.tolerance(),
        );
        for block in &mixed {
            observer.observe(&TankEvent::LayersMixed {
                layers: block.layers.clone(),
                temperature: ThermodynamicTemperature::new::<degree_celsius>(block.temperature),
            });
        }

        let settlement = if mixed.is_empty() {
            Settlement::unchanged()
        } else {
            self.force_rebuild = true;
            Settlement::changed()
        };

        Ok(StankReport {
            settlement,
            heat_loss: Power::new::<watt>(heat_loss),
            heat_stored: Power::new::<watt>(heat_stored),
            port_heat,
            layer_temperatures: self.layer_temperatures(),
        })
    }

    fn commit_batch(
        &mut self,
        preview: BatchPreview,
        observer: &mut impl Observer<TankEvent>,
    ) -> StankReport {
        let before = self.stored_energy();
        self.temperatures = preview.temperatures;
        self.filled = preview.filled;
        let after = self.stored_energy();

        self.batch = BatchOperation::None;
        self.force_rebuild = true;
        observer.observe(&TankEvent::BatchApplied {
            operation: preview.operation,
        });

        StankReport {
            settlement: Settlement::changed(),
            heat_loss: Power::new::<watt>(0.0),
            heat_stored: Power::new::<watt>((after - before) / self.timestep),
            port_heat: vec![Power::new::<watt>(0.0); self.inlets.len()],
            layer_temperatures: self.layer_temperatures(),
        }
    }

    /// Energy held by the filled layers relative to 0 °C, J.
    fn stored_energy(&self) -> f64 {
        let mc = self.catalog.layer_mass() * self.catalog.specific_heat();
        self.temperatures
            .iter()
            .zip(&self.filled)
            .filter(|&(_, &filled)| filled)
            .map(|(t, _)| mc * t)
            .sum()
    }

    fn preview_batch(&self) -> BatchPreview {
        let n = self.catalog.layers();
        let mut temperatures = self.temperatures.clone();
        let filled = match self.batch {
            BatchOperation::None => self.filled.clone(),
            BatchOperation::Fill { temperature } => {
                let fill = temperature.get::<degree_celsius>();
                for (t, &was_filled) in temperatures.iter_mut().zip(&self.filled) {
                    if !was_filled {
                        *t = fill;
                    }
                }
                #[allow(clippy::cast_precision_loss)]
                let mean = temperatures.iter().sum::<f64>() / n as f64;
                temperatures.fill(mean);
                vec![true; n]
            }
            BatchOperation::Drain => vec![false; n],
        };

        BatchPreview {
            operation: self.batch,
            temperatures,
            filled,
        }
    }

    fn system_key(&self) -> Result<SystemKey, StankError> {
        let cp = self.catalog.specific_heat();
        let ports = self.catalog.ports();
        let mut rates = Vec::with_capacity(ports.len());
        let mut segments = Vec::with_capacity(ports.len());

        for (port, inlet) in ports.iter().zip(&self.inlets) {
            let path = port.path();
            let wet = path.iter().all(|&i| self.filled[i]);
            let rate = if wet { inlet.flow() * cp } else { 0.0 };

            let eff = match port.kind {
                PortKind::Direct => Vec::new(),
                PortKind::Coil(_) if rate <= 0.0 => vec![0.0; path.len()],
                PortKind::Coil(ka) => {
                    #[allow(clippy::cast_precision_loss)]
                    let tank_temperature =
                        path.iter().map(|&i| self.temperatures[i]).sum::<f64>() / path.len() as f64;
                    let conditions = CoilConditions {
                        mass_rate: inlet.flow(),
                        fluid_temperature: inlet.sysvin(),
                        tank_temperature,
                    };
                    segment_effectiveness(ka, rate, path.len(), conditions).map_err(|source| {
                        StankError::Property {
                            name: self.name.clone(),
                            source,
                        }
                    })?
                }
            };

            rates.push(rate);
            segments.push(eff);
        }

        Ok(SystemKey {
            rates,
            segments,
            filled: self.filled.clone(),
            timestep: self.timestep,
        })
    }
}

impl Equipment for Stank {
    type Report = StankReport;
    type Error = StankError;

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

    fn update_coefficients(&mut self) -> Result<(), StankError> {
        self.update_coefficients_observed(&mut ())
    }

    fn settle(&mut self) -> Result<StankReport, StankError> {
        self.settle_observed(&mut ())
    }
}

fn celsius(values: &[f64]) -> Vec<ThermodynamicTemperature> {
    values
        .iter()
        .map(|&t| ThermodynamicTemperature::new::<degree_celsius>(t))
        .collect()
}
