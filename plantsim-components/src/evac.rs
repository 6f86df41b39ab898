//! Indirect evaporative cooler.
//!
//! Dry product air and wet working air flow in counter-flow on either side
//! of a plate. The wet side evaporates water from the plate surface, which
//! cools the plate and, through it, the dry air. The exchanger is split into
//! `N` layers along the dry-air path, each with five unknowns (wet air
//! temperature and humidity, surface temperature, dry air temperature and
//! humidity), and the whole set is solved as one linear system with the
//! saturation curve linearised at the previous surface temperature.

mod catalog;
mod event;
mod flags;
mod system;

use std::rc::Rc;

use plantsim_core::{Equipment, FluidKind, Inlet, Observer, Outlet, Settlement, TerminalError};
use plantsim_solve::InversionError;
use plantsim_thermo::{
    CA, CV, PropertyError, R0,
    psychro::{humid_heat, relative_humidity},
};
use thiserror::Error;
use uom::si::{
    f64::{MassRate, Power},
    mass_rate::kilogram_per_second,
    power::watt,
};

pub use catalog::{EvacCatalog, RawEvacCatalog};
pub use event::EvacEvent;
pub use flags::Suppression;

use crate::catalog::{CatalogError, CatalogSet};
use system::{EvacSystem, LayerTransfer, Streams, Var, outlet_unknown, unknown};

/// Errors raised by an [`Evac`].
#[derive(Debug, Error)]
pub enum EvacError {
    #[error("cooler `{name}`: invalid catalog")]
    Catalog {
        name: String,
        #[source]
        source: CatalogError,
    },

    #[error("cooler `{name}`: layer system cannot be inverted")]
    Singular {
        name: String,
        #[source]
        source: InversionError,
    },

    #[error("cooler `{name}`: air state out of range")]
    Property {
        name: String,
        #[source]
        source: PropertyError,
    },

    #[error("cooler `{name}`: settled before coefficients were built")]
    NotBuilt { name: String },

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// Operating command for the cooler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Control {
    #[default]
    On,
    Off,
}

/// The four air channels, in terminal order.
///
/// Inlet `k` and outlet `k` both carry channel `k`; every outlet is wired to
/// all four inlets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    DryTemperature = 0,
    DryHumidity = 1,
    WetTemperature = 2,
    WetHumidity = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::DryTemperature,
        Channel::DryHumidity,
        Channel::WetTemperature,
        Channel::WetHumidity,
    ];

    /// Terminal index of this channel.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn fluid(self) -> FluidKind {
        match self {
            Channel::DryTemperature | Channel::WetTemperature => FluidKind::AirTemperature,
            Channel::DryHumidity | Channel::WetHumidity => FluidKind::AirHumidity,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Channel::DryTemperature => "dry-t",
            Channel::DryHumidity => "dry-x",
            Channel::WetTemperature => "wet-t",
            Channel::WetHumidity => "wet-x",
        }
    }
}

/// State of one cooler layer after the last settlement.
///
/// Temperatures in °C, humidities in kg/kg(DA), relative humidities as
/// fractions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerState {
    pub wet_temperature: f64,
    pub wet_humidity: f64,
    pub surface_temperature: f64,
    pub dry_temperature: f64,
    pub dry_humidity: f64,
    pub wet_relative_humidity: f64,
    pub dry_relative_humidity: f64,
    /// Saturation humidity at the surface.
    pub surface_humidity: f64,
    /// Water evaporated from the layer, kg/s.
    pub evaporation: f64,
    pub evaporating: bool,
}

/// Heat gained by one air stream across the cooler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideHeat {
    pub sensible: Power,
    pub latent: Power,
}

impl SideHeat {
    fn zero() -> Self {
        Self {
            sensible: Power::new::<watt>(0.0),
            latent: Power::new::<watt>(0.0),
        }
    }

    #[must_use]
    pub fn total(&self) -> Power {
        self.sensible + self.latent
    }
}

/// Quantities produced by one [`Evac`] settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvacReport {
    pub settlement: Settlement,
    pub dry: SideHeat,
    pub wet: SideHeat,
    /// Total water evaporated.
    pub evaporation: MassRate,
}

/// What the coefficient build left for settlement.
#[derive(Debug, Clone)]
enum Step {
    Bypass,
    Active {
        system: EvacSystem,
        streams: Streams,
        transfer: Vec<LayerTransfer>,
    },
}

/// An indirect evaporative cooler instance.
#[derive(Debug, Clone)]
pub struct Evac {
    name: String,
    catalog: Rc<EvacCatalog>,
    inlets: Vec<Inlet>,
    outlets: Vec<Outlet>,
    control: Control,
    layers: Vec<LayerState>,
    /// Whether `layers` holds a solved state to linearise around.
    initialized: bool,
    step: Option<Step>,
}

impl Evac {
    /// Creates a cooler that is switched on.
    ///
    /// The layer state is seeded from the inlet values on the first active
    /// coefficient build.
    #[must_use]
    pub fn new(name: impl Into<String>, catalog: Rc<EvacCatalog>) -> Self {
        let name = name.into();
        let inlets = Channel::ALL
            .iter()
            .map(|ch| Inlet::new(format!("{name}:{}:in", ch.label()), ch.fluid()))
            .collect();
        let outlets = Channel::ALL
            .iter()
            .map(|ch| Outlet::new(format!("{name}:{}:out", ch.label()), ch.fluid(), 4))
            .collect();

        Self {
            name,
            inlets,
            outlets,
            control: Control::On,
            layers: vec![LayerState::default(); catalog.layers()],
            initialized: false,
            step: None,
            catalog,
        }
    }

    /// Creates a cooler from the catalog `catalog` in `catalogs`.
    ///
    /// # Errors
    ///
    /// Returns [`EvacError::Catalog`] if no such catalog exists.
    pub fn from_catalogs(
        name: impl Into<String>,
        catalogs: &CatalogSet,
        catalog: &str,
    ) -> Result<Self, EvacError> {
        let name = name.into();
        match catalogs.evac(catalog) {
            Ok(catalog) => Ok(Self::new(name, catalog)),
            Err(source) => Err(EvacError::Catalog { name, source }),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &EvacCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn control(&self) -> Control {
        self.control
    }

    pub fn set_control(&mut self, control: Control) {
        self.control = control;
    }

    #[must_use]
    pub fn layers(&self) -> &[LayerState] {
        &self.layers
    }

    #[must_use]
    pub fn inlet(&self, channel: Channel) -> &Inlet {
        &self.inlets[channel.index()]
    }

    pub fn inlet_mut(&mut self, channel: Channel) -> &mut Inlet {
        &mut self.inlets[channel.index()]
    }

    #[must_use]
    pub fn outlet(&self, channel: Channel) -> &Outlet {
        &self.outlets[channel.index()]
    }

    /// Builds the outlet equations, reporting decisions to `observer`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvacError`] if an air state leaves the psychrometric
    /// range or the layer system is singular.
    pub fn update_coefficients_observed(
        &mut self,
        observer: &mut impl Observer<EvacEvent>,
    ) -> Result<(), EvacError> {
        for (outlet, inlet) in self.outlets.iter_mut().zip(&self.inlets) {
            outlet.set_flow(inlet.flow());
        }

        let dry_flow = self.inlet(Channel::DryTemperature).flow();
        let wet_flow = self.inlet(Channel::WetTemperature).flow();
        if self.control == Control::Off || dry_flow <= 0.0 || wet_flow <= 0.0 {
            for (k, outlet) in self.outlets.iter_mut().enumerate() {
                outlet.set_pass_through(k)?;
            }
            for layer in &mut self.layers {
                layer.evaporating = false;
            }
            observer.observe(&EvacEvent::Bypassed);
            self.step = Some(Step::Bypass);
            return Ok(());
        }

        let inlet = self.inlet_values();
        if !self.initialized {
            self.seed(&inlet);
        }

        let surface: Vec<f64> = self.layers.iter().map(|l| l.surface_temperature).collect();
        let wet: Vec<(f64, f64)> = self
            .layers
            .iter()
            .map(|l| (l.wet_temperature, l.wet_humidity))
            .collect();
        let flags = flags::scan(&surface, &wet, (inlet[2], inlet[3]))
            .map_err(|source| self.property(source))?;

        for (layer, flag) in flags.iter().enumerate() {
            if let Some(reason) = flag.suppression {
                observer.observe(&EvacEvent::EvaporationSuppressed { layer, reason });
            }
        }

        let h_wet = self.catalog.h_wet();
        let transfer: Vec<LayerTransfer> = flags
            .into_iter()
            .map(|flag| LayerTransfer {
                kx: if flag.evaporating() {
                    h_wet / (CA + CV * flag.xs)
                } else {
                    0.0
                },
                flag,
            })
            .collect();

        let streams = Streams {
            dry_flow,
            dry_heat: humid_heat(inlet[1]),
            wet_flow,
            wet_heat: humid_heat(inlet[3]),
        };
        let system = EvacSystem::build(&self.catalog, &streams, &transfer).map_err(|source| {
            EvacError::Singular {
                name: self.name.clone(),
                source,
            }
        })?;

        let n = self.catalog.layers();
        for channel in Channel::ALL {
            let (co, coeffin) = system.outlet_coefficients(outlet_unknown(channel, n));
            self.outlets[channel.index()].set_coefficients(1.0, co, &coeffin)?;
        }

        self.step = Some(Step::Active {
            system,
            streams,
            transfer,
        });
        Ok(())
    }

    /// Recovers the layer states, reporting decisions to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`EvacError::NotBuilt`] if no coefficient build preceded this
    /// call, or [`EvacError::Property`] if a solved air state is out of range.
    pub fn settle_observed(
        &mut self,
        observer: &mut impl Observer<EvacEvent>,
    ) -> Result<EvacReport, EvacError> {
        let step = self.step.take().ok_or_else(|| EvacError::NotBuilt {
            name: self.name.clone(),
        })?;

        let (system, streams, transfer) = match step {
            Step::Bypass => {
                if self.control == Control::Off && self.initialized {
                    self.layers.fill(LayerState::default());
                    self.initialized = false;
                    observer.observe(&EvacEvent::StateCleared);
                }
                return Ok(EvacReport {
                    settlement: Settlement::unchanged(),
                    dry: SideHeat::zero(),
                    wet: SideHeat::zero(),
                    evaporation: MassRate::new::<kilogram_per_second>(0.0),
                });
            }
            Step::Active {
                system,
                streams,
                transfer,
            } => (system, streams, transfer),
        };

        let inlet = self.inlet_values();
        let x = system.solve(&inlet);
        let wet_area = self.catalog.wet_area();

        let mut layers = Vec::with_capacity(transfer.len());
        for (i, t) in transfer.iter().enumerate() {
            let at = |var| x[unknown(i, var)];
            let wet_temperature = at(Var::WetTemperature);
            let wet_humidity = at(Var::WetHumidity);
            let surface_temperature = at(Var::Surface);
            let dry_temperature = at(Var::DryTemperature);
            let dry_humidity = at(Var::DryHumidity);
            let surface_humidity = t.flag.line.at(surface_temperature);

            layers.push(LayerState {
                wet_temperature,
                wet_humidity,
                surface_temperature,
                dry_temperature,
                dry_humidity,
                wet_relative_humidity: relative_humidity(wet_temperature, wet_humidity)
                    .map_err(|source| self.property(source))?,
                dry_relative_humidity: relative_humidity(dry_temperature, dry_humidity)
                    .map_err(|source| self.property(source))?,
                surface_humidity,
                evaporation: t.kx * (surface_humidity - wet_humidity).max(0.0) * wet_area,
                evaporating: t.flag.evaporating(),
            });
        }
        for (layer, state) in layers.iter().enumerate() {
            if state.evaporation > 0.0 {
                observer.observe(&EvacEvent::Evaporated {
                    layer,
                    rate: MassRate::new::<kilogram_per_second>(state.evaporation),
                });
            }
        }
        self.layers = layers;
        self.initialized = true;

        let n = self.catalog.layers();
        let out = |channel| x[outlet_unknown(channel, n)];
        let dry = SideHeat {
            sensible: Power::new::<watt>(
                streams.dry_flow * streams.dry_heat * (out(Channel::DryTemperature) - inlet[0]),
            ),
            latent: Power::new::<watt>(
                streams.dry_flow * R0 * (out(Channel::DryHumidity) - inlet[1]),
            ),
        };
        let wet = SideHeat {
            sensible: Power::new::<watt>(
                streams.wet_flow * streams.wet_heat * (out(Channel::WetTemperature) - inlet[2]),
            ),
            latent: Power::new::<watt>(
                streams.wet_flow * R0 * (out(Channel::WetHumidity) - inlet[3]),
            ),
        };
        let evaporation: f64 = self.layers.iter().map(|l| l.evaporation).sum();

        Ok(EvacReport {
            settlement: Settlement::unchanged(),
            dry,
            wet,
            evaporation: MassRate::new::<kilogram_per_second>(evaporation),
        })
    }

    fn inlet_values(&self) -> [f64; 4] {
        Channel::ALL.map(|ch| self.inlet(ch).sysvin())
    }

    /// Starts every layer at the inlet conditions.
    fn seed(&mut self, inlet: &[f64; 4]) {
        let [td, xd, tw, xw] = *inlet;
        for layer in &mut self.layers {
            *layer = LayerState {
                wet_temperature: tw,
                wet_humidity: xw,
                surface_temperature: 0.5 * (td + tw),
                dry_temperature: td,
                dry_humidity: xd,
                ..LayerState::default()
            };
        }
        self.initialized = true;
    }

    fn property(&self, source: PropertyError) -> EvacError {
        EvacError::Property {
            name: self.name.clone(),
            source,
        }
    }
}

impl Equipment for Evac {
    type Report = EvacReport;
    type Error = EvacError;

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

    fn update_coefficients(&mut self) -> Result<(), EvacError> {
        self.update_coefficients_observed(&mut ())
    }

    fn settle(&mut self) -> Result<EvacReport, EvacError> {
        self.settle_observed(&mut ())
    }
}
