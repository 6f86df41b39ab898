use serde::Deserialize;

use plantsim_thermo::CW;

use crate::catalog::{CatalogError, fraction, non_negative, positive, require};

/// Water density used when a catalog does not give one, kg/m³.
pub const DEFAULT_DENSITY: f64 = 1000.0;

/// Largest upward temperature step between adjacent layers that is left
/// unmixed when a catalog does not give one, K.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Tank catalog entry as read from a file.
///
/// Units: m³, W/K, kg/m³, J/(kg·K), K.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStankCatalog {
    pub volume: Option<f64>,
    pub layers: Option<usize>,
    pub ua_side: Option<f64>,
    pub ua_top: Option<f64>,
    pub ua_bottom: Option<f64>,
    pub density: Option<f64>,
    pub specific_heat: Option<f64>,
    pub mixing_conductance: Option<f64>,
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub ports: Vec<RawPort>,
}

/// One port of a tank catalog entry as read from a file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPort {
    pub name: String,
    #[serde(default)]
    pub kind: RawPortKind,
    pub inlet_layer: Option<usize>,
    pub outlet_layer: Option<usize>,
    pub ka_input: Option<RawKaInput>,
    pub ka: Option<f64>,
    pub effectiveness: Option<f64>,
    pub diameter: Option<f64>,
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawPortKind {
    #[default]
    Direct,
    Coil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawKaInput {
    Conductance,
    Effectiveness,
    Computed,
}

/// How a coil's conductance to the tank water is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KaInput {
    /// Total conductance given directly, W/K.
    Conductance(f64),
    /// Overall effectiveness against the tank water, in `[0, 1)`.
    ///
    /// The equivalent conductance follows the coil flow.
    Effectiveness(f64),
    /// Computed each step from tube geometry, in m.
    Computed { diameter: f64, length: f64 },
}

/// What a port is connected to inside the tank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortKind {
    /// Water enters the tank at the inlet layer and leaves at the outlet
    /// layer, displacing every layer in between.
    Direct,
    /// A closed coil crossing the layers from inlet to outlet; only heat is
    /// exchanged with the tank water.
    Coil(KaInput),
}

/// A validated tank port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub kind: PortKind,
    pub inlet_layer: usize,
    pub outlet_layer: usize,
}

impl PortSpec {
    /// Layers visited from inlet to outlet, both included.
    #[must_use]
    pub fn path(&self) -> Vec<usize> {
        if self.inlet_layer <= self.outlet_layer {
            (self.inlet_layer..=self.outlet_layer).collect()
        } else {
            (self.outlet_layer..=self.inlet_layer).rev().collect()
        }
    }

    #[must_use]
    pub fn is_coil(&self) -> bool {
        matches!(self.kind, PortKind::Coil(_))
    }
}

/// Validated stratified tank nameplate data.
///
/// Layer 0 is the top of the tank.
#[derive(Debug, Clone, PartialEq)]
pub struct StankCatalog {
    name: String,
    volume: f64,
    layers: usize,
    ua_side: f64,
    ua_top: f64,
    ua_bottom: f64,
    density: f64,
    specific_heat: f64,
    mixing_conductance: f64,
    tolerance: f64,
    ports: Vec<PortSpec>,
}

impl StankCatalog {
    /// Validates a raw catalog entry.
    ///
    /// Volume, layer count and the three loss conductances are required.
    /// Density and specific heat default to water, mixing to zero.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] naming the first field that is missing,
    /// non-physical, or inconsistent with the layer count.
    pub fn validate(name: &str, raw: RawStankCatalog) -> Result<Self, CatalogError> {
        let volume = positive(name, "volume", require(name, "volume", raw.volume)?)?;
        let layers = require(name, "layers", raw.layers)?;
        if layers == 0 {
            return Err(CatalogError::Inconsistent {
                catalog: name.to_owned(),
                field: "layers",
                context: "a tank needs at least one layer".to_owned(),
            });
        }

        let ports = raw
            .ports
            .into_iter()
            .map(|port| validate_port(name, layers, port))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_owned(),
            volume,
            layers,
            ua_side: non_negative(name, "ua_side", require(name, "ua_side", raw.ua_side)?)?,
            ua_top: non_negative(name, "ua_top", require(name, "ua_top", raw.ua_top)?)?,
            ua_bottom: non_negative(name, "ua_bottom", require(name, "ua_bottom", raw.ua_bottom)?)?,
            density: positive(name, "density", raw.density.unwrap_or(DEFAULT_DENSITY))?,
            specific_heat: positive(name, "specific_heat", raw.specific_heat.unwrap_or(CW))?,
            mixing_conductance: non_negative(
                name,
                "mixing_conductance",
                raw.mixing_conductance.unwrap_or(0.0),
            )?,
            tolerance: non_negative(name, "tolerance", raw.tolerance.unwrap_or(DEFAULT_TOLERANCE))?,
            ports,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of layers.
    #[must_use]
    pub fn layers(&self) -> usize {
        self.layers
    }

    #[must_use]
    pub fn ports(&self) -> &[PortSpec] {
        &self.ports
    }

    /// Water volume of the full tank, m³.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Mass of one full layer, kg.
    #[must_use]
    pub fn layer_mass(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = self.layers as f64;
        self.density * self.volume / n
    }

    /// Specific heat of the tank water, J/(kg·K).
    #[must_use]
    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    /// Conductance from layer `i` to the surroundings, W/K.
    ///
    /// The side conductance is shared evenly; the top and bottom go to the
    /// first and last layer.
    #[must_use]
    pub fn layer_conductance(&self, i: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let mut ka = self.ua_side / self.layers as f64;
        if i == 0 {
            ka += self.ua_top;
        }
        if i + 1 == self.layers {
            ka += self.ua_bottom;
        }
        ka
    }

    /// Conductance between adjacent layers, W/K.
    #[must_use]
    pub fn mixing_conductance(&self) -> f64 {
        self.mixing_conductance
    }

    /// Inversion tolerance for the stratification check, K.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

fn validate_port(tank: &str, layers: usize, raw: RawPort) -> Result<PortSpec, CatalogError> {
    let catalog = format!("{tank}.{}", raw.name);
    let layer = |field: &'static str, value: Option<usize>| -> Result<usize, CatalogError> {
        let index = require(&catalog, field, value)?;
        if index < layers {
            Ok(index)
        } else {
            Err(CatalogError::Inconsistent {
                catalog: catalog.clone(),
                field,
                context: format!("layer {index} does not exist in a {layers}-layer tank"),
            })
        }
    };
    let inlet_layer = layer("inlet_layer", raw.inlet_layer)?;
    let outlet_layer = layer("outlet_layer", raw.outlet_layer)?;

    let kind = match raw.kind {
        RawPortKind::Direct => PortKind::Direct,
        RawPortKind::Coil => {
            let ka = match require(&catalog, "ka_input", raw.ka_input)? {
                RawKaInput::Conductance => KaInput::Conductance(non_negative(
                    &catalog,
                    "ka",
                    require(&catalog, "ka", raw.ka)?,
                )?),
                RawKaInput::Effectiveness => {
                    let eff = fraction(
                        &catalog,
                        "effectiveness",
                        require(&catalog, "effectiveness", raw.effectiveness)?,
                    )?;
                    if eff >= 1.0 {
                        return Err(CatalogError::Inconsistent {
                            catalog,
                            field: "effectiveness",
                            context: "a finite coil cannot reach an effectiveness of one"
                                .to_owned(),
                        });
                    }
                    KaInput::Effectiveness(eff)
                }
                RawKaInput::Computed => KaInput::Computed {
                    diameter: positive(
                        &catalog,
                        "diameter",
                        require(&catalog, "diameter", raw.diameter)?,
                    )?,
                    length: positive(&catalog, "length", require(&catalog, "length", raw.length)?)?,
                },
            };
            PortKind::Coil(ka)
        }
    };

    Ok(PortSpec {
        name: raw.name,
        kind,
        inlet_layer,
        outlet_layer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn raw() -> RawStankCatalog {
        RawStankCatalog {
            volume: Some(0.4),
            layers: Some(4),
            ua_side: Some(2.0),
            ua_top: Some(0.5),
            ua_bottom: Some(0.25),
            ..RawStankCatalog::default()
        }
    }

    fn port(name: &str, inlet: usize, outlet: usize) -> RawPort {
        RawPort {
            name: name.to_owned(),
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

    #[test]
    fn defaults_and_derived_values() -> Result<(), CatalogError> {
        let cat = StankCatalog::validate("t", raw())?;

        assert_relative_eq!(cat.layer_mass(), 100.0);
        assert_relative_eq!(cat.specific_heat(), CW);
        assert_relative_eq!(cat.tolerance(), DEFAULT_TOLERANCE);
        assert_relative_eq!(cat.layer_conductance(0), 1.0);
        assert_relative_eq!(cat.layer_conductance(1), 0.5);
        assert_relative_eq!(cat.layer_conductance(3), 0.75);
        Ok(())
    }

    #[test]
    fn single_layer_takes_every_loss() -> Result<(), CatalogError> {
        let cat = StankCatalog::validate(
            "t",
            RawStankCatalog {
                layers: Some(1),
                ..raw()
            },
        )?;
        assert_relative_eq!(cat.layer_conductance(0), 2.75);
        Ok(())
    }

    #[test]
    fn missing_loss_conductance_is_fatal() {
        let result = StankCatalog::validate(
            "t",
            RawStankCatalog {
                ua_top: None,
                ..raw()
            },
        );
        assert!(matches!(
            result,
            Err(CatalogError::Missing { field: "ua_top", .. })
        ));
    }

    #[test]
    fn port_layers_must_exist() {
        let result = StankCatalog::validate(
            "t",
            RawStankCatalog {
                ports: vec![port("p", 0, 4)],
                ..raw()
            },
        );
        assert!(matches!(
            result,
            Err(CatalogError::Inconsistent {
                field: "outlet_layer",
                ..
            })
        ));
    }

    #[test]
    fn coils_need_a_conductance_source() {
        let mut coil = port("c", 3, 0);
        coil.kind = RawPortKind::Coil;
        let result = StankCatalog::validate(
            "t",
            RawStankCatalog {
                ports: vec![coil.clone()],
                ..raw()
            },
        );
        assert!(matches!(
            result,
            Err(CatalogError::Missing {
                field: "ka_input",
                ..
            })
        ));

        coil.ka_input = Some(RawKaInput::Effectiveness);
        coil.effectiveness = Some(1.0);
        let result = StankCatalog::validate(
            "t",
            RawStankCatalog {
                ports: vec![coil],
                ..raw()
            },
        );
        assert!(matches!(
            result,
            Err(CatalogError::Inconsistent {
                field: "effectiveness",
                ..
            })
        ));
    }

    #[test]
    fn paths_run_from_inlet_to_outlet() -> Result<(), CatalogError> {
        let cat = StankCatalog::validate(
            "t",
            RawStankCatalog {
                ports: vec![port("down", 0, 3), port("up", 3, 1), port("one", 2, 2)],
                ..raw()
            },
        )?;
        let paths: Vec<_> = cat.ports().iter().map(PortSpec::path).collect();
        assert_eq!(paths, vec![vec![0, 1, 2, 3], vec![3, 2, 1], vec![2]]);
        Ok(())
    }
}
