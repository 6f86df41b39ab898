use serde::Deserialize;

use crate::catalog::{CatalogError, positive, require};

/// Nusselt number for fully developed laminar flow between parallel plates
/// at constant wall temperature.
const PLATE_NUSSELT: f64 = 7.54;

/// Thermal conductivity of air near room temperature, W/(m·K).
const AIR_CONDUCTIVITY: f64 = 0.026;

/// Evaporative cooler catalog entry as read from a file.
///
/// Areas are totals for the whole exchanger. A missing film coefficient is
/// estimated from `channel_gap`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEvacCatalog {
    pub layers: Option<usize>,
    /// Wetted plate area, m².
    pub wet_area: Option<f64>,
    /// Dry plate area, m².
    pub dry_area: Option<f64>,
    /// Wet side film coefficient, W/(m²·K).
    pub h_wet: Option<f64>,
    /// Dry side film coefficient, W/(m²·K).
    pub h_dry: Option<f64>,
    /// Plate spacing, m.
    pub channel_gap: Option<f64>,
}

/// Validated evaporative cooler nameplate data.
///
/// Areas are stored per layer. They are divided once here, so every
/// instance built from the same entry sees the same values.
#[derive(Debug, Clone, PartialEq)]
pub struct EvacCatalog {
    name: String,
    layers: usize,
    wet_area: f64,
    dry_area: f64,
    h_wet: f64,
    h_dry: f64,
}

impl EvacCatalog {
    /// Validates a raw catalog entry.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the layer count or an area is missing
    /// or non-physical, or if a film coefficient is missing and no channel
    /// gap is given to estimate it.
    pub fn validate(name: &str, raw: RawEvacCatalog) -> Result<Self, CatalogError> {
        let layers = require(name, "layers", raw.layers)?;
        if layers == 0 {
            return Err(CatalogError::Inconsistent {
                catalog: name.to_owned(),
                field: "layers",
                context: "a cooler needs at least one layer".to_owned(),
            });
        }

        let wet_area = positive(name, "wet_area", require(name, "wet_area", raw.wet_area)?)?;
        let dry_area = positive(name, "dry_area", require(name, "dry_area", raw.dry_area)?)?;

        let gap = || -> Result<f64, CatalogError> {
            positive(name, "channel_gap", require(name, "channel_gap", raw.channel_gap)?)
        };
        let h_wet = match raw.h_wet {
            Some(h) => positive(name, "h_wet", h)?,
            None => laminar_film_coefficient(gap()?),
        };
        let h_dry = match raw.h_dry {
            Some(h) => positive(name, "h_dry", h)?,
            None => laminar_film_coefficient(gap()?),
        };

        #[allow(clippy::cast_precision_loss)]
        let n = layers as f64;
        Ok(Self {
            name: name.to_owned(),
            layers,
            wet_area: wet_area / n,
            dry_area: dry_area / n,
            h_wet,
            h_dry,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Wetted area of one layer, m².
    #[must_use]
    pub fn wet_area(&self) -> f64 {
        self.wet_area
    }

    /// Dry area of one layer, m².
    #[must_use]
    pub fn dry_area(&self) -> f64 {
        self.dry_area
    }

    /// W/(m²·K).
    #[must_use]
    pub fn h_wet(&self) -> f64 {
        self.h_wet
    }

    /// W/(m²·K).
    #[must_use]
    pub fn h_dry(&self) -> f64 {
        self.h_dry
    }
}

/// Film coefficient for laminar air flow between plates `gap` apart.
///
/// The hydraulic diameter of a wide channel is twice its gap.
fn laminar_film_coefficient(gap: f64) -> f64 {
    PLATE_NUSSELT * AIR_CONDUCTIVITY / (2.0 * gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn raw() -> RawEvacCatalog {
        RawEvacCatalog {
            layers: Some(4),
            wet_area: Some(20.0),
            dry_area: Some(16.0),
            h_wet: Some(40.0),
            h_dry: Some(30.0),
            channel_gap: None,
        }
    }

    #[test]
    fn areas_are_split_per_layer() -> Result<(), CatalogError> {
        let cat = EvacCatalog::validate("ic", raw())?;
        assert_relative_eq!(cat.wet_area(), 5.0);
        assert_relative_eq!(cat.dry_area(), 4.0);
        assert_relative_eq!(cat.h_dry(), 30.0);
        Ok(())
    }

    #[test]
    fn film_coefficient_from_gap() -> Result<(), CatalogError> {
        let cat = EvacCatalog::validate(
            "ic",
            RawEvacCatalog {
                h_wet: None,
                channel_gap: Some(0.004),
                ..raw()
            },
        )?;
        assert_relative_eq!(cat.h_wet(), 7.54 * 0.026 / 0.008);
        assert_relative_eq!(cat.h_dry(), 30.0);
        Ok(())
    }

    #[test]
    fn missing_coefficient_without_gap() {
        let result = EvacCatalog::validate(
            "ic",
            RawEvacCatalog {
                h_dry: None,
                ..raw()
            },
        );
        assert!(matches!(
            result,
            Err(CatalogError::Missing {
                field: "channel_gap",
                ..
            })
        ));
    }

    #[test]
    fn zero_layers_is_inconsistent() {
        let result = EvacCatalog::validate(
            "ic",
            RawEvacCatalog {
                layers: Some(0),
                ..raw()
            },
        );
        assert!(matches!(
            result,
            Err(CatalogError::Inconsistent { field: "layers", .. })
        ));
    }

    #[test]
    fn negative_area_is_invalid() {
        let result = EvacCatalog::validate(
            "ic",
            RawEvacCatalog {
                wet_area: Some(-1.0),
                ..raw()
            },
        );
        assert!(matches!(
            result,
            Err(CatalogError::Invalid {
                field: "wet_area",
                ..
            })
        ));
    }
}
