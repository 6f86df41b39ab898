//! Equipment catalogs loaded from TOML.
//!
//! A catalog file holds one table per equipment kind, each keyed by catalog
//! name:
//!
//! ```toml
//! [stank.hot-water]
//! volume = 0.3
//! layers = 6
//! ua_side = 1.2
//! ua_top = 0.3
//! ua_bottom = 0.3
//!
//! [[stank.hot-water.ports]]
//! name = "boiler"
//! inlet_layer = 0
//! outlet_layer = 5
//!
//! [evac.indirect]
//! layers = 4
//! wet_area = 20.0
//! dry_area = 20.0
//! h_wet = 40.0
//! h_dry = 40.0
//!
//! [hex.plate]
//! ua = 1500.0
//! ```
//!
//! Fields left out of the file are `None` in the raw tables. Validation then
//! either rejects them or applies a documented default, so physics code never
//! sees an unset value.

use std::{
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use plantsim_core::constraint::{
    Constrained, ConstraintError, NonNegative, StrictlyPositive, UnitInterval,
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    evac::{EvacCatalog, RawEvacCatalog},
    hx::{HexCatalog, RawHexCatalog},
    stank::{RawStankCatalog, StankCatalog},
};

/// Errors raised while loading or validating catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required field was not set.
    #[error("catalog `{catalog}`: required field `{field}` is not set")]
    Missing {
        catalog: String,
        field: &'static str,
    },

    /// A field was set to a non-physical value.
    #[error("catalog `{catalog}`: field `{field}` = {value} is invalid")]
    Invalid {
        catalog: String,
        field: &'static str,
        value: f64,
        #[source]
        source: ConstraintError,
    },

    /// Fields are individually valid but do not fit together.
    #[error("catalog `{catalog}`: field `{field}` is inconsistent: {context}")]
    Inconsistent {
        catalog: String,
        field: &'static str,
        context: String,
    },

    /// No catalog of the requested kind and name exists.
    #[error("no {kind} catalog named `{catalog}`")]
    Unknown { kind: &'static str, catalog: String },

    /// The catalog file is not valid TOML or has unexpected keys.
    #[error("failed to parse catalog file")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalogFile {
    #[serde(default)]
    stank: BTreeMap<String, RawStankCatalog>,
    #[serde(default)]
    evac: BTreeMap<String, RawEvacCatalog>,
    #[serde(default)]
    hex: BTreeMap<String, RawHexCatalog>,
}

/// Validated catalogs, shared by name.
///
/// Lookups hand out `Rc` clones so every instance built from the same entry
/// reads the same immutable data.
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    stank: HashMap<String, Rc<StankCatalog>>,
    evac: HashMap<String, Rc<EvacCatalog>>,
    hex: HashMap<String, Rc<HexCatalog>>,
}

impl CatalogSet {
    /// Parses and validates every catalog in a TOML document.
    ///
    /// Entries are validated in name order, and the first invalid entry
    /// aborts the load.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the document does not parse or any entry
    /// fails validation.
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalogFile = toml::from_str(source)?;
        let mut set = Self::default();

        for (name, entry) in raw.stank {
            set.insert_stank(StankCatalog::validate(&name, entry)?);
        }
        for (name, entry) in raw.evac {
            set.insert_evac(EvacCatalog::validate(&name, entry)?);
        }
        for (name, entry) in raw.hex {
            set.insert_hex(HexCatalog::validate(&name, entry)?);
        }

        Ok(set)
    }

    /// Adds a validated tank catalog, replacing any entry with the same name.
    pub fn insert_stank(&mut self, catalog: StankCatalog) -> Rc<StankCatalog> {
        let catalog = Rc::new(catalog);
        self.stank
            .insert(catalog.name().to_owned(), Rc::clone(&catalog));
        catalog
    }

    /// Adds a validated evaporative cooler catalog.
    pub fn insert_evac(&mut self, catalog: EvacCatalog) -> Rc<EvacCatalog> {
        let catalog = Rc::new(catalog);
        self.evac
            .insert(catalog.name().to_owned(), Rc::clone(&catalog));
        catalog
    }

    /// Adds a validated heat exchanger catalog.
    pub fn insert_hex(&mut self, catalog: HexCatalog) -> Rc<HexCatalog> {
        let catalog = Rc::new(catalog);
        self.hex.insert(catalog.name().to_owned(), Rc::clone(&catalog));
        catalog
    }

    /// Looks up a tank catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unknown`] if no entry has this name.
    pub fn stank(&self, name: &str) -> Result<Rc<StankCatalog>, CatalogError> {
        lookup(&self.stank, "stank", name)
    }

    /// Looks up an evaporative cooler catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unknown`] if no entry has this name.
    pub fn evac(&self, name: &str) -> Result<Rc<EvacCatalog>, CatalogError> {
        lookup(&self.evac, "evac", name)
    }

    /// Looks up a heat exchanger catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unknown`] if no entry has this name.
    pub fn hex(&self, name: &str) -> Result<Rc<HexCatalog>, CatalogError> {
        lookup(&self.hex, "hex", name)
    }
}

fn lookup<T>(
    map: &HashMap<String, Rc<T>>,
    kind: &'static str,
    name: &str,
) -> Result<Rc<T>, CatalogError> {
    map.get(name).cloned().ok_or_else(|| CatalogError::Unknown {
        kind,
        catalog: name.to_owned(),
    })
}

/// Unwraps a required field.
pub(crate) fn require<T>(
    catalog: &str,
    field: &'static str,
    value: Option<T>,
) -> Result<T, CatalogError> {
    value.ok_or_else(|| CatalogError::Missing {
        catalog: catalog.to_owned(),
        field,
    })
}

/// Checks that a field is greater than zero.
pub(crate) fn positive(catalog: &str, field: &'static str, value: f64) -> Result<f64, CatalogError> {
    StrictlyPositive::new(value)
        .map(Constrained::into_inner)
        .map_err(|source| invalid(catalog, field, value, source))
}

/// Checks that a field is zero or greater.
pub(crate) fn non_negative(
    catalog: &str,
    field: &'static str,
    value: f64,
) -> Result<f64, CatalogError> {
    NonNegative::new(value)
        .map(Constrained::into_inner)
        .map_err(|source| invalid(catalog, field, value, source))
}

/// Checks that a field lies in `[0, 1]`.
pub(crate) fn fraction(catalog: &str, field: &'static str, value: f64) -> Result<f64, CatalogError> {
    UnitInterval::new(value)
        .map(Constrained::into_inner)
        .map_err(|source| invalid(catalog, field, value, source))
}

fn invalid(catalog: &str, field: &'static str, value: f64, source: ConstraintError) -> CatalogError {
    CatalogError::Invalid {
        catalog: catalog.to_owned(),
        field,
        value,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_an_empty_set() -> Result<(), CatalogError> {
        let set = CatalogSet::from_toml_str("")?;
        assert!(matches!(
            set.stank("anything"),
            Err(CatalogError::Unknown { kind: "stank", .. })
        ));
        Ok(())
    }

    #[test]
    fn unknown_tables_are_rejected() {
        let result = CatalogSet::from_toml_str("[boiler.b1]\ncapacity = 10.0\n");
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn field_helpers() {
        assert!(matches!(
            require::<f64>("c", "volume", None),
            Err(CatalogError::Missing { field: "volume", .. })
        ));
        assert!(matches!(
            positive("c", "volume", 0.0),
            Err(CatalogError::Invalid {
                source: ConstraintError::Zero,
                ..
            })
        ));
        assert!(matches!(
            non_negative("c", "ua_top", -1.0),
            Err(CatalogError::Invalid {
                source: ConstraintError::Negative,
                ..
            })
        ));
        assert!(fraction("c", "effectiveness", 0.4).is_ok());
        assert!(fraction("c", "effectiveness", 1.4).is_err());
    }
}
