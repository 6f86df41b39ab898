use serde::Deserialize;

use crate::catalog::{CatalogError, non_negative, require};

/// Heat exchanger catalog entry as read from a file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHexCatalog {
    /// Overall conductance, W/K.
    pub ua: Option<f64>,
}

/// Validated heat exchanger nameplate data.
#[derive(Debug, Clone, PartialEq)]
pub struct HexCatalog {
    name: String,
    ua: f64,
}

impl HexCatalog {
    /// Validates a raw catalog entry.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if `ua` is missing or negative.
    pub fn validate(name: &str, raw: RawHexCatalog) -> Result<Self, CatalogError> {
        let ua = non_negative(name, "ua", require(name, "ua", raw.ua)?)?;
        Ok(Self {
            name: name.to_owned(),
            ua,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overall conductance, W/K.
    #[must_use]
    pub fn ua(&self) -> f64 {
        self.ua
    }
}
