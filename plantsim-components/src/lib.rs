//! Equipment models for quasi-steady plant simulation.
//!
//! Every model here follows the three-phase contract from
//! [`plantsim_core::Equipment`]: it is built once from a validated catalog,
//! writes linear characteristic equations into its outlets each timestep, and
//! settles its internal state once the plant solver has filled in the solved
//! terminal values.
//!
//! - [`stank`]: stratified storage tank with direct ports and immersed coils.
//! - [`evac`]: multi-layer indirect evaporative cooler.
//! - [`hx`]: effectiveness-NTU relations and a two-stream heat exchanger.
//! - [`catalog`]: TOML catalog loading and validation.

pub mod catalog;
pub mod evac;
pub mod hx;
pub mod stank;

pub use catalog::{CatalogError, CatalogSet};
