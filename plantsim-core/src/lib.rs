//! Core contract shared by plant equipment models.
//!
//! Equipment instances talk to the plant network only through [`Inlet`]s and
//! [`Outlet`]s: flows come in, linear characteristic equations go out, and
//! solved values come back for settlement.

pub mod constraint;

mod equipment;
mod observe;
mod terminal;

pub use equipment::{Equipment, Settlement};
pub use observe::Observer;
pub use terminal::{FluidKind, Inlet, Outlet, TerminalError};
