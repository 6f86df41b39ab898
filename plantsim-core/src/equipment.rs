use crate::terminal::{Inlet, Outlet};

/// A piece of plant equipment following the three-phase timestep contract.
///
/// Instances are created once from a validated catalog, then driven through
/// the same two phases every timestep:
///
/// 1. [`update_coefficients`](Equipment::update_coefficients) reads inlet
///    flows and the previous state, and writes a linear characteristic
///    equation into every outlet.
/// 2. The plant solver (outside this crate) fills the solved inlet and
///    outlet values.
/// 3. [`settle`](Equipment::settle) reads the solved values back and advances
///    the equipment's internal state.
///
/// Phase order within one instance is fixed. Different instances are
/// independent until the plant solve and may be visited in any order.
pub trait Equipment {
    /// Physical quantities produced by a settlement.
    type Report;

    type Error: std::error::Error + Send + Sync + 'static;

    /// The instance name, used in diagnostics.
    fn name(&self) -> &str;

    fn inlets(&self) -> &[Inlet];

    fn inlets_mut(&mut self) -> &mut [Inlet];

    fn outlets(&self) -> &[Outlet];

    fn outlets_mut(&mut self) -> &mut [Outlet];

    /// Computes and writes the outlet characteristic equations.
    ///
    /// # Errors
    ///
    /// Returns an error if the equipment cannot produce valid coefficients,
    /// which should abort the run.
    fn update_coefficients(&mut self) -> Result<(), Self::Error>;

    /// Reads solved values and advances the internal state by one timestep.
    ///
    /// # Errors
    ///
    /// Returns an error on a physical inconsistency that should abort the run.
    fn settle(&mut self) -> Result<Self::Report, Self::Error>;
}

/// Outcome of a settlement that the orchestrator inspects.
///
/// `state_changed` reports that the equipment corrected its own state (for
/// example, mixed an unstable tank) so the current timestep's plant solve
/// should be repeated with fresh coefficients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settlement {
    pub state_changed: bool,
}

impl Settlement {
    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn changed() -> Self {
        Self {
            state_changed: true,
        }
    }
}
