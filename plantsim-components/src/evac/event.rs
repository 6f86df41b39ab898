use uom::si::f64::MassRate;

use crate::evac::Suppression;

/// Internal decisions an [`Evac`](crate::evac::Evac) reports to an observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvacEvent {
    /// The cooler is off or a side has no flow; outlets copy their inlets.
    Bypassed,

    /// Evaporation is switched off in one layer for this step.
    EvaporationSuppressed {
        layer: usize,
        reason: Suppression,
    },

    /// A switched-off cooler dropped its layer state.
    StateCleared,

    /// Water evaporated from one layer's wet surface during settlement.
    Evaporated { layer: usize, rate: MassRate },
}
