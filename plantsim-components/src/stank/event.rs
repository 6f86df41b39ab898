use std::ops::RangeInclusive;

use uom::si::f64::ThermodynamicTemperature;

use crate::stank::BatchOperation;

/// Internal decisions a [`Stank`](crate::stank::Stank) reports to an observer.
#[derive(Debug, Clone, PartialEq)]
pub enum TankEvent {
    /// The tank matrix was rebuilt and inverted.
    SystemRebuilt { unknowns: usize },

    /// Inverted layers were mixed to a common temperature.
    LayersMixed {
        layers: RangeInclusive<usize>,
        temperature: ThermodynamicTemperature,
    },

    /// A fill or drain replaced the layer balance for one step.
    BatchApplied { operation: BatchOperation },
}
