use crate::hx::{capacity_ratio::CapacityRatio, effectiveness::Effectiveness, ntu::Ntu};

/// Tolerance within which a capacity ratio is treated as balanced.
const BALANCED: f64 = 1e-5;

/// Beyond this `|(1 − C)·NTU|` the exponential term no longer changes the
/// effectiveness at double precision.
const SATURATED: f64 = 20.0;

/// A flow arrangement with closed-form effectiveness-NTU relations.
///
/// Both directions work per stream: the [NTU](Ntu) is `UA / C_stream` and the
/// [capacity ratio](CapacityRatio) is `C_stream / C_other`.
pub trait Arrangement {
    /// The temperature effectiveness of the stream.
    fn effectiveness(&self, ntu: Ntu, capacity_ratio: CapacityRatio) -> Effectiveness;

    /// The stream [NTU](Ntu) needed to reach an [effectiveness](Effectiveness).
    ///
    /// Returns `None` if the effectiveness cannot be reached at any NTU.
    fn ntu(&self, effectiveness: Effectiveness, capacity_ratio: CapacityRatio) -> Option<Ntu>;
}

/// A counter-flow arrangement.
#[derive(Debug, Clone, Copy)]
pub struct CounterFlow;

impl Arrangement for CounterFlow {
    fn effectiveness(&self, ntu: Ntu, capacity_ratio: CapacityRatio) -> Effectiveness {
        let cr = capacity_ratio.value();
        let ntu = ntu.value();

        let eff = if capacity_ratio.is_balanced(BALANCED) {
            ntu / (1. + ntu)
        } else {
            let b = (1. - cr) * ntu;
            if b > SATURATED {
                1.
            } else if b < -SATURATED {
                // The other stream is the smaller one and leaves at this
                // stream's inlet temperature.
                1. / cr
            } else {
                (1. - (-b).exp()) / (1. - cr * (-b).exp())
            }
        };

        // Finite and within [0, 1] up to rounding for constrained inputs.
        Effectiveness::saturating(eff).unwrap_or_else(|_| Effectiveness::zero())
    }

    fn ntu(&self, effectiveness: Effectiveness, capacity_ratio: CapacityRatio) -> Option<Ntu> {
        let cr = capacity_ratio.value();
        let eff = effectiveness.value();

        if eff >= 1. || eff * cr >= 1. {
            return None;
        }

        let ntu = if capacity_ratio.is_balanced(BALANCED) {
            eff / (1. - eff)
        } else {
            ((1. - eff * cr) / (1. - eff)).ln() / (1. - cr)
        };

        Ntu::new(ntu).ok()
    }
}
