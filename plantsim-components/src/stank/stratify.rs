use std::ops::RangeInclusive;

/// A run of layers merged into one uniform temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedBlock {
    /// Layers in the block, top first.
    pub layers: RangeInclusive<usize>,
    /// Mixed temperature, °C.
    pub temperature: f64,
}

/// Restores a stable stratification by merging inverted layers.
///
/// Layer 0 is the top. A layer warmer than the one above it by more than
/// `tolerance` is merged with it into a block at the mass-weighted mean
/// temperature, and merging repeats until every adjacent pair satisfies
/// `T[i] ≥ T[i + 1] − tolerance`. Energy is conserved for a uniform specific
/// heat.
///
/// Empty layers are barriers: water on either side is stabilised
/// independently and the empty layer keeps its temperature.
///
/// Returns the blocks that merged two or more layers, top first.
pub(super) fn stabilize(
    temperatures: &mut [f64],
    masses: &[f64],
    filled: &[bool],
    tolerance: f64,
) -> Vec<MixedBlock> {
    let stable = (1..temperatures.len()).all(|i| {
        !(filled[i] && filled[i - 1]) || temperatures[i] <= temperatures[i - 1] + tolerance
    });
    if stable {
        return Vec::new();
    }

    let mut mixed = Vec::new();
    let mut start = 0;
    while start < temperatures.len() {
        if !filled[start] {
            start += 1;
            continue;
        }
        let end = (start..temperatures.len())
            .find(|&i| !filled[i])
            .unwrap_or(temperatures.len());
        mixed.extend(stabilize_run(temperatures, masses, start..end, tolerance));
        start = end;
    }
    mixed
}

/// Stabilises one contiguous run of filled layers.
fn stabilize_run(
    temperatures: &mut [f64],
    masses: &[f64],
    run: std::ops::Range<usize>,
    tolerance: f64,
) -> Vec<MixedBlock> {
    // Build a stack of blocks from the top down, merging each new block
    // upward while it is warmer than the block above.
    let mut stack: Vec<Block> = Vec::with_capacity(run.len());
    for i in run {
        let mut block = Block::new(i, temperatures[i], masses[i]);

        while let Some(above) = stack.last() {
            if !should_merge(above, &block, tolerance) {
                break;
            }
            block = merge(above, &block);
            stack.pop();
        }

        stack.push(block);
    }

    let mut mixed = Vec::new();
    for block in stack {
        for i in block.range.clone() {
            temperatures[i] = block.temp;
        }
        if block.range.end() > block.range.start() {
            mixed.push(MixedBlock {
                layers: block.range,
                temperature: block.temp,
            });
        }
    }
    mixed
}

/// A block of adjacent layers at one temperature.
#[derive(Debug, Clone)]
struct Block {
    range: RangeInclusive<usize>,
    temp: f64,
    mass: f64,
}

impl Block {
    fn new(index: usize, temp: f64, mass: f64) -> Self {
        Self {
            range: index..=index,
            temp,
            mass,
        }
    }
}

/// Returns `true` if `below` is warmer than `above` beyond the tolerance.
fn should_merge(above: &Block, below: &Block, tolerance: f64) -> bool {
    below.temp > above.temp + tolerance
}

/// Merges the block pair (above, below) into a new `Block`.
///
/// Mass is conserved and the temperature is the mass-weighted average.
fn merge(above: &Block, below: &Block) -> Block {
    let mass = above.mass + below.mass;
    let temp = if mass > 0.0 {
        (above.mass * above.temp + below.mass * below.temp) / mass
    } else {
        0.5 * (above.temp + below.temp)
    };

    Block {
        range: *above.range.start()..=*below.range.end(),
        temp,
        mass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn run(temps: &[f64], masses: &[f64], filled: &[bool], tol: f64) -> (Vec<f64>, Vec<MixedBlock>) {
        let mut t = temps.to_vec();
        let mixed = stabilize(&mut t, masses, filled, tol);
        (t, mixed)
    }

    fn assert_stable(temps: &[f64], tol: f64) {
        for pair in temps.windows(2) {
            assert!(pair[0] >= pair[1] - tol - 1e-12, "{temps:?}");
        }
    }

    #[test]
    fn no_mixing_needed() {
        let (t, mixed) = run(&[50.0, 40.0, 30.0], &[1.0; 3], &[true; 3], 0.0);
        assert_eq!(t, vec![50.0, 40.0, 30.0]);
        assert!(mixed.is_empty());
    }

    #[test]
    fn all_mixed() {
        let (t, mixed) = run(&[30.0, 40.0, 50.0], &[1.0; 3], &[true; 3], 0.0);

        for temp in &t {
            assert_relative_eq!(*temp, 40.0, epsilon = 1e-12);
        }
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].layers, 0..=2);
    }

    #[test]
    fn some_mixing() {
        let (t, mixed) = run(&[42.0, 40.0, 50.0, 30.0, 20.0], &[1.0; 5], &[true; 5], 0.0);

        assert_relative_eq!(t[0], 44.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], 44.0, epsilon = 1e-12);
        assert_relative_eq!(t[2], 44.0, epsilon = 1e-12);
        assert_relative_eq!(t[3], 30.0);
        assert_relative_eq!(t[4], 20.0);
        assert_eq!(mixed[0].layers, 0..=2);
        assert_stable(&t, 0.0);
    }

    #[test]
    fn uneven_masses() {
        let (t, _) = run(&[4.0, 10.0, 2.0], &[2.0, 4.0, 1.0], &[true; 3], 0.0);

        assert_relative_eq!(t[0], 8.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], 8.0, epsilon = 1e-12);
        assert_relative_eq!(t[2], 2.0);
    }

    #[test]
    fn small_inversions_within_tolerance_are_kept() {
        let (t, mixed) = run(&[40.0, 40.05, 39.0], &[1.0; 3], &[true; 3], 0.1);
        assert_eq!(t, vec![40.0, 40.05, 39.0]);
        assert!(mixed.is_empty());
        assert_stable(&t, 0.1);
    }

    #[test]
    fn empty_layers_separate_runs() {
        let filled = [true, false, true, true];
        let (t, mixed) = run(&[30.0, 90.0, 20.0, 25.0], &[1.0, 0.0, 1.0, 1.0], &filled, 0.0);

        assert_eq!(t[0], 30.0);
        assert_eq!(t[1], 90.0);
        assert_relative_eq!(t[2], 22.5);
        assert_relative_eq!(t[3], 22.5);
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].layers, 2..=3);
    }

    #[test]
    fn merged_blocks_keep_cascading_upward() {
        // Mixing the bottom pair produces a block warmer than the layer above.
        let (t, _) = run(&[50.0, 30.0, 20.0, 100.0], &[1.0; 4], &[true; 4], 0.0);
        assert_stable(&t, 0.0);

        let energy: f64 = t.iter().sum();
        assert_relative_eq!(energy, 200.0, epsilon = 1e-10);
    }
}
