//! Reproducible train/held-out partition

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices for each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub held_out: Vec<usize>,
}

/// Shuffle `n` row indices with `seed` and hold out `fraction` of them.
///
/// The held-out size is rounded up but always leaves at least one training row.
pub fn train_held_out_split(n: usize, fraction: f32, seed: u64) -> Split {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let wanted = (n as f32 * fraction.clamp(0.0, 1.0)).ceil() as usize;
    let held_out_len = wanted.min(n.saturating_sub(1));

    let held_out = indices.split_off(n - held_out_len);
    Split {
        train: indices,
        held_out,
    }
}
