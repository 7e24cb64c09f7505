//! src/sampler.rs
//!
//! Iteration-order strategies over the reference store.
//!
//! A `Sampler` turns a pass number into a sequence of indices in
//! `[0, dataset_size)`. The pipeline asks for a fresh order at the start of
//! every pass, so shuffling samplers redraw their permutation each time.

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

/// Defines the iteration order for one pass over the store.
///
/// `iter(epoch)` returns the full order for that pass. Samplers derive any
/// randomness from the epoch so that a fixed base seed makes every pass
/// reproducible while still varying across passes.
pub trait Sampler: Send + Sync {
    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_>;
}

/// Identity order: `0, 1, ..., dataset_size - 1`, every pass.
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    dataset_size: usize,
}

impl SequentialSampler {
    pub fn new(dataset_size: usize) -> Self {
        Self { dataset_size }
    }
}

impl Sampler for SequentialSampler {
    fn iter(&self, _epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        Box::new(0..self.dataset_size)
    }
}

/// A uniformly random permutation of `0..dataset_size`, redrawn per pass.
///
/// The RNG for pass `epoch` is seeded with `base_seed + epoch`: two samplers
/// built with the same seed produce identical permutations for the same pass,
/// while consecutive passes see independently-drawn orders.
#[derive(Debug, Clone)]
pub struct ShuffledSampler {
    dataset_size: usize,
    base_seed: u64,
}

impl ShuffledSampler {
    pub fn new(dataset_size: usize, base_seed: u64) -> Self {
        Self {
            dataset_size,
            base_seed,
        }
    }

    #[inline]
    fn derive_rng_for_epoch(&self, epoch: usize) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(epoch as u64))
    }
}

impl Sampler for ShuffledSampler {
    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        let mut rng = self.derive_rng_for_epoch(epoch);
        let mut indices: Vec<usize> = (0..self.dataset_size).collect();
        indices.shuffle(&mut rng);
        Box::new(indices.into_iter())
    }
}
