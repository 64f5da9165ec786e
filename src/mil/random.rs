use core::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

/// Source of uniformly distributed numbers in `[0, 1)`.
pub trait RandomSource {
    fn next_uniform(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_uniform(&mut self) -> f64 {
        self.gen()
    }
}

/// Random source shared between the planes of a grid.
///
/// Clones hand out the same underlying generator.
#[derive(Clone)]
pub struct SharedRandom(Arc<Mutex<Box<dyn RandomSource + Send>>>);

impl fmt::Debug for SharedRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedRandom")
    }
}

impl Default for SharedRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl SharedRandom {
    pub fn new(source: impl RandomSource + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(source))))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Two consecutive draws under one lock.
    pub fn draw_pair(&self) -> (f64, f64) {
        let mut source = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let first = source.next_uniform();
        let second = source.next_uniform();
        (first, second)
    }

    pub fn shares_source_with(&self, other: &SharedRandom) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
