//! Uniform random generator.

use parking_lot::Mutex;

use crate::error::Result;
use crate::generator::common::{Dedup, fill_batch};
use crate::generator::{DEFAULT_DUPLICATE_TOLERANCE, GenerationRequest, Generator, GeneratorRun};
use crate::rng_util;

/// Samples every tunable dimension uniformly in the unit-cube encoding.
///
/// Log-scaled parameters are therefore uniform in log space, and integer
/// and categorical values are equally likely. Draws that violate a
/// parameter constraint or duplicate an existing trial are rejected.
///
/// # Examples
///
/// ```
/// use asktell::generator::RandomGenerator;
///
/// let generator = RandomGenerator::new();
/// let seeded = RandomGenerator::with_seed(42);
/// ```
pub struct RandomGenerator {
    rng: Mutex<fastrand::Rng>,
    tolerance: f64,
}

impl RandomGenerator {
    /// Creates a random generator with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(fastrand::Rng::new())
    }

    /// Creates a random generator with a fixed seed for reproducibility.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(fastrand::Rng::with_seed(seed))
    }

    fn from_rng(rng: fastrand::Rng) -> Self {
        Self {
            rng: Mutex::new(rng),
            tolerance: DEFAULT_DUPLICATE_TOLERANCE,
        }
    }

    /// Sets the duplicate tolerance (Chebyshev distance in the unit cube).
    #[must_use]
    pub fn duplicate_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    fn name(&self) -> &'static str {
        "random"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratorRun> {
        let mut rng = self.rng.lock();
        let n_dims = request.space.n_dims();
        let mut dedup = Dedup::from_request(request, self.tolerance);
        let batch = fill_batch(request, &mut dedup, request.count, || {
            rng_util::unit_point(&mut rng, n_dims)
        })?;
        Ok(GeneratorRun::new(self.name(), batch))
    }
}
