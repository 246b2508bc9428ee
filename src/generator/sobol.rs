//! Quasi-random generator using scrambled Sobol sequences.
//!
//! [`SobolGenerator`] spreads points more evenly over the space than
//! [`RandomGenerator`](super::RandomGenerator), which makes it a good
//! exploration phase before model-guided generation.
//!
//! # How it works
//!
//! The generator keeps a cursor into the sequence. Each call resumes at the
//! cursor, or at the ledger length if that is further along (a restored
//! ledger), and leaves the cursor past the last index it drew. Indices spent
//! on constraint rejections or duplicates are never walked again.
//!
//! Each tunable parameter maps to one Sobol dimension, in definition order.
//! The point in \[0, 1) is decoded like any other unit-cube point (log
//! scaling, integer cells, categories).

use parking_lot::Mutex;
use sobol_burley::{NUM_DIMENSIONS, sample};

use crate::error::Result;
use crate::generator::common::{Dedup, fill_batch};
use crate::generator::{DEFAULT_DUPLICATE_TOLERANCE, GenerationRequest, Generator, GeneratorRun};

/// Quasi-random generator using a scrambled (Burley 2020) Sobol sequence.
///
/// # Examples
///
/// ```
/// use asktell::generator::SobolGenerator;
///
/// let generator = SobolGenerator::with_seed(7);
/// ```
pub struct SobolGenerator {
    seed: u32,
    tolerance: f64,
    cursor: Mutex<u32>,
}

impl SobolGenerator {
    /// Creates a Sobol generator with seed 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates a Sobol generator with the given scrambling seed.
    ///
    /// Different seeds produce statistically independent sequences.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: seed as u32,
            tolerance: DEFAULT_DUPLICATE_TOLERANCE,
            cursor: Mutex::new(0),
        }
    }

    /// Sets the duplicate tolerance (Chebyshev distance in the unit cube).
    #[must_use]
    pub fn duplicate_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// The point at `index` of this generator's sequence.
    fn point(&self, index: u32, n_dims: usize) -> Vec<f64> {
        (0..n_dims)
            .map(|d| {
                let d = u32::try_from(d).unwrap_or(u32::MAX);
                // Dimensions past the table reuse it under a different scramble.
                let seed = self.seed.wrapping_add(d / NUM_DIMENSIONS);
                f64::from(sample(index, d % NUM_DIMENSIONS, seed))
            })
            .collect()
    }
}

impl Default for SobolGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SobolGenerator {
    fn name(&self) -> &'static str {
        "sobol"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratorRun> {
        let n_dims = request.space.n_dims();
        let mut cursor = self.cursor.lock();
        let ledger_len = u32::try_from(request.ledger.len()).unwrap_or(u32::MAX);
        let mut index = (*cursor).max(ledger_len);
        let mut dedup = Dedup::from_request(request, self.tolerance);
        let batch = fill_batch(request, &mut dedup, request.count, || {
            let point = self.point(index, n_dims);
            index = index.wrapping_add(1);
            point
        });
        *cursor = index;
        let batch = batch?;
        trace_debug!(n = batch.len(), next_index = index, "sobol batch generated");
        Ok(GeneratorRun::new(self.name(), batch))
    }
}
