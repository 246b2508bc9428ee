use crate::generator::{GenerationStrategy, Generator};
use crate::stopping::{EarlyStopping, NoEarlyStopping};

use super::Experiment;

/// A builder for constructing [`Experiment`] instances with a fluent API.
///
/// Created via [`Experiment::builder()`].
///
/// # Defaults
///
/// - Generator: [`GenerationStrategy`] (Sobol startup, then GP)
/// - Early stopping: [`NoEarlyStopping`]
/// - Seed: random
///
/// # Examples
///
/// ```
/// use asktell::prelude::*;
///
/// let experiment = Experiment::builder()
///     .seed(42)
///     .early_stopping(PercentileEarlyStopping::new(50.0).min_progression(3.0))
///     .build();
/// ```
#[derive(Default)]
pub struct ExperimentBuilder {
    generator: Option<Box<dyn Generator>>,
    early_stopping: Option<Box<dyn EarlyStopping>>,
    seed: Option<u64>,
}

impl ExperimentBuilder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Sets the candidate generator.
    ///
    /// Overrides [`seed`](Self::seed), which only seeds the default strategy.
    #[must_use]
    pub fn generator(mut self, generator: impl Generator + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    /// Sets the early-stopping evaluator.
    #[must_use]
    pub fn early_stopping(mut self, evaluator: impl EarlyStopping + 'static) -> Self {
        self.early_stopping = Some(Box::new(evaluator));
        self
    }

    /// Seeds the default generation strategy for reproducible proposals.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the unconfigured experiment.
    #[must_use]
    pub fn build(self) -> Experiment {
        let seed = self.seed;
        let generator = self.generator.unwrap_or_else(|| {
            Box::new(seed.map_or_else(GenerationStrategy::new, GenerationStrategy::with_seed))
        });
        let early_stopping = self
            .early_stopping
            .unwrap_or_else(|| Box::new(NoEarlyStopping));
        Experiment::from_parts(generator, early_stopping)
    }
}
