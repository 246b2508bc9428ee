//! Two-phase generation: quasi-random exploration, then a model.

use crate::error::Result;
use crate::generator::{
    GenerationRequest, Generator, GeneratorRun, GpGenerator, Prediction, SobolGenerator,
};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::search_space::{Parameterization, SearchSpace};

/// Minimum number of startup trials, whatever the dimensionality.
const MIN_STARTUP_TRIALS: usize = 5;

/// The default generator of an [`Experiment`](crate::Experiment).
///
/// Uses a [`SobolGenerator`] while fewer than `n_startup` trials are
/// completed, then hands over to a model-based generator
/// ([`GpGenerator`] unless replaced). The startup count defaults to
/// `max(5, 2 * dims)` where `dims` is the number of tunable parameters.
///
/// Trials record which phase produced them through
/// [`GeneratorRun::generator`].
///
/// # Examples
///
/// ```
/// use asktell::generator::{GenerationStrategy, RandomGenerator};
///
/// let default = GenerationStrategy::new();
/// let custom = GenerationStrategy::new()
///     .n_startup(10)
///     .model(RandomGenerator::with_seed(1));
/// ```
pub struct GenerationStrategy {
    startup: SobolGenerator,
    model: Box<dyn Generator>,
    n_startup: Option<usize>,
}

impl GenerationStrategy {
    /// Sobol startup followed by a GP with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            startup: SobolGenerator::new(),
            model: Box::new(GpGenerator::new()),
            n_startup: None,
        }
    }

    /// Seeds both phases.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            startup: SobolGenerator::with_seed(seed),
            model: Box::new(GpGenerator::with_seed(seed)),
            n_startup: None,
        }
    }

    /// Overrides the number of completed trials required before the model phase.
    #[must_use]
    pub fn n_startup(mut self, n: usize) -> Self {
        self.n_startup = Some(n);
        self
    }

    /// Replaces the model-phase generator.
    #[must_use]
    pub fn model(mut self, model: impl Generator + 'static) -> Self {
        self.model = Box::new(model);
        self
    }

    /// Completed trials required before the model phase for `space`.
    #[must_use]
    pub fn startup_trials(&self, space: &SearchSpace) -> usize {
        self.n_startup
            .unwrap_or_else(|| MIN_STARTUP_TRIALS.max(2 * space.n_dims()))
    }

    fn phase(&self, space: &SearchSpace, ledger: &Ledger) -> &dyn Generator {
        if ledger.completed().count() < self.startup_trials(space) {
            &self.startup
        } else {
            self.model.as_ref()
        }
    }
}

impl Default for GenerationStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for GenerationStrategy {
    fn name(&self) -> &'static str {
        "generation_strategy"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratorRun> {
        let active = self.phase(request.space, request.ledger);
        trace_debug!(phase = active.name(), "generation strategy dispatch");
        active.generate(request)
    }

    fn predict(
        &self,
        space: &SearchSpace,
        config: &OptimizationConfig,
        ledger: &Ledger,
        parameterization: &Parameterization,
    ) -> Option<Prediction> {
        self.model.predict(space, config, ledger, parameterization)
    }
}
