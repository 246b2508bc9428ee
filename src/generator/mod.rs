//! Candidate generation: the `ask` half of the ask-tell loop.
//!
//! A [`Generator`] receives the whole [`Ledger`] (all statuses) together
//! with the parameter space and optimization configuration, and proposes
//! up to `count` new parameterizations. Generators never mutate the
//! ledger; the [`Experiment`](crate::Experiment) turns their output into
//! trials.
//!
//! # Contract
//!
//! Every generator in this module:
//!
//! - returns only points inside the search space that satisfy its
//!   parameter constraints;
//! - never returns a point within the duplicate tolerance (Chebyshev
//!   distance in the unit-cube encoding) of an existing trial or of another
//!   point in the same batch;
//! - returns fewer than `count` points only when it cannot find more
//!   distinct candidates;
//! - polls the request's [`CancelToken`] and returns
//!   [`Error::Cancelled`](crate::Error::Cancelled) once it is set.
//!
//! # Available generators
//!
//! | Generator | Strategy |
//! |---|---|
//! | [`RandomGenerator`] | Uniform sampling in the encoded space |
//! | [`SobolGenerator`] | Scrambled Sobol sequence indexed by ledger length |
//! | [`GpGenerator`] | Gaussian process with Expected Improvement |
//! | [`GenerationStrategy`] | Sobol during startup, then a model-based generator |
//!
//! Custom strategies implement [`Generator`] and are installed with
//! [`ExperimentBuilder::generator`](crate::ExperimentBuilder::generator).

mod common;
pub mod gp;
pub mod random;
pub mod sobol;
pub mod strategy;

pub use gp::{GpGenerator, GpGeneratorBuilder};
pub use random::RandomGenerator;
pub use sobol::SobolGenerator;
pub use strategy::GenerationStrategy;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::search_space::{Parameterization, SearchSpace};

/// Default duplicate tolerance in the unit-cube encoding.
pub const DEFAULT_DUPLICATE_TOLERANCE: f64 = 1e-9;

/// Everything a generator may look at for one call.
#[derive(Clone, Copy, Debug)]
pub struct GenerationRequest<'a> {
    /// The configured parameter space.
    pub space: &'a SearchSpace,
    /// The configured objectives and outcome constraints.
    pub config: &'a OptimizationConfig,
    /// All trials created so far, in every status.
    pub ledger: &'a Ledger,
    /// Maximum number of parameterizations to return.
    pub count: usize,
    /// Aborts generation when set.
    pub cancel: &'a CancelToken,
}

/// The output of one generator call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratorRun {
    /// Name of the generator that produced the points.
    pub generator: String,
    /// Proposed parameterizations, in proposal order.
    pub parameterizations: Vec<Parameterization>,
}

impl GeneratorRun {
    /// Creates a run attributed to `generator`.
    #[must_use]
    pub fn new(generator: impl Into<String>, parameterizations: Vec<Parameterization>) -> Self {
        Self {
            generator: generator.into(),
            parameterizations,
        }
    }

    /// Number of proposed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameterizations.len()
    }

    /// Returns `true` if nothing was proposed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameterizations.is_empty()
    }
}

/// Posterior prediction of the objective value at one parameterization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    /// Predicted objective value, in the units of
    /// [`OptimizationConfig::objective_value`].
    pub mean: f64,
    /// Posterior variance of the prediction.
    pub variance: f64,
}

/// Trait for pluggable candidate generation strategies.
///
/// Implementations must be `Send + Sync`: an
/// [`Experiment`](crate::Experiment) shared across threads calls
/// `generate` while other threads read the ledger. Mutable generator state
/// (such as an RNG) goes behind a lock inside the implementation.
pub trait Generator: Send + Sync {
    /// Short name recorded on every trial this generator proposes.
    fn name(&self) -> &str;

    /// Proposes up to `request.count` new parameterizations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) if the
    /// request's token is cancelled during generation.
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratorRun>;

    /// Posterior prediction of the objective at `parameterization`, if this
    /// generator maintains a surrogate model.
    ///
    /// The default returns `None`.
    fn predict(
        &self,
        space: &SearchSpace,
        config: &OptimizationConfig,
        ledger: &Ledger,
        parameterization: &Parameterization,
    ) -> Option<Prediction> {
        let _ = (space, config, ledger, parameterization);
        None
    }
}
