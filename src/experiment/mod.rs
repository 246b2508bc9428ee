//! The experiment controller: the public ask-tell surface.

#[cfg(feature = "async")]
mod async_impl;
mod builder;
#[cfg(feature = "serde")]
mod persistence;
mod snapshot;

use std::collections::BTreeMap;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

pub use builder::ExperimentBuilder;
pub use snapshot::{ExperimentSnapshot, SNAPSHOT_VERSION};

use crate::cancel::CancelToken;
use crate::data::{RawData, check_finite};
use crate::error::{Error, Result};
use crate::generator::{GenerationRequest, Generator};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::parameter::Parameter;
use crate::search_space::{ParameterConstraint, Parameterization, SearchSpace};
use crate::selector::{self, BestPoint, FrontierPoint, SelectionContext};
use crate::stopping::{EarlyStopping, StopDecision};
use crate::trial::{Trial, TrialSource};
use crate::types::TrialStatus;

/// The configured space and objectives.
#[derive(Clone, Debug)]
struct Setup {
    space: SearchSpace,
    config: OptimizationConfig,
}

#[derive(Debug, Default)]
struct State {
    setup: Option<Setup>,
    ledger: Ledger,
}

impl State {
    fn setup(&self) -> Result<&Setup> {
        self.setup
            .as_ref()
            .ok_or_else(|| Error::config("experiment is not configured"))
    }
}

/// An ask-tell experiment.
///
/// The experiment owns the parameter space, the optimization configuration
/// and the trial ledger. Callers drive it through a loop of
/// [`ask`](Self::ask) (propose trials), external evaluation, and
/// [`tell`](Self::tell) (report final metrics), optionally interleaved with
/// [`report_progress`](Self::report_progress) and early-stopping checks.
///
/// All state sits behind one [`parking_lot::RwLock`], so an `Experiment` is
/// `Send + Sync` and can be shared through an `Arc`. Mutations of the
/// ledger are serialized. Candidate generation holds an upgradable read
/// lock: readers proceed while a generator runs, and the new trials are
/// inserted only after generation succeeds.
///
/// # Examples
///
/// ```
/// use asktell::data::raw_data;
/// use asktell::prelude::*;
///
/// let experiment = Experiment::builder().seed(7).build();
/// experiment
///     .configure(
///         vec![Parameter::float("x", -5.0, 5.0)],
///         OptimizationConfig::single(Objective::minimize("loss")),
///     )
///     .unwrap();
///
/// for _ in 0..4 {
///     for (index, params) in experiment.ask(2).unwrap() {
///         let x = params["x"].as_f64().unwrap();
///         experiment.tell(index, raw_data([("loss", x * x)])).unwrap();
///     }
/// }
///
/// let best = experiment.best().unwrap();
/// assert!(best.value >= 0.0);
/// ```
pub struct Experiment {
    state: RwLock<State>,
    generator: Box<dyn Generator>,
    early_stopping: Box<dyn EarlyStopping>,
}

impl Experiment {
    /// Creates an unconfigured experiment with the default generation
    /// strategy and no early stopping.
    #[must_use]
    pub fn new() -> Self {
        ExperimentBuilder::new().build()
    }

    /// Returns a builder for choosing the generator, the early-stopping
    /// evaluator and the seed.
    #[must_use]
    pub fn builder() -> ExperimentBuilder {
        ExperimentBuilder::new()
    }

    pub(crate) fn from_parts(
        generator: Box<dyn Generator>,
        early_stopping: Box<dyn EarlyStopping>,
    ) -> Self {
        Self {
            state: RwLock::new(State::default()),
            generator,
            early_stopping,
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Sets the parameter space and optimization configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a parameter name is repeated, a
    /// domain is malformed, the configuration is malformed, or the
    /// experiment is already configured.
    pub fn configure(&self, parameters: Vec<Parameter>, config: OptimizationConfig) -> Result<()> {
        self.configure_with_constraints(parameters, Vec::new(), config)
    }

    /// Like [`configure`](Self::configure), with linear or order constraints
    /// between numeric parameters.
    ///
    /// # Errors
    ///
    /// As [`configure`](Self::configure); also fails if a constraint names an
    /// unknown or non-numeric parameter.
    pub fn configure_with_constraints(
        &self,
        parameters: Vec<Parameter>,
        constraints: Vec<ParameterConstraint>,
        config: OptimizationConfig,
    ) -> Result<()> {
        let space = SearchSpace::new(parameters, constraints)?;
        config.validate()?;

        let mut state = self.state.write();
        if state.setup.is_some() {
            return Err(Error::config("experiment is already configured"));
        }
        trace_info!(
            n_params = space.parameters().len(),
            n_dims = space.n_dims(),
            multi_objective = config.is_multi_objective(),
            "experiment configured"
        );
        state.setup = Some(Setup { space, config });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ask
    // -----------------------------------------------------------------------

    /// Generates up to `count` new trials in `Running` status.
    ///
    /// Returns fewer than `count` trials only if the generator cannot find
    /// more distinct candidates; that is logged, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `count` is 0 or the experiment is
    /// not configured, and [`Error::Domain`] if the generator proposes a
    /// point outside the space.
    pub fn ask(&self, count: usize) -> Result<BTreeMap<u64, Parameterization>> {
        self.generate_trials(count, &CancelToken::new(), TrialStatus::Running)
    }

    /// Like [`ask`](Self::ask), aborting when `cancel` is set.
    ///
    /// # Errors
    ///
    /// As [`ask`](Self::ask), plus [`Error::Cancelled`]. A cancelled call
    /// creates no trials.
    pub fn ask_with_cancel(
        &self,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<BTreeMap<u64, Parameterization>> {
        self.generate_trials(count, cancel, TrialStatus::Running)
    }

    /// Like [`ask`](Self::ask), but the trials stay `Candidate` until
    /// [`mark_running`](Self::mark_running) acknowledges their dispatch.
    ///
    /// # Errors
    ///
    /// As [`ask`](Self::ask).
    pub fn propose(&self, count: usize) -> Result<BTreeMap<u64, Parameterization>> {
        self.generate_trials(count, &CancelToken::new(), TrialStatus::Candidate)
    }

    fn generate_trials(
        &self,
        count: usize,
        cancel: &CancelToken,
        status: TrialStatus,
    ) -> Result<BTreeMap<u64, Parameterization>> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("ask", count, status = %status).entered();

        if count == 0 {
            return Err(Error::config("count must be at least 1"));
        }

        let state = self.state.upgradable_read();
        let setup = state.setup()?;
        let request = GenerationRequest {
            space: &setup.space,
            config: &setup.config,
            ledger: &state.ledger,
            count,
            cancel,
        };
        let mut run = self.generator.generate(&request)?;
        run.parameterizations.truncate(count);
        for parameterization in &run.parameterizations {
            setup.space.check_membership(parameterization)?;
        }
        if run.len() < count {
            trace_warn!(
                requested = count,
                produced = run.len(),
                generator = %run.generator,
                "generator returned fewer candidates than requested"
            );
        }

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        let source = TrialSource::Generated {
            generator: run.generator,
        };
        let batch: BTreeMap<u64, Parameterization> = run
            .parameterizations
            .into_iter()
            .map(|p| {
                let index = state.ledger.create(p.clone(), status, source.clone());
                (index, p)
            })
            .collect();

        trace_info!(n = batch.len(), total = state.ledger.len(), "trials created");
        Ok(batch)
    }

    /// Acknowledges dispatch of a proposed trial: `Candidate -> Running`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrial`] or [`Error::State`].
    pub fn mark_running(&self, index: u64) -> Result<()> {
        self.state.write().ledger.get_mut(index)?.mark_running()
    }

    // -----------------------------------------------------------------------
    // Attach
    // -----------------------------------------------------------------------

    /// Registers an externally chosen parameterization as a new `Running`
    /// trial and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if a value is outside its domain, a name is
    /// unknown or missing, or a parameter constraint is violated, and
    /// [`Error::Configuration`] if the experiment is not configured.
    pub fn attach(&self, parameterization: Parameterization) -> Result<u64> {
        let mut state = self.state.write();
        state.setup()?.space.check_membership(&parameterization)?;
        let index = state
            .ledger
            .create(parameterization, TrialStatus::Running, TrialSource::Attached);
        trace_debug!(trial = index, "parameterization attached");
        Ok(index)
    }

    /// Registers a parameterization that was already evaluated, as a new
    /// `Completed` trial.
    ///
    /// # Errors
    ///
    /// As [`attach`](Self::attach), plus [`Error::Domain`] if a reading is
    /// NaN or infinite.
    pub fn attach_completed(&self, parameterization: Parameterization, data: RawData) -> Result<u64> {
        let mut state = self.state.write();
        state.setup()?.space.check_membership(&parameterization)?;
        check_finite(&data)?;
        let index = state
            .ledger
            .create(parameterization, TrialStatus::Running, TrialSource::Attached);
        state.ledger.get_mut(index)?.complete(data)?;
        Ok(index)
    }

    // -----------------------------------------------------------------------
    // Tell and progress
    // -----------------------------------------------------------------------

    /// Records final metrics: `Running -> Completed`.
    ///
    /// Metrics not named by the optimization configuration are kept and
    /// ignored by selection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrial`], [`Error::State`], or [`Error::Domain`]
    /// if a reading is NaN or infinite.
    pub fn tell(&self, index: u64, data: RawData) -> Result<()> {
        let mut state = self.state.write();
        state.ledger.get_mut(index)?.complete(data)?;
        trace_info!(trial = index, "trial completed");
        Ok(())
    }

    /// Appends an intermediate observation to a running trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrial`], [`Error::State`] if the trial is not
    /// running, [`Error::NonMonotonicProgression`] if `progression` is lower
    /// than the previous report, [`Error::Configuration`] if it is not
    /// finite, and [`Error::Domain`] if a reading is NaN or infinite.
    pub fn report_progress(&self, index: u64, data: RawData, progression: f64) -> Result<()> {
        let mut state = self.state.write();
        state.ledger.get_mut(index)?.report(data, progression)?;
        trace_debug!(trial = index, progression, "progress reported");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Early stopping and terminal transitions
    // -----------------------------------------------------------------------

    /// Asks the early-stopping evaluator whether a running trial should stop.
    ///
    /// Advisory only: nothing changes until
    /// [`mark_early_stopped`](Self::mark_early_stopped) is called.
    ///
    /// # Errors
    ///
    /// As [`stop_decision`](Self::stop_decision).
    pub fn should_stop_early(&self, index: u64) -> Result<bool> {
        self.stop_decision(index).map(|d| d.should_stop())
    }

    /// The evaluator's decision for a running trial, with its reason.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrial`], [`Error::State`] if the trial is not
    /// running, and [`Error::Configuration`] if the experiment is not
    /// configured.
    pub fn stop_decision(&self, index: u64) -> Result<StopDecision> {
        let state = self.state.read();
        let trial = state.ledger.get(index).ok_or(Error::UnknownTrial(index))?;
        if trial.status() != TrialStatus::Running {
            return Err(Error::State {
                index,
                status: trial.status(),
                operation: "evaluate early stopping for",
            });
        }
        let decision = self
            .early_stopping
            .evaluate(trial, &state.ledger, &state.setup()?.config);
        trace_debug!(trial = index, decision = %decision, "early-stopping evaluated");
        Ok(decision)
    }

    /// `Running -> EarlyStopped`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrial`] or [`Error::State`].
    pub fn mark_early_stopped(&self, index: u64) -> Result<()> {
        self.state.write().ledger.get_mut(index)?.early_stop()?;
        trace_info!(trial = index, "trial early-stopped");
        Ok(())
    }

    /// Marks a non-terminal trial as failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrial`] or [`Error::State`].
    pub fn mark_failed(&self, index: u64, reason: impl Into<String>) -> Result<()> {
        self.state.write().ledger.get_mut(index)?.fail(reason.into())?;
        trace_info!(trial = index, "trial failed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    fn select<T>(
        &self,
        f: impl FnOnce(&dyn selector::ResultSelector, &SelectionContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.read();
        let setup = state.setup()?;
        let ctx = SelectionContext {
            space: &setup.space,
            config: &setup.config,
            ledger: &state.ledger,
            generator: self.generator.as_ref(),
        };
        f(selector::for_config(&setup.config), &ctx)
    }

    /// The best eligible trial of a single-objective or scalarized experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if no completed trial has every
    /// configured metric and satisfies every outcome constraint, and
    /// [`Error::Configuration`] for multi-objective experiments.
    pub fn best(&self) -> Result<BestPoint> {
        self.select(|s, ctx| s.best(ctx))
    }

    /// The Pareto frontier, ordered by trial index.
    ///
    /// For single-objective experiments this is the best point alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if no trial is eligible.
    pub fn pareto_frontier(&self) -> Result<Vec<FrontierPoint>> {
        self.select(|s, ctx| s.frontier(ctx))
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// A complete, self-describing copy of the experiment state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the experiment is not configured.
    pub fn snapshot(&self) -> Result<ExperimentSnapshot> {
        let state = self.state.read();
        let setup = state.setup()?;
        Ok(ExperimentSnapshot {
            version: SNAPSHOT_VERSION,
            search_space: setup.space.clone(),
            config: setup.config.clone(),
            trials: state.ledger.trials().to_vec(),
        })
    }

    /// Replaces the experiment state with `snapshot`.
    ///
    /// The generator and early-stopping evaluator are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the snapshot is corrupt: unknown
    /// version, invalid space or configuration, non-dense trial indices, or
    /// a trial outside the space.
    pub fn restore(&self, snapshot: ExperimentSnapshot) -> Result<()> {
        let (space, config, ledger) = snapshot.validate()?;
        let mut state = self.state.write();
        trace_info!(n_trials = ledger.len(), "experiment restored");
        *state = State {
            setup: Some(Setup { space, config }),
            ledger,
        };
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// A copy of one trial.
    #[must_use]
    pub fn trial(&self, index: u64) -> Option<Trial> {
        self.state.read().ledger.get(index).cloned()
    }

    /// Copies of all trials in index order.
    #[must_use]
    pub fn trials(&self) -> Vec<Trial> {
        self.state.read().ledger.trials().to_vec()
    }

    /// Number of trials ever created.
    #[must_use]
    pub fn n_trials(&self) -> usize {
        self.state.read().ledger.len()
    }

    /// Number of trials per status.
    #[must_use]
    pub fn count_by_status(&self) -> BTreeMap<TrialStatus, usize> {
        self.state.read().ledger.count_by_status()
    }

    /// Runs `f` with shared access to the ledger, without copying it.
    ///
    /// Mutations wait until `f` returns.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.state.read().ledger)
    }

    /// The configured parameter space.
    #[must_use]
    pub fn search_space(&self) -> Option<SearchSpace> {
        self.state.read().setup.as_ref().map(|s| s.space.clone())
    }

    /// The configured objectives and outcome constraints.
    #[must_use]
    pub fn optimization_config(&self) -> Option<OptimizationConfig> {
        self.state.read().setup.as_ref().map(|s| s.config.clone())
    }
}

impl Default for Experiment {
    fn default() -> Self {
        Self::new()
    }
}
