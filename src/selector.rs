//! Best-point and Pareto-frontier selection over completed trials.
//!
//! A trial is *eligible* for selection when it is completed, its final data
//! has a reading for every metric the configuration names, and it satisfies
//! every outcome constraint. Metrics not named by the configuration are
//! carried along in the results and otherwise ignored.

use crate::data::RawData;
use crate::error::{Error, Result};
use crate::generator::{Generator, Prediction};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::pareto;
use crate::search_space::{Parameterization, SearchSpace};
use crate::trial::Trial;
use crate::types::TrialStatus;

/// The best trial of a single-objective or scalarized experiment.
#[derive(Clone, Debug, PartialEq)]
pub struct BestPoint {
    /// Index of the selected trial.
    pub trial_index: u64,
    /// Its parameterization.
    pub parameterization: Parameterization,
    /// Its final raw data, including unconfigured metrics.
    pub metrics: RawData,
    /// The observed objective value: the raw metric for a single objective,
    /// the weighted sum of signed metrics for a scalarized one.
    pub value: f64,
    /// Surrogate prediction at the parameterization, if the generator has a model.
    pub prediction: Option<Prediction>,
}

/// One member of the Pareto frontier.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontierPoint {
    /// Index of the trial.
    pub trial_index: u64,
    /// Its parameterization.
    pub parameterization: Parameterization,
    /// Its final raw data.
    pub metrics: RawData,
}

/// Everything a selector may look at.
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
    /// The configured parameter space.
    pub space: &'a SearchSpace,
    /// The configured objectives and outcome constraints.
    pub config: &'a OptimizationConfig,
    /// All trials.
    pub ledger: &'a Ledger,
    /// The experiment's generator, asked for surrogate predictions.
    pub generator: &'a dyn Generator,
}

/// Trait for result selection strategies.
pub trait ResultSelector: Send + Sync {
    /// The single best trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if no trial is eligible.
    fn best(&self, ctx: &SelectionContext<'_>) -> Result<BestPoint>;

    /// The non-dominated eligible trials, ordered by trial index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if no trial is eligible.
    fn frontier(&self, ctx: &SelectionContext<'_>) -> Result<Vec<FrontierPoint>>;
}

/// Eligible trials with their final data and utilities, in index order.
pub(crate) fn eligible<'a>(
    trials: &'a [Trial],
    config: &'a OptimizationConfig,
) -> impl Iterator<Item = (&'a Trial, &'a RawData, Vec<f64>)> {
    trials.iter().filter_map(move |t| {
        if t.status() != TrialStatus::Completed {
            return None;
        }
        let data = t.final_data()?;
        if !config.covers(data) || !config.satisfies_outcome_constraints(data) {
            return None;
        }
        let utilities = config.utilities(data)?;
        utilities
            .iter()
            .all(|u| u.is_finite())
            .then_some((t, data, utilities))
    })
}

/// Selects the eligible trial with the highest utility; ties go to the
/// lowest trial index.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleObjectiveSelector;

impl ResultSelector for SingleObjectiveSelector {
    fn best(&self, ctx: &SelectionContext<'_>) -> Result<BestPoint> {
        if ctx.config.is_multi_objective() {
            return Err(Error::config(
                "best() needs a single or scalarized objective; use pareto_frontier()",
            ));
        }

        let mut best: Option<(&Trial, &RawData, f64)> = None;
        for (trial, data, utilities) in eligible(ctx.ledger.trials(), ctx.config) {
            let utility = utilities[0];
            // Ledger order is index order, so a strict comparison keeps the lowest index.
            if best.is_none_or(|(_, _, b)| utility > b) {
                best = Some((trial, data, utility));
            }
        }
        let (trial, data, utility) = best.ok_or(Error::InsufficientData)?;

        let prediction = ctx.generator.predict(
            ctx.space,
            ctx.config,
            ctx.ledger,
            trial.parameterization(),
        );
        Ok(BestPoint {
            trial_index: trial.index(),
            parameterization: trial.parameterization().clone(),
            metrics: data.clone(),
            value: ctx.config.value_from_utility(utility),
            prediction,
        })
    }

    fn frontier(&self, ctx: &SelectionContext<'_>) -> Result<Vec<FrontierPoint>> {
        let best = self.best(ctx)?;
        Ok(vec![FrontierPoint {
            trial_index: best.trial_index,
            parameterization: best.parameterization,
            metrics: best.metrics,
        }])
    }
}

/// Selects the non-dominated eligible trials of a multi-objective experiment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParetoSelector;

impl ResultSelector for ParetoSelector {
    fn best(&self, _ctx: &SelectionContext<'_>) -> Result<BestPoint> {
        Err(Error::config(
            "a multi-objective experiment has no single best point; use pareto_frontier()",
        ))
    }

    fn frontier(&self, ctx: &SelectionContext<'_>) -> Result<Vec<FrontierPoint>> {
        let candidates: Vec<_> = eligible(ctx.ledger.trials(), ctx.config).collect();
        if candidates.is_empty() {
            return Err(Error::InsufficientData);
        }
        let utilities: Vec<Vec<f64>> = candidates.iter().map(|(_, _, u)| u.clone()).collect();

        Ok(pareto::pareto_front_indices(&utilities)
            .into_iter()
            .map(|i| {
                let (trial, data, _) = &candidates[i];
                FrontierPoint {
                    trial_index: trial.index(),
                    parameterization: trial.parameterization().clone(),
                    metrics: (*data).clone(),
                }
            })
            .collect())
    }
}

/// The selector matching a configuration.
pub(crate) fn for_config(config: &OptimizationConfig) -> &'static dyn ResultSelector {
    if config.is_multi_objective() {
        &ParetoSelector
    } else {
        &SingleObjectiveSelector
    }
}
