//! Early-stopping evaluators for running trials.
//!
//! An evaluator looks at one running trial's progression history and at
//! the rest of the ledger, and recommends whether the trial should stop.
//! The recommendation is advisory: the caller decides, and
//! [`Experiment::mark_early_stopped`](crate::Experiment::mark_early_stopped)
//! performs the transition.
//!
//! Every evaluator compares one metric: the configured single objective,
//! or the metric set explicitly through its builder. Scalarized and
//! multi-objective configurations without an explicit metric always yield
//! [`StopDecision::Continue`].
//!
//! Evaluators compare trials only at aligned progressions or extrapolate a
//! trial's own curve. Learning curve shapes across trials is left to custom
//! [`EarlyStopping`] implementations.

mod nop;
mod percentile;
mod projection;
mod threshold;

pub use nop::NoEarlyStopping;
pub use percentile::PercentileEarlyStopping;
pub use projection::ProjectionEarlyStopping;
pub use threshold::ThresholdEarlyStopping;

use core::fmt;

use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::trial::Trial;
use crate::types::Direction;

/// The outcome of an early-stopping evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopDecision {
    /// Keep the trial running.
    Continue,
    /// Stop the trial.
    Stop {
        /// Why the evaluator recommends stopping.
        reason: String,
    },
}

impl StopDecision {
    /// Returns `true` for [`StopDecision::Stop`].
    #[must_use]
    pub fn should_stop(&self) -> bool {
        matches!(self, Self::Stop { .. })
    }

    pub(crate) fn stop(reason: impl Into<String>) -> Self {
        Self::Stop {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StopDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("continue"),
            Self::Stop { reason } => write!(f, "stop: {reason}"),
        }
    }
}

/// Trait for pluggable early-stopping strategies.
///
/// # Implementing a custom evaluator
///
/// ```
/// use asktell::ledger::Ledger;
/// use asktell::objective::OptimizationConfig;
/// use asktell::stopping::{EarlyStopping, StopDecision};
/// use asktell::trial::Trial;
///
/// struct StopAfter(usize);
///
/// impl EarlyStopping for StopAfter {
///     fn evaluate(&self, trial: &Trial, _: &Ledger, _: &OptimizationConfig) -> StopDecision {
///         if trial.observations().len() >= self.0 {
///             StopDecision::Stop { reason: "report budget spent".into() }
///         } else {
///             StopDecision::Continue
///         }
///     }
/// }
/// ```
pub trait EarlyStopping: Send + Sync {
    /// Evaluates one running trial against the ledger.
    fn evaluate(&self, trial: &Trial, ledger: &Ledger, config: &OptimizationConfig)
    -> StopDecision;
}

/// An explicitly configured metric, or the single objective's.
pub(crate) fn resolve_metric<'a>(
    explicit: Option<&'a (String, Direction)>,
    config: &'a OptimizationConfig,
) -> Option<(&'a str, Direction)> {
    match explicit {
        Some((metric, direction)) => Some((metric.as_str(), *direction)),
        None => config
            .primary_metric()
            .map(|o| (o.metric.as_str(), o.direction)),
    }
}

/// Converts a metric value into a loss (smaller is better).
pub(crate) fn loss(value: f64, direction: Direction) -> f64 {
    -direction.sign() * value
}

/// Trials that completed with a finite reading of `metric` and satisfy every
/// outcome constraint, excluding `exclude`.
pub(crate) fn feasible_completed<'a>(
    ledger: &'a Ledger,
    config: &'a OptimizationConfig,
    metric: &'a str,
    exclude: u64,
) -> impl Iterator<Item = (&'a Trial, f64)> {
    ledger.completed().filter(move |t| t.index() != exclude).filter_map(move |t| {
        let data = t.final_data()?;
        let value = data.get(metric)?.mean;
        (value.is_finite() && config.satisfies_outcome_constraints(data)).then_some((t, value))
    })
}
