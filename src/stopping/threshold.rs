//! Threshold evaluator: stop trials whose latest value is past a fixed bound.

use super::{EarlyStopping, StopDecision, loss, resolve_metric};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::trial::Trial;
use crate::types::Direction;

/// Stops a trial once its latest reading is worse than a fixed threshold.
///
/// "Worse" follows the metric's direction: above the threshold when
/// minimizing, below it when maximizing.
///
/// # Examples
///
/// ```
/// use asktell::stopping::ThresholdEarlyStopping;
///
/// // Give every trial 5 progression units, then stop if loss > 2.0.
/// let evaluator = ThresholdEarlyStopping::new(2.0).min_progression(5.0);
/// ```
#[derive(Clone, Debug)]
pub struct ThresholdEarlyStopping {
    threshold: f64,
    min_progression: f64,
    metric: Option<(String, Direction)>,
}

impl ThresholdEarlyStopping {
    /// Creates an evaluator with the given threshold and no warm-up.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            min_progression: 0.0,
            metric: None,
        }
    }

    /// No stop is recommended before this progression.
    #[must_use]
    pub fn min_progression(mut self, progression: f64) -> Self {
        self.min_progression = progression;
        self
    }

    /// Evaluates `metric` instead of the configured single objective.
    #[must_use]
    pub fn metric(mut self, metric: impl Into<String>, direction: Direction) -> Self {
        self.metric = Some((metric.into(), direction));
        self
    }
}

impl EarlyStopping for ThresholdEarlyStopping {
    fn evaluate(
        &self,
        trial: &Trial,
        _ledger: &Ledger,
        config: &OptimizationConfig,
    ) -> StopDecision {
        let Some((metric, direction)) = resolve_metric(self.metric.as_ref(), config) else {
            return StopDecision::Continue;
        };
        let Some(&(progression, value)) = trial.curve(metric).last() else {
            return StopDecision::Continue;
        };
        if progression < self.min_progression {
            return StopDecision::Continue;
        }
        if loss(value, direction) > loss(self.threshold, direction) {
            StopDecision::stop(format!(
                "{metric} = {value} at progression {progression} is worse than threshold {}",
                self.threshold
            ))
        } else {
            StopDecision::Continue
        }
    }
}
