//! Percentile evaluator: stop trials outside the top N% at their progression.
//!
//! The trial's latest reading is compared against the given percentile of
//! completed trials' readings at the same progression. For each completed
//! trial the comparable reading is its latest observation at or before
//! that progression.
//!
//! - Lower percentiles are more aggressive: 25 keeps only the best quarter.
//! - Higher percentiles are more lenient: 75 keeps the top three quarters.
//! - Percentile 50 is median stopping.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `percentile` | *(required)* | Keep trials in the top N%, range `(0, 100)` |
//! | `min_progression` | 0 | No stop before this progression |
//! | `min_curves` | 3 | Completed trials with a comparable reading required |
//! | `metric` | single objective | Metric and direction to compare |

use super::{EarlyStopping, StopDecision, loss, resolve_metric};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::trial::Trial;
use crate::types::Direction;

/// Stop trials that are not in the top `percentile`% of completed trials at
/// the same progression.
///
/// # Examples
///
/// ```
/// use asktell::stopping::PercentileEarlyStopping;
///
/// let evaluator = PercentileEarlyStopping::new(25.0)
///     .min_progression(5.0)
///     .min_curves(4);
/// ```
#[derive(Clone, Debug)]
pub struct PercentileEarlyStopping {
    percentile: f64,
    min_progression: f64,
    min_curves: usize,
    metric: Option<(String, Direction)>,
}

impl PercentileEarlyStopping {
    /// Creates an evaluator keeping the top `percentile`% of trials.
    ///
    /// # Panics
    ///
    /// Panics if `percentile` is not in `(0.0, 100.0)`.
    #[must_use]
    pub fn new(percentile: f64) -> Self {
        assert!(
            percentile > 0.0 && percentile < 100.0,
            "percentile must be in (0.0, 100.0), got {percentile}"
        );
        Self {
            percentile,
            min_progression: 0.0,
            min_curves: 3,
            metric: None,
        }
    }

    /// No stop is recommended before this progression.
    #[must_use]
    pub fn min_progression(mut self, progression: f64) -> Self {
        self.min_progression = progression;
        self
    }

    /// Minimum number of completed trials with a comparable reading.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    #[must_use]
    pub fn min_curves(mut self, n: usize) -> Self {
        assert!(n >= 1, "min_curves must be >= 1, got {n}");
        self.min_curves = n;
        self
    }

    /// Evaluates `metric` instead of the configured single objective.
    #[must_use]
    pub fn metric(mut self, metric: impl Into<String>, direction: Direction) -> Self {
        self.metric = Some((metric.into(), direction));
        self
    }
}

impl EarlyStopping for PercentileEarlyStopping {
    fn evaluate(
        &self,
        trial: &Trial,
        ledger: &Ledger,
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

        let mut peers: Vec<f64> = ledger
            .completed()
            .filter(|t| t.index() != trial.index())
            .filter_map(|t| t.value_at(metric, progression))
            .filter(|v| v.is_finite())
            .map(|v| loss(v, direction))
            .collect();
        if peers.len() < self.min_curves {
            return StopDecision::Continue;
        }

        let cutoff = compute_percentile(&mut peers, self.percentile);
        if loss(value, direction) > cutoff {
            StopDecision::stop(format!(
                "{metric} = {value} at progression {progression} is outside the top {}% of {} completed trials",
                self.percentile,
                peers.len()
            ))
        } else {
            StopDecision::Continue
        }
    }
}

/// Compute the given percentile of a non-empty slice. Sorts the slice in place.
///
/// Uses linear interpolation between the two nearest ranks.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn compute_percentile(values: &mut [f64], percentile: f64) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let len = values.len();
    if len == 1 {
        return values[0];
    }
    let rank = percentile / 100.0 * (len - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        values[lower]
    } else {
        let frac = rank - lower as f64;
        values[lower] * (1.0 - frac) + values[upper] * frac
    }
}
