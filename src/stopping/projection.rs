//! Projection evaluator: extrapolate the trial's curve and compare it with
//! the best completed result.
//!
//! The most recent `window` readings of the trial are fitted with an
//! ordinary least-squares line. The line is extended to the furthest
//! progression any completed trial reached, and the standard prediction
//! interval of simple linear regression gives a normal distribution for the
//! trial's final value. The trial is stopped when the probability that the
//! final value beats the best completed, constraint-satisfying trial falls
//! below `min_probability`.
//!
//! If completed trials reported no progressions, the trial's own last
//! progression is the horizon, which reduces the test to "is the fitted
//! current value credibly worse than the best".

use super::{EarlyStopping, StopDecision, feasible_completed, loss, resolve_metric};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::rng_util::norm_cdf;
use crate::trial::Trial;
use crate::types::Direction;

/// Stops trials whose projected final value is very unlikely to beat the
/// best completed trial.
///
/// # Configuration
///
/// | Option | Default | Description |
/// |--------|---------|-------------|
/// | `min_probability` | 0.05 | Stop when P(beat best) drops below this |
/// | `window` | 5 | Most recent readings used for the fit |
/// | `min_points` | 3 | Readings required before any decision |
/// | `min_progression` | 0 | No stop before this progression |
/// | `metric` | single objective | Metric and direction to compare |
///
/// # Examples
///
/// ```
/// use asktell::stopping::ProjectionEarlyStopping;
///
/// let evaluator = ProjectionEarlyStopping::new()
///     .min_probability(0.01)
///     .window(8);
/// ```
#[derive(Clone, Debug)]
pub struct ProjectionEarlyStopping {
    min_probability: f64,
    window: usize,
    min_points: usize,
    min_progression: f64,
    metric: Option<(String, Direction)>,
}

impl ProjectionEarlyStopping {
    /// Creates an evaluator with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_probability: 0.05,
            window: 5,
            min_points: 3,
            min_progression: 0.0,
            metric: None,
        }
    }

    /// Probability of beating the best below which a stop is recommended.
    #[must_use]
    pub fn min_probability(mut self, p: f64) -> Self {
        self.min_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Number of most recent readings used for the fit (at least 3).
    #[must_use]
    pub fn window(mut self, n: usize) -> Self {
        self.window = n.max(3);
        self
    }

    /// Number of readings required before any decision (at least 3).
    #[must_use]
    pub fn min_points(mut self, n: usize) -> Self {
        self.min_points = n.max(3);
        self
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

impl Default for ProjectionEarlyStopping {
    fn default() -> Self {
        Self::new()
    }
}

/// A projected value with its predictive standard deviation.
#[derive(Clone, Copy, Debug)]
struct Projection {
    mean: f64,
    std: f64,
}

/// Least-squares line through `points`, evaluated at `horizon` with the
/// prediction-interval standard deviation. `None` with fewer than three
/// points or no spread in progression.
#[allow(clippy::cast_precision_loss)]
fn project(points: &[(f64, f64)], horizon: f64) -> Option<Projection> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let x_mean = points.iter().map(|p| p.0).sum::<f64>() / nf;
    let y_mean = points.iter().map(|p| p.1).sum::<f64>() / nf;
    let sxx: f64 = points.iter().map(|p| (p.0 - x_mean).powi(2)).sum();
    if sxx <= f64::EPSILON {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - x_mean) * (p.1 - y_mean))
        .sum();
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let ssr: f64 = points
        .iter()
        .map(|p| (p.1 - (intercept + slope * p.0)).powi(2))
        .sum();
    let sigma = (ssr / (nf - 2.0)).sqrt();
    let std = sigma * (1.0 + 1.0 / nf + (horizon - x_mean).powi(2) / sxx).sqrt();

    Some(Projection {
        mean: intercept + slope * horizon,
        std,
    })
}

impl EarlyStopping for ProjectionEarlyStopping {
    fn evaluate(
        &self,
        trial: &Trial,
        ledger: &Ledger,
        config: &OptimizationConfig,
    ) -> StopDecision {
        let Some((metric, direction)) = resolve_metric(self.metric.as_ref(), config) else {
            return StopDecision::Continue;
        };
        let curve = trial.curve(metric);
        let Some(&(progression, _)) = curve.last() else {
            return StopDecision::Continue;
        };
        if curve.len() < self.min_points || progression < self.min_progression {
            return StopDecision::Continue;
        }

        let Some(best) = feasible_completed(ledger, config, metric, trial.index())
            .map(|(_, v)| v)
            .min_by(|a, b| loss(*a, direction).total_cmp(&loss(*b, direction)))
        else {
            return StopDecision::Continue;
        };

        let horizon = ledger
            .completed()
            .filter_map(Trial::last_progression)
            .fold(progression, f64::max);
        let recent = &curve[curve.len().saturating_sub(self.window)..];
        let Some(projection) = project(recent, horizon) else {
            return StopDecision::Continue;
        };

        // Work in loss space: the trial beats the best when its loss is lower.
        let gap = loss(best, direction) - loss(projection.mean, direction);
        let p_beat = if projection.std > 1e-12 {
            norm_cdf(gap / projection.std)
        } else if gap > 0.0 {
            1.0
        } else {
            0.0
        };

        trace_debug!(
            trial = trial.index(),
            projected = projection.mean,
            best,
            p_beat,
            "projection early-stopping evaluation"
        );

        if p_beat < self.min_probability {
            StopDecision::stop(format!(
                "{metric} projected to {:.6} at progression {horizon}; P(beat best {best}) = {p_beat:.4}",
                projection.mean
            ))
        } else {
            StopDecision::Continue
        }
    }
}
