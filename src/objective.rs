//! Objectives, outcome constraints and the optimization configuration.
//!
//! An [`OptimizationConfig`] says which metrics matter and how: a single
//! objective, a weighted (scalarized) combination of metrics, or several
//! objectives traded off on a Pareto frontier. Outcome constraints are hard
//! thresholds a trial must satisfy to be selectable.
//!
//! Configurations can be written as strings, in the same shorthand the
//! client API accepts:
//!
//! ```
//! use asktell::objective::OptimizationConfig;
//!
//! // minimize loss, subject to weight <= 10
//! let single = OptimizationConfig::parse("-loss", &["weight <= 10"]).unwrap();
//! assert!(!single.is_multi_objective());
//!
//! // maximize score and minimize time
//! let pareto = OptimizationConfig::parse("score, -time", &[]).unwrap();
//! assert!(pareto.is_multi_objective());
//!
//! // maximize 2 * accuracy - latency
//! let weighted = OptimizationConfig::parse("2*accuracy + -latency", &[]).unwrap();
//! assert_eq!(weighted.objectives().len(), 2);
//! ```

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::RawData;
use crate::error::{Error, Result};
use crate::types::Direction;

/// One metric to optimize.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Objective {
    /// The metric name.
    pub metric: String,
    /// Whether smaller or larger values are better.
    pub direction: Direction,
    /// Linear weight, used only by scalarized configurations.
    pub weight: f64,
}

impl Objective {
    /// An objective that minimizes `metric`.
    #[must_use]
    pub fn minimize(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            direction: Direction::Minimize,
            weight: 1.0,
        }
    }

    /// An objective that maximizes `metric`.
    #[must_use]
    pub fn maximize(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            direction: Direction::Maximize,
            weight: 1.0,
        }
    }

    /// Sets the linear weight.
    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Signed value: larger is always better.
    fn utility(&self, data: &RawData) -> Option<f64> {
        data.get(&self.metric)
            .map(|r| r.mean * self.direction.sign())
    }
}

impl FromStr for Objective {
    type Err = Error;

    /// Parses `"metric"`, `"-metric"` or `"w*metric"` / `"-w*metric"`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (negated, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest.trim()),
            None => (false, s),
        };
        let (weight, metric) = match rest.split_once('*') {
            Some((w, m)) => {
                let w = w
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| Error::config(format!("invalid weight in objective '{s}'")))?;
                (w, m.trim())
            }
            None => (1.0, rest),
        };
        if metric.is_empty() || metric.contains(char::is_whitespace) {
            return Err(Error::config(format!("cannot parse objective '{s}'")));
        }
        let objective = if negated {
            Self::minimize(metric)
        } else {
            Self::maximize(metric)
        };
        Ok(objective.weight(weight))
    }
}

/// Comparison used by an [`OutcomeConstraint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ComparisonOp {
    /// The metric must be at most the threshold.
    Le,
    /// The metric must be at least the threshold.
    Ge,
}

/// A hard threshold on a metric.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutcomeConstraint {
    /// The constrained metric.
    pub metric: String,
    /// How the metric is compared.
    pub op: ComparisonOp,
    /// The threshold value.
    pub threshold: f64,
}

impl OutcomeConstraint {
    /// `metric <= threshold`.
    #[must_use]
    pub fn at_most(metric: impl Into<String>, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            op: ComparisonOp::Le,
            threshold,
        }
    }

    /// `metric >= threshold`.
    #[must_use]
    pub fn at_least(metric: impl Into<String>, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            op: ComparisonOp::Ge,
            threshold,
        }
    }

    /// Returns `Some(true)` if satisfied, `None` if the metric is missing.
    #[must_use]
    pub fn is_satisfied(&self, data: &RawData) -> Option<bool> {
        let value = data.get(&self.metric)?.mean;
        Some(match self.op {
            ComparisonOp::Le => value <= self.threshold,
            ComparisonOp::Ge => value >= self.threshold,
        })
    }
}

impl fmt::Display for OutcomeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            ComparisonOp::Le => "<=",
            ComparisonOp::Ge => ">=",
        };
        write!(f, "{} {op} {}", self.metric, self.threshold)
    }
}

impl FromStr for OutcomeConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (metric, threshold, op) = if let Some((m, t)) = s.split_once("<=") {
            (m, t, ComparisonOp::Le)
        } else if let Some((m, t)) = s.split_once(">=") {
            (m, t, ComparisonOp::Ge)
        } else {
            return Err(Error::config(format!(
                "outcome constraint '{s}' must contain <= or >="
            )));
        };
        let metric = metric.trim();
        let threshold = threshold
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::config(format!("invalid threshold in outcome constraint '{s}'")))?;
        if metric.is_empty() {
            return Err(Error::config(format!(
                "outcome constraint '{s}' has no metric"
            )));
        }
        Ok(Self {
            metric: metric.to_owned(),
            op,
            threshold,
        })
    }
}

/// What is being optimized.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObjectiveSpec {
    /// One metric.
    Single(Objective),
    /// A weighted sum of signed metrics, maximized.
    Scalarized(Vec<Objective>),
    /// Several metrics traded off on a Pareto frontier.
    MultiObjective(Vec<Objective>),
}

/// Objectives plus outcome constraints.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationConfig {
    objective: ObjectiveSpec,
    outcome_constraints: Vec<OutcomeConstraint>,
}

impl OptimizationConfig {
    /// A single-objective configuration.
    #[must_use]
    pub fn single(objective: Objective) -> Self {
        Self {
            objective: ObjectiveSpec::Single(objective),
            outcome_constraints: Vec::new(),
        }
    }

    /// A scalarized configuration maximizing `sum(weight * sign * value)`.
    #[must_use]
    pub fn scalarized(objectives: Vec<Objective>) -> Self {
        Self {
            objective: ObjectiveSpec::Scalarized(objectives),
            outcome_constraints: Vec::new(),
        }
    }

    /// A multi-objective configuration.
    #[must_use]
    pub fn multi_objective(objectives: Vec<Objective>) -> Self {
        Self {
            objective: ObjectiveSpec::MultiObjective(objectives),
            outcome_constraints: Vec::new(),
        }
    }

    /// Adds an outcome constraint.
    #[must_use]
    pub fn with_outcome_constraint(mut self, constraint: OutcomeConstraint) -> Self {
        self.outcome_constraints.push(constraint);
        self
    }

    /// Parses an objective string and outcome-constraint strings.
    ///
    /// Objectives separated by `,` form a multi-objective configuration;
    /// terms joined by `+` form a scalarized one. A leading `-` means
    /// minimize.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a string cannot be parsed or the
    /// result fails [`validate`](Self::validate).
    pub fn parse(objective: &str, outcome_constraints: &[&str]) -> Result<Self> {
        let spec = if objective.contains(',') {
            ObjectiveSpec::MultiObjective(
                objective
                    .split(',')
                    .map(str::parse)
                    .collect::<Result<Vec<_>>>()?,
            )
        } else if objective.contains('+') {
            ObjectiveSpec::Scalarized(
                objective
                    .split('+')
                    .map(str::parse)
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            ObjectiveSpec::Single(objective.parse()?)
        };
        let config = Self {
            objective: spec,
            outcome_constraints: outcome_constraints
                .iter()
                .map(|s| s.parse())
                .collect::<Result<Vec<_>>>()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for empty metric names, empty or
    /// single-entry multi-objective lists, repeated objective metrics,
    /// non-finite or zero weights, and non-finite thresholds.
    pub fn validate(&self) -> Result<()> {
        let objectives = self.objectives();
        match &self.objective {
            ObjectiveSpec::Single(_) => {}
            ObjectiveSpec::Scalarized(list) if list.is_empty() => {
                return Err(Error::config("scalarized objective needs at least one metric"));
            }
            ObjectiveSpec::MultiObjective(list) if list.len() < 2 => {
                return Err(Error::config(
                    "multi-objective configuration needs at least two objectives",
                ));
            }
            ObjectiveSpec::Scalarized(_) | ObjectiveSpec::MultiObjective(_) => {}
        }
        let mut seen = BTreeSet::new();
        for o in objectives {
            if o.metric.is_empty() {
                return Err(Error::config("objective metric names must not be empty"));
            }
            if !seen.insert(o.metric.as_str()) {
                return Err(Error::config(format!(
                    "metric '{}' appears in more than one objective",
                    o.metric
                )));
            }
            if !o.weight.is_finite() || o.weight == 0.0 {
                return Err(Error::config(format!(
                    "objective '{}' has invalid weight {}",
                    o.metric, o.weight
                )));
            }
        }
        for c in &self.outcome_constraints {
            if c.metric.is_empty() || !c.threshold.is_finite() {
                return Err(Error::config(format!("malformed outcome constraint '{c}'")));
            }
        }
        Ok(())
    }

    /// The objective specification.
    #[must_use]
    pub fn objective(&self) -> &ObjectiveSpec {
        &self.objective
    }

    /// All objectives, regardless of how they are combined.
    #[must_use]
    pub fn objectives(&self) -> &[Objective] {
        match &self.objective {
            ObjectiveSpec::Single(o) => core::slice::from_ref(o),
            ObjectiveSpec::Scalarized(list) | ObjectiveSpec::MultiObjective(list) => list,
        }
    }

    /// Outcome constraints.
    #[must_use]
    pub fn outcome_constraints(&self) -> &[OutcomeConstraint] {
        &self.outcome_constraints
    }

    /// Returns `true` for Pareto (multi-objective) configurations.
    #[must_use]
    pub fn is_multi_objective(&self) -> bool {
        matches!(self.objective, ObjectiveSpec::MultiObjective(_))
    }

    /// The single objective's metric, if there is exactly one objective metric.
    #[must_use]
    pub fn primary_metric(&self) -> Option<&Objective> {
        match &self.objective {
            ObjectiveSpec::Single(o) => Some(o),
            ObjectiveSpec::Scalarized(_) | ObjectiveSpec::MultiObjective(_) => None,
        }
    }

    /// Every metric named by objectives or outcome constraints.
    #[must_use]
    pub fn metric_names(&self) -> BTreeSet<&str> {
        self.objectives()
            .iter()
            .map(|o| o.metric.as_str())
            .chain(self.outcome_constraints.iter().map(|c| c.metric.as_str()))
            .collect()
    }

    /// Returns `true` if `data` has a reading for every configured metric.
    #[must_use]
    pub fn covers(&self, data: &RawData) -> bool {
        self.metric_names().iter().all(|m| data.contains_key(*m))
    }

    /// Returns `true` if every outcome constraint holds. Missing metrics fail.
    #[must_use]
    pub fn satisfies_outcome_constraints(&self, data: &RawData) -> bool {
        self.outcome_constraints
            .iter()
            .all(|c| c.is_satisfied(data).unwrap_or(false))
    }

    /// Larger-is-better utilities, one per Pareto objective.
    ///
    /// Single and scalarized configurations yield exactly one value
    /// (the scalarized one is `sum(weight * sign * value)`).
    /// Returns `None` if an objective metric is missing.
    #[must_use]
    pub fn utilities(&self, data: &RawData) -> Option<Vec<f64>> {
        match &self.objective {
            ObjectiveSpec::Single(o) => Some(vec![o.utility(data)?]),
            ObjectiveSpec::Scalarized(list) => {
                let mut total = 0.0;
                for o in list {
                    total += o.weight * o.utility(data)?;
                }
                Some(vec![total])
            }
            ObjectiveSpec::MultiObjective(list) => list.iter().map(|o| o.utility(data)).collect(),
        }
    }

    /// The reported objective value of `data`: the raw metric for a single
    /// objective, the scalarized utility for a scalarized objective, and
    /// `None` for multi-objective configurations.
    #[must_use]
    pub fn objective_value(&self, data: &RawData) -> Option<f64> {
        match &self.objective {
            ObjectiveSpec::Single(o) => data.get(&o.metric).map(|r| r.mean),
            ObjectiveSpec::Scalarized(_) => self.utilities(data).map(|u| u[0]),
            ObjectiveSpec::MultiObjective(_) => None,
        }
    }

    /// Converts a utility back into the units of [`objective_value`](Self::objective_value).
    #[must_use]
    pub(crate) fn value_from_utility(&self, utility: f64) -> f64 {
        match &self.objective {
            ObjectiveSpec::Single(o) => utility * o.direction.sign(),
            ObjectiveSpec::Scalarized(_) | ObjectiveSpec::MultiObjective(_) => utility,
        }
    }
}
