//! The configured parameter space and its membership checks.

use core::fmt;
use core::str::FromStr;
use std::collections::{BTreeMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parameter::{ParamValue, Parameter};

/// A concrete assignment of values to parameters, keyed by parameter name.
pub type Parameterization = BTreeMap<String, ParamValue>;

/// Slack allowed when checking linear parameter constraints.
const CONSTRAINT_TOLERANCE: f64 = 1e-9;

/// A constraint over numeric parameters, checked on every parameterization.
///
/// Constraints can be parsed from strings:
///
/// ```
/// use asktell::search_space::ParameterConstraint;
///
/// let sum: ParameterConstraint = "x1 + 2*x2 <= 1.5".parse().unwrap();
/// let order: ParameterConstraint = "low <= high".parse().unwrap();
/// assert!(matches!(order, ParameterConstraint::Order { .. }));
/// assert!(matches!(sum, ParameterConstraint::Linear { .. }));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParameterConstraint {
    /// `sum(weight * value) <= bound`.
    Linear {
        /// Weight per parameter name.
        weights: BTreeMap<String, f64>,
        /// Upper bound on the weighted sum.
        bound: f64,
    },
    /// `value(lower) <= value(upper)`.
    Order {
        /// The parameter that must not exceed `upper`.
        lower: String,
        /// The parameter that must not fall below `lower`.
        upper: String,
    },
}

impl ParameterConstraint {
    /// Creates a linear constraint `sum(weight * value) <= bound`.
    #[must_use]
    pub fn linear<I, S>(weights: I, bound: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::Linear {
            weights: weights.into_iter().map(|(k, w)| (k.into(), w)).collect(),
            bound,
        }
    }

    /// Creates an order constraint `lower <= upper`.
    #[must_use]
    pub fn order(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self::Order {
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    /// Names of all parameters the constraint refers to.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        let names: Vec<&str> = match self {
            Self::Linear { weights, .. } => weights.keys().map(String::as_str).collect(),
            Self::Order { lower, upper } => vec![lower.as_str(), upper.as_str()],
        };
        names.into_iter()
    }

    /// Evaluates the constraint. Missing or non-numeric values count as violations.
    #[must_use]
    pub fn is_satisfied(&self, parameterization: &Parameterization) -> bool {
        let value = |name: &str| parameterization.get(name).and_then(ParamValue::as_f64);
        match self {
            Self::Linear { weights, bound } => {
                let mut total = 0.0;
                for (name, w) in weights {
                    let Some(v) = value(name) else {
                        return false;
                    };
                    total += w * v;
                }
                total <= bound + CONSTRAINT_TOLERANCE
            }
            Self::Order { lower, upper } => match (value(lower), value(upper)) {
                (Some(l), Some(u)) => l <= u,
                _ => false,
            },
        }
    }
}

impl fmt::Display for ParameterConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear { weights, bound } => {
                let terms: Vec<String> = weights
                    .iter()
                    .map(|(name, w)| {
                        if (*w - 1.0).abs() < f64::EPSILON {
                            name.clone()
                        } else {
                            format!("{w}*{name}")
                        }
                    })
                    .collect();
                write!(f, "{} <= {bound}", terms.join(" + "))
            }
            Self::Order { lower, upper } => write!(f, "{lower} <= {upper}"),
        }
    }
}

impl FromStr for ParameterConstraint {
    type Err = Error;

    /// Parses `"a <= b"`, `"a >= b"` (order) or `"2*x + y <= 3"` (linear;
    /// `>=` negates the weights and bound).
    fn from_str(s: &str) -> Result<Self> {
        let (lhs, rhs, flip) = if let Some((l, r)) = s.split_once("<=") {
            (l.trim(), r.trim(), false)
        } else if let Some((l, r)) = s.split_once(">=") {
            (l.trim(), r.trim(), true)
        } else {
            return Err(Error::config(format!(
                "parameter constraint '{s}' must contain <= or >="
            )));
        };

        if let Ok(bound) = rhs.parse::<f64>() {
            let mut weights = BTreeMap::new();
            for term in lhs.split('+').map(str::trim) {
                let (w, name) = match term.split_once('*') {
                    Some((w, name)) => {
                        let w = w.trim().parse::<f64>().map_err(|_| {
                            Error::config(format!("invalid coefficient in constraint '{s}'"))
                        })?;
                        (w, name.trim())
                    }
                    None => (1.0, term),
                };
                if name.is_empty() {
                    return Err(Error::config(format!("empty term in constraint '{s}'")));
                }
                *weights.entry(name.to_owned()).or_insert(0.0) += if flip { -w } else { w };
            }
            let bound = if flip { -bound } else { bound };
            return Ok(Self::Linear { weights, bound });
        }

        if lhs.is_empty() || rhs.is_empty() || lhs.contains(' ') || rhs.contains(' ') {
            return Err(Error::config(format!(
                "cannot parse parameter constraint '{s}'"
            )));
        }
        Ok(if flip {
            Self::order(rhs, lhs)
        } else {
            Self::order(lhs, rhs)
        })
    }
}

/// The validated set of parameters and parameter constraints of an experiment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
    constraints: Vec<ParameterConstraint>,
}

impl SearchSpace {
    /// Validates and builds a search space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if there are no parameters, a name
    /// is repeated, a domain is malformed, or a constraint references an
    /// unknown or non-numeric parameter.
    pub fn new(
        parameters: Vec<Parameter>,
        constraints: Vec<ParameterConstraint>,
    ) -> Result<Self> {
        if parameters.is_empty() {
            return Err(Error::config("at least one parameter is required"));
        }
        let mut seen = HashSet::new();
        for p in &parameters {
            p.validate()?;
            if !seen.insert(p.name()) {
                return Err(Error::config(format!(
                    "parameter names must be unique: '{}' is repeated",
                    p.name()
                )));
            }
        }

        let space = Self {
            parameters,
            constraints: Vec::new(),
        };
        for c in &constraints {
            if let ParameterConstraint::Linear { weights, bound } = c
                && (weights.is_empty() || !bound.is_finite())
            {
                return Err(Error::config(format!("malformed parameter constraint '{c}'")));
            }
            for name in c.parameter_names() {
                match space.get(name) {
                    None => {
                        return Err(Error::config(format!(
                            "parameter constraint '{c}' references unknown parameter '{name}'"
                        )));
                    }
                    Some(p) if !p.is_numeric() => {
                        return Err(Error::config(format!(
                            "parameter constraint '{c}' references non-numeric parameter '{name}'"
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(Self {
            constraints,
            ..space
        })
    }

    /// All parameters in definition order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// All parameter constraints.
    #[must_use]
    pub fn constraints(&self) -> &[ParameterConstraint] {
        &self.constraints
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Non-fixed parameters in definition order.
    pub fn tunable(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_tunable())
    }

    /// Number of search dimensions (non-fixed parameters).
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.tunable().count()
    }

    /// Checks that `parameterization` names exactly the configured
    /// parameters, each value lies in its domain, and all parameter
    /// constraints hold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] describing the first violation.
    pub fn check_membership(&self, parameterization: &Parameterization) -> Result<()> {
        for name in parameterization.keys() {
            if self.get(name).is_none() {
                return Err(Error::domain(name, "unknown parameter"));
            }
        }
        for p in &self.parameters {
            let Some(value) = parameterization.get(p.name()) else {
                return Err(Error::domain(p.name(), "missing value"));
            };
            p.check(value)?;
        }
        for c in &self.constraints {
            if !c.is_satisfied(parameterization) {
                let names: Vec<&str> = c.parameter_names().collect();
                return Err(Error::domain(
                    names.join(","),
                    format!("parameter constraint '{c}' is violated"),
                ));
            }
        }
        Ok(())
    }

    /// Returns `true` if every parameter constraint holds.
    #[must_use]
    pub fn satisfies_constraints(&self, parameterization: &Parameterization) -> bool {
        self.constraints
            .iter()
            .all(|c| c.is_satisfied(parameterization))
    }

    /// Encodes the tunable coordinates of `parameterization` into the unit cube.
    ///
    /// Returns `None` if a tunable value is missing or outside its domain type.
    #[must_use]
    pub fn encode(&self, parameterization: &Parameterization) -> Option<Vec<f64>> {
        self.tunable()
            .map(|p| parameterization.get(p.name()).and_then(|v| p.to_unit(v)))
            .collect()
    }

    /// Decodes a unit-cube point (one coordinate per tunable parameter) and
    /// adds the fixed parameters.
    #[must_use]
    pub fn decode(&self, point: &[f64]) -> Parameterization {
        let mut coords = point.iter();
        self.parameters
            .iter()
            .map(|p| {
                let value = if p.is_tunable() {
                    p.from_unit(coords.next().copied().unwrap_or(0.5))
                } else {
                    p.from_unit(0.0)
                };
                (p.name().to_owned(), value)
            })
            .collect()
    }
}
