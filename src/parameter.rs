//! Parameter definitions and concrete parameter values.
//!
//! A [`Parameter`] pairs a unique name with a [`Domain`]: a continuous
//! range, an integer range, a set of categorical choices, or a fixed value.
//! Definitions are immutable once an experiment is configured.
//!
//! # Example
//!
//! ```
//! use asktell::parameter::{ParamValue, Parameter};
//!
//! let lr = Parameter::float("lr", 1e-5, 1e-1).log_scale();
//! let layers = Parameter::int("layers", 1, 8);
//! let optimizer = Parameter::choice("optimizer", ["sgd", "adam"]);
//!
//! assert!(lr.validate().is_ok());
//! assert!(layers.check(&ParamValue::Int(4)).is_ok());
//! assert!(optimizer.check(&ParamValue::from("rmsprop")).is_err());
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A concrete value assigned to one parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamValue {
    /// A floating-point value.
    Float(f64),
    /// An integer value.
    Int(i64),
    /// A boolean value (only valid for choice parameters).
    Bool(bool),
    /// A string value (only valid for choice parameters).
    Str(String),
}

impl ParamValue {
    /// Returns the numeric value for `Float` and `Int` values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    /// Returns the integer value for `Int` values.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string slice for `Str` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Str(_) => "str",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// The set of values a parameter may take.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Domain {
    /// Continuous range `[low, high]`.
    Float {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
        /// Whether the range is searched in log space.
        log_scale: bool,
    },
    /// Integer range `[low, high]`.
    Int {
        /// Lower bound (inclusive).
        low: i64,
        /// Upper bound (inclusive).
        high: i64,
        /// Whether the range is searched in log space.
        log_scale: bool,
    },
    /// A finite set of values.
    Choice {
        /// The allowed values.
        values: Vec<ParamValue>,
        /// Whether the values have a meaningful order.
        ordered: bool,
    },
    /// A single pinned value; not a search dimension.
    Fixed(ParamValue),
}

/// A named, typed tunable dimension.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameter {
    name: String,
    domain: Domain,
}

impl Parameter {
    /// Creates a continuous parameter over `[low, high]`.
    #[must_use]
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Float {
                low,
                high,
                log_scale: false,
            },
        }
    }

    /// Creates an integer parameter over `[low, high]`.
    #[must_use]
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Int {
                low,
                high,
                log_scale: false,
            },
        }
    }

    /// Creates an unordered choice parameter.
    #[must_use]
    pub fn choice<I, T>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ParamValue>,
    {
        Self {
            name: name.into(),
            domain: Domain::Choice {
                values: values.into_iter().map(Into::into).collect(),
                ordered: false,
            },
        }
    }

    /// Creates a parameter pinned to `value`.
    #[must_use]
    pub fn fixed(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Fixed(value.into()),
        }
    }

    /// Searches a numeric range in log space. No effect on other domains.
    #[must_use]
    pub fn log_scale(mut self) -> Self {
        match &mut self.domain {
            Domain::Float { log_scale, .. } | Domain::Int { log_scale, .. } => *log_scale = true,
            Domain::Choice { .. } | Domain::Fixed(_) => {}
        }
        self
    }

    /// Marks choice values as ordered. No effect on other domains.
    #[must_use]
    pub fn ordered(mut self) -> Self {
        if let Domain::Choice { ordered, .. } = &mut self.domain {
            *ordered = true;
        }
        self
    }

    /// The parameter's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter's domain.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Returns `true` for float and int ranges.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.domain, Domain::Float { .. } | Domain::Int { .. })
    }

    /// Returns `true` unless the parameter is fixed.
    #[must_use]
    pub fn is_tunable(&self) -> bool {
        !matches!(self.domain, Domain::Fixed(_))
    }

    /// Checks that the domain is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the name is empty, bounds are
    /// not finite or not strictly increasing, a log-scaled range is not
    /// positive, or a choice set is empty, mixes value kinds, or repeats a value.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("parameter names must not be empty"));
        }
        match &self.domain {
            Domain::Float {
                low,
                high,
                log_scale,
            } => {
                if !low.is_finite() || !high.is_finite() || !(high - low).is_finite() {
                    return Err(Error::config(format!(
                        "parameter '{}': bounds and their width must be finite",
                        self.name
                    )));
                }
                if low >= high {
                    return Err(Error::config(format!(
                        "parameter '{}': low ({low}) must be less than high ({high})",
                        self.name
                    )));
                }
                if *log_scale && *low <= 0.0 {
                    return Err(Error::config(format!(
                        "parameter '{}': log scale requires a positive lower bound",
                        self.name
                    )));
                }
            }
            Domain::Int {
                low,
                high,
                log_scale,
            } => {
                if low >= high {
                    return Err(Error::config(format!(
                        "parameter '{}': low ({low}) must be less than high ({high})",
                        self.name
                    )));
                }
                if *log_scale && *low < 1 {
                    return Err(Error::config(format!(
                        "parameter '{}': log scale requires a lower bound of at least 1",
                        self.name
                    )));
                }
            }
            Domain::Choice { values, .. } => {
                let Some(first) = values.first() else {
                    return Err(Error::config(format!(
                        "parameter '{}': choice values cannot be empty",
                        self.name
                    )));
                };
                if values.iter().any(|v| v.kind() != first.kind()) {
                    return Err(Error::config(format!(
                        "parameter '{}': choice values must share one type",
                        self.name
                    )));
                }
                for (i, v) in values.iter().enumerate() {
                    if values[..i].contains(v) {
                        return Err(Error::config(format!(
                            "parameter '{}': duplicate choice value {v}",
                            self.name
                        )));
                    }
                }
            }
            Domain::Fixed(ParamValue::Float(v)) if !v.is_finite() => {
                return Err(Error::config(format!(
                    "parameter '{}': fixed value must be finite",
                    self.name
                )));
            }
            Domain::Fixed(_) => {}
        }
        Ok(())
    }

    /// Checks that `value` belongs to this parameter's domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if the value has the wrong type or lies
    /// outside the domain.
    pub fn check(&self, value: &ParamValue) -> Result<()> {
        let ok = match (&self.domain, value) {
            (Domain::Float { low, high, .. }, ParamValue::Float(v)) => {
                v.is_finite() && (*low..=*high).contains(v)
            }
            (Domain::Int { low, high, .. }, ParamValue::Int(v)) => (*low..=*high).contains(v),
            (Domain::Choice { values, .. }, v) => values.contains(v),
            (Domain::Fixed(fixed), v) => fixed == v,
            (Domain::Float { .. } | Domain::Int { .. }, _) => {
                return Err(Error::domain(
                    &self.name,
                    format!("expected a {} value, got {}", self.kind_name(), value.kind()),
                ));
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::domain(
                &self.name,
                format!("{value} is not in {}", self.describe_domain()),
            ))
        }
    }

    fn kind_name(&self) -> &'static str {
        match self.domain {
            Domain::Float { .. } => "float",
            Domain::Int { .. } => "int",
            Domain::Choice { .. } => "choice",
            Domain::Fixed(_) => "fixed",
        }
    }

    /// Human-readable description of the domain, e.g. `range=[0, 1]`.
    #[must_use]
    pub fn describe_domain(&self) -> String {
        match &self.domain {
            Domain::Float {
                low,
                high,
                log_scale,
            } => format!("range=[{low}, {high}]{}", if *log_scale { " log" } else { "" }),
            Domain::Int {
                low,
                high,
                log_scale,
            } => format!("range=[{low}, {high}]{}", if *log_scale { " log" } else { "" }),
            Domain::Choice { values, ordered } => {
                let list: Vec<String> = values.iter().map(ToString::to_string).collect();
                format!(
                    "values=[{}]{}",
                    list.join(", "),
                    if *ordered { " ordered" } else { "" }
                )
            }
            Domain::Fixed(v) => format!("value={v}"),
        }
    }

    /// Returns `true` if the dimension can be modeled as continuous
    /// (numeric ranges and ordered choices).
    pub(crate) fn is_continuous_dimension(&self) -> bool {
        match &self.domain {
            Domain::Float { .. } | Domain::Int { .. } => true,
            Domain::Choice { ordered, .. } => *ordered,
            Domain::Fixed(_) => false,
        }
    }

    /// Maps a value into `[0, 1]`. Fixed parameters have no unit coordinate.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn to_unit(&self, value: &ParamValue) -> Option<f64> {
        match (&self.domain, value) {
            (
                Domain::Float {
                    low,
                    high,
                    log_scale,
                },
                ParamValue::Float(v),
            ) => Some(if *log_scale {
                (v.ln() - low.ln()) / (high.ln() - low.ln())
            } else {
                (v - low) / (high - low)
            }),
            (
                Domain::Int {
                    low,
                    high,
                    log_scale,
                },
                ParamValue::Int(v),
            ) => Some(if *log_scale {
                let (lo, hi) = ((*low as f64).ln(), (*high as f64).ln());
                ((*v as f64).ln() - lo) / (hi - lo)
            } else {
                let offset = i128::from(*v) - i128::from(*low);
                (offset as f64 + 0.5) / int_cells(*low, *high)
            }),
            (Domain::Choice { values, .. }, v) => values
                .iter()
                .position(|c| c == v)
                .map(|i| (i as f64 + 0.5) / values.len() as f64),
            _ => None,
        }
    }

    /// Maps a unit coordinate back into the domain. Out-of-range inputs are clamped.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub(crate) fn from_unit(&self, u: f64) -> ParamValue {
        let u = u.clamp(0.0, 1.0);
        match &self.domain {
            Domain::Float {
                low,
                high,
                log_scale,
            } => {
                let v = if *log_scale {
                    (low.ln() + u * (high.ln() - low.ln())).exp()
                } else {
                    low + u * (high - low)
                };
                ParamValue::Float(v.clamp(*low, *high))
            }
            Domain::Int {
                low,
                high,
                log_scale,
            } => {
                let v = if *log_scale {
                    let (lo, hi) = ((*low as f64).ln(), (*high as f64).ln());
                    (lo + u * (hi - lo)).exp().round() as i64
                } else {
                    let offset = (u * int_cells(*low, *high)).floor() as i128;
                    i64::try_from(i128::from(*low) + offset).unwrap_or(*high)
                };
                ParamValue::Int(v.clamp(*low, *high))
            }
            Domain::Choice { values, .. } => {
                let index = ((u * values.len() as f64).floor() as usize).min(values.len() - 1);
                values[index].clone()
            }
            Domain::Fixed(v) => v.clone(),
        }
    }
}

/// Number of integers in `[low, high]`, computed without overflow.
#[allow(clippy::cast_precision_loss)]
fn int_cells(low: i64, high: i64) -> f64 {
    (i128::from(high) - i128::from(low) + 1) as f64
}
