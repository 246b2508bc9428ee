//! Metric readings and progression observations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One observed value of a metric, with an optional standard error.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricReading {
    /// The observed (mean) value.
    pub mean: f64,
    /// Standard error of the mean, if known.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sem: Option<f64>,
}

impl MetricReading {
    /// A reading with no uncertainty estimate.
    #[must_use]
    pub fn new(mean: f64) -> Self {
        Self { mean, sem: None }
    }

    /// A reading with a standard error.
    #[must_use]
    pub fn with_sem(mean: f64, sem: f64) -> Self {
        Self {
            mean,
            sem: Some(sem),
        }
    }
}

impl From<f64> for MetricReading {
    fn from(mean: f64) -> Self {
        Self::new(mean)
    }
}

impl From<(f64, f64)> for MetricReading {
    fn from((mean, sem): (f64, f64)) -> Self {
        Self::with_sem(mean, sem)
    }
}

/// Metric name to reading.
pub type RawData = BTreeMap<String, MetricReading>;

/// Rejects readings whose mean or standard error is NaN or infinite.
pub(crate) fn check_finite(data: &RawData) -> Result<()> {
    for (name, reading) in data {
        if !reading.mean.is_finite() {
            return Err(Error::domain(
                name.as_str(),
                format!("metric value must be finite, got {}", reading.mean),
            ));
        }
        if let Some(sem) = reading.sem
            && !(sem.is_finite() && sem >= 0.0)
        {
            return Err(Error::domain(
                name.as_str(),
                format!("standard error must be finite and non-negative, got {sem}"),
            ));
        }
    }
    Ok(())
}

/// Builds [`RawData`] from `(name, value)` pairs.
///
/// ```
/// use asktell::data::{MetricReading, raw_data};
///
/// let data = raw_data([("loss", 0.3), ("time", 12.0)]);
/// assert_eq!(data["loss"], MetricReading::new(0.3));
/// ```
pub fn raw_data<I, K, R>(pairs: I) -> RawData
where
    I: IntoIterator<Item = (K, R)>,
    K: Into<String>,
    R: Into<MetricReading>,
{
    pairs
        .into_iter()
        .map(|(k, r)| (k.into(), r.into()))
        .collect()
}

/// An intermediate report for a running trial.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    /// Progress marker, e.g. epoch or number of samples seen.
    pub progression: f64,
    /// Metric readings at this progression.
    pub data: RawData,
    /// When the observation was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Reading for `metric` at this progression.
    #[must_use]
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.data.get(metric).map(|r| r.mean)
    }
}
