//! Trial records and their status transitions.

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::{Observation, RawData, check_finite};
use crate::error::{Error, Result};
use crate::search_space::Parameterization;
use crate::types::TrialStatus;

/// Where a trial's parameterization came from.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrialSource {
    /// Produced by the named generator.
    Generated {
        /// Name of the generator that proposed the point.
        generator: String,
    },
    /// Supplied by the caller (baseline or preexisting data).
    Attached,
}

/// One proposed-and-evaluated configuration.
///
/// A trial moves through `Candidate -> Running -> Completed | EarlyStopped`
/// and may be marked `Failed` from any non-terminal status. Once terminal,
/// a trial never changes again; every mutator below enforces that.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trial {
    index: u64,
    parameterization: Parameterization,
    status: TrialStatus,
    source: TrialSource,
    observations: Vec<Observation>,
    final_data: Option<RawData>,
    created_at: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(default))]
    finished_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(default))]
    failure_reason: Option<String>,
}

impl Trial {
    pub(crate) fn new(
        index: u64,
        parameterization: Parameterization,
        status: TrialStatus,
        source: TrialSource,
    ) -> Self {
        Self {
            index,
            parameterization,
            status,
            source,
            observations: Vec::new(),
            final_data: None,
            created_at: Utc::now(),
            finished_at: None,
            failure_reason: None,
        }
    }

    /// The trial's index in the ledger.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The evaluated parameterization.
    #[must_use]
    pub fn parameterization(&self) -> &Parameterization {
        &self.parameterization
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> TrialStatus {
        self.status
    }

    /// Where the parameterization came from.
    #[must_use]
    pub fn source(&self) -> &TrialSource {
        &self.source
    }

    /// Intermediate observations in report order (non-decreasing progression).
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Final metrics, present once the trial is completed.
    #[must_use]
    pub fn final_data(&self) -> Option<&RawData> {
        self.final_data.as_ref()
    }

    /// When the trial was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the trial reached a terminal status.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Reason given when the trial was marked failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Highest progression reported so far.
    #[must_use]
    pub fn last_progression(&self) -> Option<f64> {
        self.observations.last().map(|o| o.progression)
    }

    /// `(progression, value)` pairs for one metric, in report order.
    #[must_use]
    pub fn curve(&self, metric: &str) -> Vec<(f64, f64)> {
        self.observations
            .iter()
            .filter_map(|o| o.value(metric).map(|v| (o.progression, v)))
            .collect()
    }

    /// Latest reading of `metric` at or before `progression`.
    #[must_use]
    pub fn value_at(&self, metric: &str, progression: f64) -> Option<f64> {
        self.observations
            .iter()
            .rev()
            .filter(|o| o.progression <= progression)
            .find_map(|o| o.value(metric))
    }

    fn reject(&self, operation: &'static str) -> Error {
        Error::State {
            index: self.index,
            status: self.status,
            operation,
        }
    }

    pub(crate) fn mark_running(&mut self) -> Result<()> {
        if self.status != TrialStatus::Candidate {
            return Err(self.reject("dispatch"));
        }
        self.status = TrialStatus::Running;
        Ok(())
    }

    pub(crate) fn complete(&mut self, data: RawData) -> Result<()> {
        if self.status != TrialStatus::Running {
            return Err(self.reject("complete"));
        }
        check_finite(&data)?;
        self.final_data = Some(data);
        self.finish(TrialStatus::Completed);
        Ok(())
    }

    pub(crate) fn report(&mut self, data: RawData, progression: f64) -> Result<()> {
        if self.status != TrialStatus::Running {
            return Err(self.reject("report progress for"));
        }
        if !progression.is_finite() {
            return Err(Error::config(format!(
                "progression must be finite, got {progression}"
            )));
        }
        check_finite(&data)?;
        if let Some(last) = self.last_progression()
            && progression < last
        {
            return Err(Error::NonMonotonicProgression {
                index: self.index,
                last,
                got: progression,
            });
        }
        self.observations.push(Observation {
            progression,
            data,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub(crate) fn early_stop(&mut self) -> Result<()> {
        if self.status != TrialStatus::Running {
            return Err(self.reject("early-stop"));
        }
        self.finish(TrialStatus::EarlyStopped);
        Ok(())
    }

    pub(crate) fn fail(&mut self, reason: String) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.reject("fail"));
        }
        self.failure_reason = Some(reason);
        self.finish(TrialStatus::Failed);
        Ok(())
    }

    fn finish(&mut self, status: TrialStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Checks the record against what the transition methods guarantee.
    ///
    /// Used on trials that did not come through those methods, i.e.
    /// restored snapshots.
    pub(crate) fn check_invariants(&self) -> Result<()> {
        let fail = |reason: &str| Err(Error::config(format!("trial {}: {reason}", self.index)));

        if (self.status == TrialStatus::Completed) != self.final_data.is_some() {
            return fail("final data must be present exactly when completed");
        }
        if self.status.is_terminal() != self.finished_at.is_some() {
            return fail("finish time must be present exactly when terminal");
        }
        if (self.status == TrialStatus::Failed) != self.failure_reason.is_some() {
            return fail("failure reason must be present exactly when failed");
        }
        if self.status == TrialStatus::Candidate && !self.observations.is_empty() {
            return fail("a candidate cannot have observations");
        }
        let mut last = f64::NEG_INFINITY;
        for observation in &self.observations {
            if !observation.progression.is_finite() || observation.progression < last {
                return fail("progressions must be finite and non-decreasing");
            }
            last = observation.progression;
        }
        self.observations
            .iter()
            .map(|o| &o.data)
            .chain(&self.final_data)
            .try_for_each(check_finite)
            .map_err(|e| Error::config(format!("trial {}: {e}", self.index)))
    }
}
