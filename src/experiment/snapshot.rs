#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::search_space::SearchSpace;
use crate::trial::Trial;

/// Current [`ExperimentSnapshot`] schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The complete state of an experiment: parameter space, optimization
/// configuration and every trial with all of its observations.
///
/// Produced by [`Experiment::snapshot`](super::Experiment::snapshot) and
/// consumed by [`Experiment::restore`](super::Experiment::restore). With the
/// `serde` feature it serializes to a self-describing document.
///
/// Generator and early-stopping state are not included: they are
/// configured on the restoring experiment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExperimentSnapshot {
    /// Schema version for forward compatibility.
    pub version: u32,
    /// Parameters and parameter constraints.
    pub search_space: SearchSpace,
    /// Objectives and outcome constraints.
    pub config: OptimizationConfig,
    /// All trials in index order.
    pub trials: Vec<Trial>,
}

impl ExperimentSnapshot {
    /// Re-validates everything a deserialized snapshot could get wrong.
    pub(crate) fn validate(self) -> Result<(SearchSpace, OptimizationConfig, Ledger)> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::config(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        let space = SearchSpace::new(
            self.search_space.parameters().to_vec(),
            self.search_space.constraints().to_vec(),
        )?;
        self.config.validate()?;
        for trial in &self.trials {
            space
                .check_membership(trial.parameterization())
                .map_err(|e| Error::config(format!("snapshot trial {}: {e}", trial.index())))?;
        }
        let ledger = Ledger::from_trials(self.trials)?;
        Ok((space, self.config, ledger))
    }
}
