//! The append-only record of every trial in an experiment.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::search_space::Parameterization;
use crate::trial::{Trial, TrialSource};
use crate::types::TrialStatus;

/// Every trial ever created, indexed by creation order.
///
/// Trial `i` lives at position `i`: indices are dense, unique and never
/// reused, and trials are never removed. Status and data may change in
/// place until a trial reaches a terminal status.
///
/// Generators, early-stopping evaluators and selectors receive `&Ledger`
/// for the duration of one call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    trials: Vec<Trial>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from stored trials, checking that indices are `0..n`
    /// in order and that every record is internally consistent.
    pub(crate) fn from_trials(trials: Vec<Trial>) -> Result<Self> {
        for (position, trial) in trials.iter().enumerate() {
            if trial.index() != position as u64 {
                return Err(Error::config(format!(
                    "snapshot trial at position {position} has index {}",
                    trial.index()
                )));
            }
            trial.check_invariants()?;
        }
        Ok(Self { trials })
    }

    /// Number of trials ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Returns `true` if no trial has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// The index the next created trial will receive.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.trials.len() as u64
    }

    /// Looks up a trial.
    #[must_use]
    pub fn get(&self, index: u64) -> Option<&Trial> {
        usize::try_from(index).ok().and_then(|i| self.trials.get(i))
    }

    pub(crate) fn get_mut(&mut self, index: u64) -> Result<&mut Trial> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.trials.get_mut(i))
            .ok_or(Error::UnknownTrial(index))
    }

    /// All trials in index order.
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Trials with the given status.
    pub fn with_status(&self, status: TrialStatus) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(move |t| t.status() == status)
    }

    /// Completed trials.
    pub fn completed(&self) -> impl Iterator<Item = &Trial> {
        self.with_status(TrialStatus::Completed)
    }

    /// Candidate and running trials.
    pub fn pending(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(|t| t.status().is_pending())
    }

    /// Number of trials per status. Statuses with no trials are omitted.
    #[must_use]
    pub fn count_by_status(&self) -> BTreeMap<TrialStatus, usize> {
        let mut counts = BTreeMap::new();
        for t in &self.trials {
            *counts.entry(t.status()).or_insert(0) += 1;
        }
        counts
    }

    /// Appends a new trial and returns its index.
    pub(crate) fn create(
        &mut self,
        parameterization: Parameterization,
        status: TrialStatus,
        source: TrialSource,
    ) -> u64 {
        let index = self.next_index();
        self.trials
            .push(Trial::new(index, parameterization, status, source));
        index
    }
}
