use crate::types::TrialStatus;

/// Errors reported by experiment operations.
///
/// Every variant is returned synchronously to the caller of the violating
/// operation. Ledger invariants (unique indices, append-only creation,
/// terminal immutability) are never reported here: a path that would break
/// them is a bug.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the parameter space or optimization configuration is
    /// malformed, or when an experiment is configured twice.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// Returned when a parameterization lies outside the parameter space,
    /// or a metric reading is not a finite number.
    #[error("'{parameter}' is out of domain: {reason}")]
    Domain {
        /// The offending parameter or metric name.
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Returned when an operation references a trial index that was never created.
    #[error("unknown trial index {0}")]
    UnknownTrial(u64),

    /// Returned when an operation is attempted on a trial in an incompatible status.
    #[error("cannot {operation} trial {index} in status {status}")]
    State {
        /// The trial index.
        index: u64,
        /// The status the trial was in.
        status: TrialStatus,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Returned when progress is reported with a progression lower than a
    /// previous report for the same trial.
    #[error("progression for trial {index} must be non-decreasing: last {last}, got {got}")]
    NonMonotonicProgression {
        /// The trial index.
        index: u64,
        /// The last accepted progression.
        last: f64,
        /// The rejected progression.
        got: f64,
    },

    /// Returned when a selection is requested before any trial qualifies.
    #[error("no completed trial satisfies the objectives and outcome constraints")]
    InsufficientData,

    /// Returned when candidate generation was aborted through a [`CancelToken`](crate::CancelToken).
    #[error("candidate generation was cancelled")]
    Cancelled,

    /// Returned when an async generation task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),

    /// Returned when saving or loading a snapshot fails.
    #[cfg(feature = "serde")]
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn domain(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Domain {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by the trial's status, including
    /// non-monotonic progression reports.
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::State { .. } | Self::NonMonotonicProgression { .. })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
