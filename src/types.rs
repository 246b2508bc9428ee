//! Core types for the experiment controller.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The direction of optimization for one objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Minimize the metric.
    Minimize,
    /// Maximize the metric.
    Maximize,
}

impl Direction {
    /// Multiplier that turns a raw metric value into a larger-is-better utility.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Minimize => -1.0,
            Self::Maximize => 1.0,
        }
    }
}

/// The status of a trial in its lifecycle.
///
/// `Candidate -> Running -> Completed | EarlyStopped`, and any non-terminal
/// status may move to `Failed`. Terminal statuses never change again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrialStatus {
    /// Generated, not yet dispatched.
    Candidate,
    /// Dispatched, awaiting data.
    Running,
    /// Terminated before natural completion.
    EarlyStopped,
    /// Final data attached.
    Completed,
    /// Explicitly marked unusable.
    Failed,
}

impl TrialStatus {
    /// Returns `true` for `Completed`, `EarlyStopped` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::EarlyStopped | Self::Failed)
    }

    /// Returns `true` for trials whose outcome is still pending.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Candidate | Self::Running)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "CANDIDATE",
            Self::Running => "RUNNING",
            Self::EarlyStopped => "EARLY_STOPPED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
