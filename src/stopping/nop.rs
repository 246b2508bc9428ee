use super::{EarlyStopping, StopDecision};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::trial::Trial;

/// An evaluator that never recommends stopping.
///
/// This is the default evaluator of an [`Experiment`](crate::Experiment).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEarlyStopping;

impl EarlyStopping for NoEarlyStopping {
    fn evaluate(&self, _: &Trial, _: &Ledger, _: &OptimizationConfig) -> StopDecision {
        StopDecision::Continue
    }
}
