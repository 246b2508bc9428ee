use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::search_space::Parameterization;

use super::Experiment;

impl Experiment {
    /// Like [`ask_with_cancel`](Self::ask_with_cancel), run on tokio's
    /// blocking pool so surrogate fitting does not stall the async runtime.
    ///
    /// Dropping the returned future does not stop generation; cancel the
    /// token for that.
    ///
    /// # Errors
    ///
    /// As [`ask_with_cancel`](Self::ask_with_cancel), plus
    /// [`Error::TaskError`] if the blocking task panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use asktell::prelude::*;
    ///
    /// # async fn example() -> asktell::Result<()> {
    /// let experiment = Arc::new(Experiment::new());
    /// experiment.configure(
    ///     vec![Parameter::float("lr", 1e-4, 1e-1).log_scale()],
    ///     OptimizationConfig::single(Objective::minimize("loss")),
    /// )?;
    /// let batch = experiment.ask_async(4, CancelToken::new()).await?;
    /// assert_eq!(batch.len(), 4);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ask_async(
        self: &Arc<Self>,
        count: usize,
        cancel: CancelToken,
    ) -> Result<BTreeMap<u64, Parameterization>> {
        let experiment = Arc::clone(self);
        tokio::task::spawn_blocking(move || experiment.ask_with_cancel(count, &cancel))
            .await
            .map_err(|e| Error::TaskError(e.to_string()))?
    }
}
