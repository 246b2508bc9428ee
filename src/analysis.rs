//! Pure report functions over an [`ExperimentSnapshot`].
//!
//! Nothing here touches a live experiment: take a snapshot, then summarize
//! or export it. Renderers that need more than [`Summary`] can read the
//! snapshot's trials directly.
//!
//! ```
//! use asktell::analysis;
//! use asktell::data::raw_data;
//! use asktell::prelude::*;
//!
//! let experiment = Experiment::builder().seed(3).build();
//! experiment
//!     .configure(
//!         vec![Parameter::int("layers", 1, 8)],
//!         OptimizationConfig::single(Objective::minimize("loss")),
//!     )
//!     .unwrap();
//! for (index, params) in experiment.ask(3).unwrap() {
//!     let layers = params["layers"].as_i64().unwrap() as f64;
//!     experiment.tell(index, raw_data([("loss", (layers - 4.0).abs())])).unwrap();
//! }
//!
//! let snapshot = experiment.snapshot().unwrap();
//! let summary = analysis::summarize(&snapshot);
//! assert_eq!(summary.n_trials, 3);
//! assert_eq!(summary.best_trace.len(), 3);
//!
//! let mut csv = Vec::new();
//! analysis::write_csv(&snapshot, &mut csv).unwrap();
//! assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 4);
//! ```

use core::fmt;
use std::collections::BTreeMap;
use std::io::Write;

use crate::experiment::ExperimentSnapshot;
use crate::pareto;
use crate::selector::eligible;
use crate::trial::TrialSource;
use crate::types::TrialStatus;

/// Aggregate statistics of one metric over completed trials.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricSummary {
    /// Completed trials reporting the metric.
    pub count: usize,
    /// Mean of the reported values.
    pub mean: f64,
    /// Smallest reported value.
    pub min: f64,
    /// Largest reported value.
    pub max: f64,
}

/// A report over a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    /// Trials ever created.
    pub n_trials: usize,
    /// Trials per status.
    pub by_status: BTreeMap<TrialStatus, usize>,
    /// Trials per generator name (`"attached"` for attached trials).
    pub by_source: BTreeMap<String, usize>,
    /// Completed trials eligible for selection.
    pub n_eligible: usize,
    /// Best objective value so far after each eligible trial, as
    /// `(trial_index, best_value)`. Empty for multi-objective experiments.
    pub best_trace: Vec<(u64, f64)>,
    /// Pareto-optimal trial indices. For single-objective experiments,
    /// the best trial alone.
    pub frontier: Vec<u64>,
    /// Hypervolume of the frontier, in utility space, relative to the worst
    /// eligible value of each objective. Multi-objective experiments only.
    pub hypervolume: Option<f64>,
    /// Final-data statistics per metric over completed trials.
    pub metrics: BTreeMap<String, MetricSummary>,
}

/// Summarizes a snapshot.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(snapshot: &ExperimentSnapshot) -> Summary {
    let config = &snapshot.config;
    let trials = &snapshot.trials;

    let mut by_status = BTreeMap::new();
    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    for t in trials {
        *by_status.entry(t.status()).or_insert(0) += 1;
        let source = match t.source() {
            TrialSource::Generated { generator } => generator.clone(),
            TrialSource::Attached => "attached".to_owned(),
        };
        *by_source.entry(source).or_insert(0) += 1;
    }

    let candidates: Vec<_> = eligible(trials, config).collect();
    let utilities: Vec<Vec<f64>> = candidates.iter().map(|(_, _, u)| u.clone()).collect();

    let mut best_trace = Vec::new();
    let (frontier, hypervolume) = if config.is_multi_objective() {
        let front = pareto::pareto_front_indices(&utilities);
        let hv = (!front.is_empty()).then(|| {
            let n_obj = utilities[0].len();
            let reference: Vec<f64> = (0..n_obj)
                .map(|j| utilities.iter().map(|u| u[j]).fold(f64::INFINITY, f64::min))
                .collect();
            let points: Vec<Vec<f64>> = front.iter().map(|&i| utilities[i].clone()).collect();
            pareto::hypervolume(&points, &reference)
        });
        (front.iter().map(|&i| candidates[i].0.index()).collect(), hv)
    } else {
        let mut best: Option<(u64, f64)> = None;
        for (trial, _, u) in &candidates {
            if best.is_none_or(|(_, b)| u[0] > b) {
                best = Some((trial.index(), u[0]));
            }
            if let Some((_, b)) = best {
                best_trace.push((trial.index(), config.value_from_utility(b)));
            }
        }
        (best.map(|(i, _)| i).into_iter().collect(), None)
    };

    let mut metrics: BTreeMap<String, (usize, f64, f64, f64)> = BTreeMap::new();
    for data in trials
        .iter()
        .filter(|t| t.status() == TrialStatus::Completed)
        .filter_map(|t| t.final_data())
    {
        for (name, reading) in data {
            let entry = metrics
                .entry(name.clone())
                .or_insert((0, 0.0, f64::INFINITY, f64::NEG_INFINITY));
            entry.0 += 1;
            entry.1 += reading.mean;
            entry.2 = entry.2.min(reading.mean);
            entry.3 = entry.3.max(reading.mean);
        }
    }
    let metrics = metrics
        .into_iter()
        .map(|(name, (count, sum, min, max))| {
            (
                name,
                MetricSummary {
                    count,
                    mean: sum / count as f64,
                    min,
                    max,
                },
            )
        })
        .collect();

    Summary {
        n_trials: trials.len(),
        by_status,
        by_source,
        n_eligible: candidates.len(),
        best_trace,
        frontier,
        hypervolume,
        metrics,
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trials: {} ({} eligible)", self.n_trials, self.n_eligible)?;
        for (status, n) in &self.by_status {
            writeln!(f, "  {status}: {n}")?;
        }
        for (source, n) in &self.by_source {
            writeln!(f, "  from {source}: {n}")?;
        }
        if let Some(&(index, value)) = self.best_trace.last() {
            writeln!(f, "best: trial {index} = {value}")?;
        }
        if !self.frontier.is_empty() && self.hypervolume.is_some() {
            writeln!(f, "pareto frontier: {:?}", self.frontier)?;
        }
        if let Some(hv) = self.hypervolume {
            writeln!(f, "hypervolume: {hv}")?;
        }
        for (name, m) in &self.metrics {
            writeln!(
                f,
                "{name}: n={} mean={} min={} max={}",
                m.count, m.mean, m.min, m.max
            )?;
        }
        Ok(())
    }
}

/// Writes one CSV row per trial.
///
/// Columns: `trial_index`, `status`, `source`, `last_progression`, one
/// column per parameter in definition order, then one column per metric
/// (final means, sorted by name). Cells without a value are empty.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn write_csv(snapshot: &ExperimentSnapshot, mut writer: impl Write) -> std::io::Result<()> {
    let params: Vec<&str> = snapshot
        .search_space
        .parameters()
        .iter()
        .map(|p| p.name())
        .collect();
    let mut metric_names: Vec<&str> = snapshot
        .trials
        .iter()
        .filter_map(|t| t.final_data())
        .flat_map(|d| d.keys().map(String::as_str))
        .collect();
    metric_names.sort_unstable();
    metric_names.dedup();

    write!(writer, "trial_index,status,source,last_progression")?;
    for name in params.iter().chain(&metric_names) {
        write!(writer, ",{}", csv_escape(name))?;
    }
    writeln!(writer)?;

    for trial in &snapshot.trials {
        let source = match trial.source() {
            TrialSource::Generated { generator } => generator.as_str(),
            TrialSource::Attached => "attached",
        };
        write!(
            writer,
            "{},{},{}",
            trial.index(),
            trial.status(),
            csv_escape(source)
        )?;
        match trial.last_progression() {
            Some(p) => write!(writer, ",{p}")?,
            None => write!(writer, ",")?,
        }
        for name in &params {
            match trial.parameterization().get(*name) {
                Some(v) => write!(writer, ",{}", csv_escape(&v.to_string()))?,
                None => write!(writer, ",")?,
            }
        }
        for name in &metric_names {
            match trial.final_data().and_then(|d| d.get(*name)) {
                Some(r) => write!(writer, ",{}", r.mean)?,
                None => write!(writer, ",")?,
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Quotes a CSV field if it contains a comma, quote or newline.
fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_owned()
    }
}
