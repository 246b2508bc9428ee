#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! An ask-tell experiment controller for black-box optimization.
//!
//! The crate keeps the state of an optimization experiment: a typed
//! parameter space, the objectives and outcome constraints, and an
//! append-only ledger of trials. Callers *ask* for candidate
//! parameterizations, evaluate them wherever they like, and *tell* the
//! results back. The controller never runs user code.
//!
//! # Getting Started
//!
//! ```
//! use asktell::data::raw_data;
//! use asktell::prelude::*;
//!
//! let experiment = Experiment::builder().seed(1).build();
//! experiment
//!     .configure(
//!         vec![
//!             Parameter::float("x", -10.0, 10.0),
//!             Parameter::choice("kind", ["a", "b"]),
//!         ],
//!         OptimizationConfig::parse("-loss", &[]).unwrap(),
//!     )
//!     .unwrap();
//!
//! for _ in 0..5 {
//!     for (index, params) in experiment.ask(2).unwrap() {
//!         let x = params["x"].as_f64().unwrap();
//!         let offset = if params["kind"].as_str() == Some("a") { 0.0 } else { 1.0 };
//!         experiment
//!             .tell(index, raw_data([("loss", (x - 3.0).powi(2) + offset)]))
//!             .unwrap();
//!     }
//! }
//!
//! let best = experiment.best().unwrap();
//! println!("best trial {} with loss {:.4}", best.trial_index, best.value);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Experiment`] | Owns configuration and ledger; the ask-tell surface. |
//! | [`Parameter`](parameter::Parameter) | One dimension: float or int range, choice, or fixed value. |
//! | [`OptimizationConfig`](objective::OptimizationConfig) | Single, scalarized or multi-objective goals plus outcome constraints. |
//! | [`Trial`](trial::Trial) | One proposed-and-evaluated parameterization with its observations. |
//! | [`Generator`](generator::Generator) | Proposes candidates (Sobol, GP, random, or custom). |
//! | [`EarlyStopping`](stopping::EarlyStopping) | Advises whether a running trial should stop. |
//!
//! # Trial lifecycle
//!
//! ```text
//! Candidate --mark_running--> Running --tell--> Completed
//!                                |
//!                                +--mark_early_stopped--> EarlyStopped
//! (any non-terminal) --mark_failed--> Failed
//! ```
//!
//! [`Experiment::ask`] creates trials directly in `Running`;
//! [`Experiment::propose`] leaves them in `Candidate` until dispatched.
//!
//! # Generators
//!
//! | Generator | Algorithm | Use |
//! |-----------|-----------|-----|
//! | [`GenerationStrategy`](generator::GenerationStrategy) | Sobol, then GP | Default |
//! | [`SobolGenerator`](generator::SobolGenerator) | Scrambled Sobol sequence | Space-filling exploration |
//! | [`GpGenerator`](generator::GpGenerator) | Gaussian process + EI | Expensive evaluations |
//! | [`RandomGenerator`](generator::RandomGenerator) | Uniform random | Baselines |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on public types, [`Experiment::save`]/[`Experiment::load`] | off |
//! | `async` | [`Experiment::ask_async`] on tokio's blocking pool | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod analysis;
mod cancel;
pub mod data;
mod error;
pub mod experiment;
pub mod generator;
pub mod ledger;
pub mod objective;
pub mod parameter;
pub mod pareto;
mod rng_util;
pub mod search_space;
pub mod selector;
pub mod stopping;
pub mod trial;
mod types;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use experiment::{Experiment, ExperimentBuilder, ExperimentSnapshot};
pub use types::{Direction, TrialStatus};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use asktell::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::data::{MetricReading, RawData};
    pub use crate::error::{Error, Result};
    pub use crate::experiment::{Experiment, ExperimentBuilder, ExperimentSnapshot};
    pub use crate::generator::{
        GenerationStrategy, Generator, GpGenerator, RandomGenerator, SobolGenerator,
    };
    pub use crate::objective::{Objective, OptimizationConfig, OutcomeConstraint};
    pub use crate::parameter::{ParamValue, Parameter};
    pub use crate::search_space::{ParameterConstraint, Parameterization, SearchSpace};
    pub use crate::selector::{BestPoint, FrontierPoint};
    pub use crate::stopping::{
        EarlyStopping, NoEarlyStopping, PercentileEarlyStopping, ProjectionEarlyStopping,
        StopDecision, ThresholdEarlyStopping,
    };
    pub use crate::trial::Trial;
    pub use crate::types::{Direction, TrialStatus};
}
