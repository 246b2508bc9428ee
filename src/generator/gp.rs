//! Gaussian process generator with Expected Improvement acquisition.
//!
//! Fits a Gaussian process surrogate with a **Matérn 5/2 kernel** (ARD
//! lengthscales) to the completed trials and proposes the candidate that
//! maximizes **Expected Improvement (EI)**. Suited to small, expensive
//! evaluation budgets in low-dimensional spaces.
//!
//! # Algorithm overview
//!
//! 1. **Training data**: completed trials with readings for every
//!    objective metric, encoded into the unit cube. At most the 100 most
//!    recent trials are used to bound the O(n³) fit.
//! 2. **Scalarize**: single and scalarized objectives use their utility
//!    directly. Multi-objective configurations draw fresh simplex weights
//!    for every batch point and use the augmented Chebyshev scalarization of
//!    min-max normalized utilities. Trials that violate an outcome
//!    constraint are penalized below the worst observed value.
//! 3. **Fit**: targets are standardized and the kernel matrix factorized by
//!    Cholesky decomposition. Lengthscales are the per-dimension standard
//!    deviation of the inputs.
//! 4. **Batch**: pending trials and points already chosen for the batch are
//!    added as fantasies at the posterior mean (kriging believer), which
//!    flattens EI around them and spreads the batch out.
//! 5. **Maximize EI** over random candidates that satisfy the parameter
//!    constraints and are not duplicates.
//!
//! Unordered categorical parameters do not enter the model and are drawn at
//! random with each candidate. With fewer than two usable trials, or when
//! no dimension can be modeled, the generator samples uniformly instead.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `n_candidates` | 1000 | Random candidates scored per batch point |
//! | `noise_variance` | 1e-6 | Observation noise added to the kernel diagonal |
//! | `duplicate_tolerance` | 1e-9 | Chebyshev distance below which points are duplicates |
//! | `seed` | random | RNG seed for reproducibility |
//!
//! # Examples
//!
//! ```
//! use asktell::generator::GpGenerator;
//!
//! let generator = GpGenerator::builder()
//!     .n_candidates(500)
//!     .noise_variance(1e-4)
//!     .seed(42)
//!     .build();
//! ```

use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;

use crate::error::Result;
use crate::generator::common::{Dedup, canonicalize, fill_batch};
use crate::generator::{
    DEFAULT_DUPLICATE_TOLERANCE, GenerationRequest, Generator, GeneratorRun, Prediction,
};
use crate::ledger::Ledger;
use crate::objective::OptimizationConfig;
use crate::rng_util::{self, norm_cdf, norm_pdf};
use crate::search_space::{Parameterization, SearchSpace};

/// Default number of candidate points for EI optimization.
const DEFAULT_N_CANDIDATES: usize = 1000;
/// Default observation noise variance.
const DEFAULT_NOISE_VAR: f64 = 1e-6;
/// Maximum number of training points used for one fit.
const MAX_TRAIN_POINTS: usize = 100;
/// Weight of the linear term in the augmented Chebyshev scalarization.
const CHEBYSHEV_AUGMENTATION: f64 = 0.05;
/// Precomputed √5 constant.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Gaussian process generator for Bayesian optimization.
///
/// Also serves posterior predictions through [`Generator::predict`], which
/// the experiment attaches to its best-point report.
pub struct GpGenerator {
    rng: Mutex<fastrand::Rng>,
    n_candidates: usize,
    noise_variance: f64,
    tolerance: f64,
}

impl GpGenerator {
    /// Creates a GP generator with default settings and a random seed.
    #[must_use]
    pub fn new() -> Self {
        GpGeneratorBuilder::new().build()
    }

    /// Creates a GP generator with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        GpGeneratorBuilder::new().seed(seed).build()
    }

    /// Creates a builder for configuring a `GpGenerator`.
    #[must_use]
    pub fn builder() -> GpGeneratorBuilder {
        GpGeneratorBuilder::new()
    }
}

impl Default for GpGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`GpGenerator`].
#[derive(Debug, Clone, Default)]
pub struct GpGeneratorBuilder {
    n_candidates: Option<usize>,
    noise_variance: Option<f64>,
    tolerance: Option<f64>,
    seed: Option<u64>,
}

impl GpGeneratorBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of random candidates scored per batch point.
    ///
    /// Default: 1000.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = Some(n.max(1));
        self
    }

    /// Sets the observation noise variance added to the kernel diagonal.
    ///
    /// Default: 1e-6 (near-noiseless).
    #[must_use]
    pub fn noise_variance(mut self, v: f64) -> Self {
        self.noise_variance = Some(v);
        self
    }

    /// Sets the duplicate tolerance (Chebyshev distance in the unit cube).
    #[must_use]
    pub fn duplicate_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the configured [`GpGenerator`].
    #[must_use]
    pub fn build(self) -> GpGenerator {
        GpGenerator {
            rng: Mutex::new(
                self.seed
                    .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
            ),
            n_candidates: self.n_candidates.unwrap_or(DEFAULT_N_CANDIDATES),
            noise_variance: self.noise_variance.unwrap_or(DEFAULT_NOISE_VAR),
            tolerance: self.tolerance.unwrap_or(DEFAULT_DUPLICATE_TOLERANCE),
        }
    }
}

// ---------------------------------------------------------------------------
// Matérn 5/2 kernel
// ---------------------------------------------------------------------------

/// `k(x1, x2) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`
fn matern52(x1: &[f64], x2: &[f64], lengthscales: &[f64], signal_var: f64) -> f64 {
    let r_sq: f64 = x1
        .iter()
        .zip(x2)
        .zip(lengthscales)
        .map(|((a, b), l)| ((a - b) / l).powi(2))
        .sum();
    let sqrt5_r = SQRT_5 * r_sq.sqrt();
    signal_var * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

fn kernel_matrix(x: &[Vec<f64>], lengthscales: &[f64], signal_var: f64, noise_var: f64) -> DMatrix<f64> {
    let n = x.len();
    DMatrix::from_fn(n, n, |i, j| {
        let k = matern52(&x[i], &x[j], lengthscales, signal_var);
        if i == j { k + noise_var } else { k }
    })
}

// ---------------------------------------------------------------------------
// GP fitting and prediction
// ---------------------------------------------------------------------------

/// A fitted GP. Targets are losses (smaller is better).
struct GpModel {
    cholesky: nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>,
    alpha: DVector<f64>,
    x_train: Vec<Vec<f64>>,
    lengthscales: Vec<f64>,
    signal_var: f64,
    y_mean: f64,
    y_std: f64,
    /// Best (lowest) standardized target.
    f_best: f64,
}

impl GpModel {
    /// Fits the model; `None` if the Cholesky factorization fails.
    #[allow(clippy::cast_precision_loss)]
    fn fit(x_train: &[Vec<f64>], y_train: &[f64], noise_var: f64) -> Option<Self> {
        let n = y_train.len();
        if n == 0 {
            return None;
        }

        let y_mean = y_train.iter().sum::<f64>() / n as f64;
        let y_var = if n > 1 {
            y_train.iter().map(|&y| (y - y_mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            1.0
        };
        let y_std = y_var.sqrt().max(1e-10);
        let y_standardized: Vec<f64> = y_train.iter().map(|&y| (y - y_mean) / y_std).collect();
        let f_best = y_standardized.iter().copied().fold(f64::INFINITY, f64::min);

        let d = x_train.first().map_or(0, Vec::len);
        let lengthscales: Vec<f64> = (0..d)
            .map(|j| {
                let mean_j = x_train.iter().map(|x| x[j]).sum::<f64>() / n as f64;
                let var_j = x_train.iter().map(|x| (x[j] - mean_j).powi(2)).sum::<f64>() / n as f64;
                var_j.sqrt().max(0.01)
            })
            .collect();

        let signal_var = 1.0;
        let k = kernel_matrix(x_train, &lengthscales, signal_var, noise_var);
        let cholesky = nalgebra::linalg::Cholesky::new(k)?;
        let alpha = cholesky.solve(&DVector::from_column_slice(&y_standardized));

        Some(Self {
            cholesky,
            alpha,
            x_train: x_train.to_vec(),
            lengthscales,
            signal_var,
            y_mean,
            y_std,
            f_best,
        })
    }

    /// Standardized posterior mean and standard deviation.
    fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = DVector::from_fn(self.x_train.len(), |i, _| {
            matern52(x, &self.x_train[i], &self.lengthscales, self.signal_var)
        });
        let mean = k_star.dot(&self.alpha);
        let v = self.cholesky.solve(&k_star);
        let var = (self.signal_var - k_star.dot(&v)).max(0.0);
        (mean, var.sqrt())
    }

    /// Posterior mean and variance in the units of the training targets.
    fn predict_original(&self, x: &[f64]) -> (f64, f64) {
        let (mean, std) = self.predict(x);
        (mean * self.y_std + self.y_mean, (std * self.y_std).powi(2))
    }
}

/// `EI(x) = (f_best - mean) Φ(z) + std φ(z)` where `z = (f_best - mean) / std`
fn expected_improvement(mean: f64, std: f64, f_best: f64) -> f64 {
    if std < 1e-12 {
        return (f_best - mean).max(0.0);
    }
    let z = (f_best - mean) / std;
    ((f_best - mean) * norm_cdf(z) + std * norm_pdf(z)).max(0.0)
}

// ---------------------------------------------------------------------------
// Training data
// ---------------------------------------------------------------------------

/// Positions, among the tunable parameters, of dimensions the GP models.
fn modeled_dims(space: &SearchSpace) -> Vec<usize> {
    space
        .tunable()
        .enumerate()
        .filter(|(_, p)| p.is_continuous_dimension())
        .map(|(i, _)| i)
        .collect()
}

fn project(point: &[f64], dims: &[usize]) -> Vec<f64> {
    dims.iter().map(|&d| point[d]).collect()
}

/// Completed trials usable for fitting.
struct TrainingSet {
    x: Vec<Vec<f64>>,
    utilities: Vec<Vec<f64>>,
    feasible: Vec<bool>,
}

impl TrainingSet {
    fn collect(
        space: &SearchSpace,
        config: &OptimizationConfig,
        ledger: &Ledger,
        dims: &[usize],
    ) -> Self {
        let mut set = Self {
            x: Vec::new(),
            utilities: Vec::new(),
            feasible: Vec::new(),
        };
        let completed: Vec<_> = ledger.completed().collect();
        let start = completed.len().saturating_sub(MAX_TRAIN_POINTS);
        for trial in &completed[start..] {
            let Some(data) = trial.final_data() else {
                continue;
            };
            let (Some(point), Some(utilities)) =
                (space.encode(trial.parameterization()), config.utilities(data))
            else {
                continue;
            };
            if utilities.iter().any(|u| !u.is_finite()) {
                continue;
            }
            set.x.push(project(&point, dims));
            set.utilities.push(utilities);
            set.feasible.push(config.satisfies_outcome_constraints(data));
        }
        set
    }

    fn len(&self) -> usize {
        self.x.len()
    }

    /// Losses to fit: negated (scalarized) utilities, with infeasible trials
    /// pushed past the worst feasible one when `penalize` is set.
    fn losses(&self, weights: Option<&[f64]>, penalize: bool) -> Vec<f64> {
        let mut losses: Vec<f64> = match weights {
            None => self.utilities.iter().map(|u| -u[0]).collect(),
            Some(w) => self.chebyshev_losses(w),
        };
        if penalize && self.feasible.iter().any(|f| !f) {
            let worst = losses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let best = losses.iter().copied().fold(f64::INFINITY, f64::min);
            let spread = if worst > best { worst - best } else { 1.0 };
            for (loss, &feasible) in losses.iter_mut().zip(&self.feasible) {
                if !feasible {
                    *loss = worst + spread;
                }
            }
        }
        losses
    }

    fn chebyshev_losses(&self, weights: &[f64]) -> Vec<f64> {
        let k = weights.len();
        let (mut lo, mut hi) = (vec![f64::INFINITY; k], vec![f64::NEG_INFINITY; k]);
        for u in &self.utilities {
            for ((l, h), &v) in lo.iter_mut().zip(hi.iter_mut()).zip(u) {
                *l = l.min(v);
                *h = h.max(v);
            }
        }
        self.utilities
            .iter()
            .map(|u| {
                let scaled: Vec<f64> = weights
                    .iter()
                    .zip(u)
                    .zip(lo.iter().zip(&hi))
                    .map(|((w, &v), (&l, &h))| {
                        let normalized = if h > l { (v - l) / (h - l) } else { 0.5 };
                        w * normalized
                    })
                    .collect();
                let min = scaled.iter().copied().fold(f64::INFINITY, f64::min);
                let sum: f64 = scaled.iter().sum();
                -(min + CHEBYSHEV_AUGMENTATION * sum)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Generator implementation
// ---------------------------------------------------------------------------

impl GpGenerator {
    /// Scores `n_candidates` random points and returns the novel, feasible
    /// one with the highest EI.
    fn best_candidate(
        &self,
        request: &GenerationRequest<'_>,
        model: &GpModel,
        dims: &[usize],
        dedup: &Dedup,
        rng: &mut fastrand::Rng,
    ) -> Result<Option<(Parameterization, Vec<f64>)>> {
        let n_dims = request.space.n_dims();
        let mut best: Option<(f64, Parameterization, Vec<f64>)> = None;

        for _ in 0..self.n_candidates {
            request.cancel.check()?;
            let raw = rng_util::unit_point(rng, n_dims);
            let Some((parameterization, canonical)) = canonicalize(request.space, &raw) else {
                continue;
            };
            if !dedup.is_novel(&canonical) {
                continue;
            }
            let (mean, std) = model.predict(&project(&canonical, dims));
            let ei = expected_improvement(mean, std, model.f_best);
            if best.as_ref().is_none_or(|(b, _, _)| ei > *b) {
                best = Some((ei, parameterization, canonical));
            }
        }

        Ok(best.map(|(_, p, c)| (p, c)))
    }

    fn random_fill(
        &self,
        request: &GenerationRequest<'_>,
        dedup: &mut Dedup,
        count: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Parameterization>> {
        let n_dims = request.space.n_dims();
        fill_batch(request, dedup, count, || rng_util::unit_point(rng, n_dims))
    }
}

impl Generator for GpGenerator {
    fn name(&self) -> &'static str {
        "gp"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratorRun> {
        let mut rng = self.rng.lock();
        let dims = modeled_dims(request.space);
        let set = TrainingSet::collect(request.space, request.config, request.ledger, &dims);
        let mut dedup = Dedup::from_request(request, self.tolerance);

        if dims.is_empty() || set.len() < 2 {
            trace_debug!(
                n_train = set.len(),
                "gp generator has too little data, sampling uniformly"
            );
            let batch = self.random_fill(request, &mut dedup, request.count, &mut rng)?;
            return Ok(GeneratorRun::new(self.name(), batch));
        }

        let n_objectives = request.config.objectives().len();
        let multi = request.config.is_multi_objective();
        let mut fantasies: Vec<Vec<f64>> = request
            .ledger
            .pending()
            .filter_map(|t| request.space.encode(t.parameterization()))
            .map(|p| project(&p, &dims))
            .collect();
        let mut batch = Vec::new();

        while batch.len() < request.count {
            request.cancel.check()?;
            let weights = multi.then(|| rng_util::simplex_weights(&mut rng, n_objectives));
            let losses = set.losses(weights.as_deref(), true);

            let Some(base) = GpModel::fit(&set.x, &losses, self.noise_variance) else {
                trace_warn!("gp fit failed, sampling the rest of the batch uniformly");
                let rest = request.count - batch.len();
                batch.extend(self.random_fill(request, &mut dedup, rest, &mut rng)?);
                break;
            };

            let model = if fantasies.is_empty() {
                base
            } else {
                let mut x = set.x.clone();
                let mut y = losses;
                for f in &fantasies {
                    y.push(base.predict_original(f).0);
                    x.push(f.clone());
                }
                GpModel::fit(&x, &y, self.noise_variance).unwrap_or(base)
            };

            match self.best_candidate(request, &model, &dims, &dedup, &mut rng)? {
                Some((parameterization, canonical)) => {
                    fantasies.push(project(&canonical, &dims));
                    dedup.insert(canonical);
                    batch.push(parameterization);
                }
                None => {
                    let rest = request.count - batch.len();
                    batch.extend(self.random_fill(request, &mut dedup, rest, &mut rng)?);
                    break;
                }
            }
        }

        trace_debug!(n = batch.len(), n_train = set.len(), "gp batch generated");
        Ok(GeneratorRun::new(self.name(), batch))
    }

    fn predict(
        &self,
        space: &SearchSpace,
        config: &OptimizationConfig,
        ledger: &Ledger,
        parameterization: &Parameterization,
    ) -> Option<Prediction> {
        if config.is_multi_objective() {
            return None;
        }
        let dims = modeled_dims(space);
        let set = TrainingSet::collect(space, config, ledger, &dims);
        if dims.is_empty() || set.len() < 2 {
            return None;
        }
        let model = GpModel::fit(&set.x, &set.losses(None, false), self.noise_variance)?;
        let point = project(&space.encode(parameterization)?, &dims);
        let (loss, variance) = model.predict_original(&point);
        Some(Prediction {
            mean: config.value_from_utility(-loss),
            variance,
        })
    }
}
