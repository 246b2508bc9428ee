//! Shared helpers for generators: canonical encoding and the duplicate-aware
//! batch filler.

use crate::error::Result;
use crate::generator::GenerationRequest;
use crate::search_space::{Parameterization, SearchSpace};

/// Consecutive rejected draws allowed before a batch is cut short.
const ATTEMPTS_PER_POINT: usize = 200;

/// Upper bound on the up-front batch allocation.
const MAX_PREALLOCATED: usize = 1024;

/// Tracks the canonical unit-cube encodings of every existing point so new
/// candidates can be rejected as duplicates.
pub(crate) struct Dedup {
    seen: Vec<Vec<f64>>,
    tolerance: f64,
}

impl Dedup {
    /// Seeds the tracker with every trial in the ledger, whatever its status.
    pub(crate) fn from_request(request: &GenerationRequest<'_>, tolerance: f64) -> Self {
        let seen = request
            .ledger
            .trials()
            .iter()
            .filter_map(|t| request.space.encode(t.parameterization()))
            .collect();
        Self { seen, tolerance }
    }

    /// Returns `true` if no tracked point lies within the tolerance of `point`.
    pub(crate) fn is_novel(&self, point: &[f64]) -> bool {
        self.seen.iter().all(|s| chebyshev(s, point) > self.tolerance)
    }

    pub(crate) fn insert(&mut self, point: Vec<f64>) {
        self.seen.push(point);
    }
}

fn chebyshev(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Decodes a raw unit point and re-encodes it, snapping integer and
/// categorical coordinates to their canonical cell centers.
///
/// Returns the parameterization with its canonical encoding, or `None` if it
/// violates a parameter constraint.
pub(crate) fn canonicalize(space: &SearchSpace, raw: &[f64]) -> Option<(Parameterization, Vec<f64>)> {
    let parameterization = space.decode(raw);
    if !space.satisfies_constraints(&parameterization) {
        return None;
    }
    let canonical = space.encode(&parameterization)?;
    Some((parameterization, canonical))
}

/// Fills a batch by repeatedly drawing raw unit points from `draw`,
/// skipping constraint violations and duplicates.
///
/// Stops early, returning fewer points, once [`ATTEMPTS_PER_POINT`] draws
/// in a row were rejected.
pub(crate) fn fill_batch<F>(
    request: &GenerationRequest<'_>,
    dedup: &mut Dedup,
    count: usize,
    mut draw: F,
) -> Result<Vec<Parameterization>>
where
    F: FnMut() -> Vec<f64>,
{
    let mut batch = Vec::with_capacity(count.min(MAX_PREALLOCATED));
    let mut misses = 0;

    while batch.len() < count && misses < ATTEMPTS_PER_POINT {
        request.cancel.check()?;

        let Some((parameterization, canonical)) = canonicalize(request.space, &draw()) else {
            misses += 1;
            continue;
        };
        if !dedup.is_novel(&canonical) {
            misses += 1;
            continue;
        }
        misses = 0;
        dedup.insert(canonical);
        batch.push(parameterization);
    }

    if batch.len() < count {
        trace_warn!(
            requested = count,
            produced = batch.len(),
            "could not find enough distinct candidates"
        );
    }
    Ok(batch)
}
