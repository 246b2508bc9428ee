//! Pareto dominance over objective utilities.
//!
//! Every function here works in *utility space*: one value per objective,
//! larger is better. [`OptimizationConfig::utilities`] converts raw metric
//! readings into that space by applying each objective's direction, so no
//! direction arguments are needed below.
//!
//! | Function | Purpose |
//! |---|---|
//! | [`dominates`] | Pairwise Pareto dominance |
//! | [`non_dominated_sort`] | Rank points into successive fronts (front 0, 1, ...) |
//! | [`pareto_front_indices`] | The non-dominated subset only |
//! | [`hypervolume`] | Volume dominated by a front above a reference point |
//!
//! # Example
//!
//! ```
//! use asktell::pareto::{hypervolume, non_dominated_sort, pareto_front_indices};
//!
//! let points = vec![
//!     vec![1.0, 5.0],
//!     vec![5.0, 1.0],
//!     vec![3.0, 3.0],
//!     vec![2.0, 2.0], // dominated by (3, 3)
//! ];
//!
//! assert_eq!(non_dominated_sort(&points).len(), 2);
//! assert_eq!(pareto_front_indices(&points), vec![0, 1, 2]);
//!
//! let front: Vec<_> = [0, 1, 2].iter().map(|&i| points[i].clone()).collect();
//! assert!(hypervolume(&front, &[0.0, 0.0]) > 0.0);
//! ```
//!
//! [`OptimizationConfig::utilities`]: crate::objective::OptimizationConfig::utilities

/// Returns `true` if `a` Pareto-dominates `b`: at least as good in every
/// objective and strictly better in at least one.
#[must_use]
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());

    let mut strictly_better = false;
    for (&av, &bv) in a.iter().zip(b) {
        if av < bv {
            return false;
        }
        if av > bv {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Fast non-dominated sorting (Deb et al., 2002).
///
/// Returns fronts of indices into `points`; `fronts[0]` is the Pareto
/// front. Indices within a front are ascending.
///
/// Complexity: O(M * N^2) where M = objectives, N = points.
#[must_use]
pub fn non_dominated_sort(points: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count: Vec<usize> = vec![0; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&points[i], &points[j]) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if dominates(&points[j], &points[i]) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();

    while !current.is_empty() {
        let mut next: Vec<usize> = Vec::new();
        for &p in &current {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }

    fronts
}

/// Indices of the non-dominated points, ascending.
#[must_use]
pub fn pareto_front_indices(points: &[Vec<f64>]) -> Vec<usize> {
    non_dominated_sort(points).into_iter().next().unwrap_or_default()
}

/// Hypervolume dominated by `front` and bounded below by `reference`.
///
/// Points that do not strictly exceed the reference in every objective
/// contribute nothing. Uses recursive slicing on the last objective.
#[must_use]
pub fn hypervolume(front: &[Vec<f64>], reference: &[f64]) -> f64 {
    debug_assert!(front.iter().all(|p| p.len() == reference.len()));

    // Work in minimize-space so the slicing below reads naturally.
    let reference: Vec<f64> = reference.iter().map(|r| -r).collect();
    let points: Vec<Vec<f64>> = front
        .iter()
        .map(|p| p.iter().map(|v| -v).collect::<Vec<f64>>())
        .filter(|p| p.iter().zip(&reference).all(|(&pv, &rv)| pv < rv))
        .collect();

    if points.is_empty() || reference.is_empty() {
        return 0.0;
    }
    hv_recursive(&points, &reference)
}

fn hv_recursive(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let d = reference.len();

    if d == 1 {
        let min_val = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return (reference[0] - min_val).max(0.0);
    }

    if let [only] = points {
        return only
            .iter()
            .zip(reference)
            .map(|(&p, &r)| (r - p).max(0.0))
            .product();
    }

    let mut sorted: Vec<&Vec<f64>> = points.iter().collect();
    sorted.sort_by(|a, b| a[d - 1].total_cmp(&b[d - 1]));

    let sub_ref = &reference[..d - 1];
    let mut result = 0.0;

    for i in 0..sorted.len() {
        let height = if i + 1 < sorted.len() {
            sorted[i + 1][d - 1] - sorted[i][d - 1]
        } else {
            reference[d - 1] - sorted[i][d - 1]
        };
        if height <= 0.0 {
            continue;
        }

        let projected: Vec<Vec<f64>> = sorted[..=i].iter().map(|p| p[..d - 1].to_vec()).collect();
        let non_dominated = minimal_subset(&projected);
        if !non_dominated.is_empty() {
            result += height * hv_recursive(&non_dominated, sub_ref);
        }
    }

    result
}

/// The non-dominated subset of `points` in minimize-space.
fn minimal_subset(points: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let negated: Vec<Vec<f64>> = points
        .iter()
        .map(|p| p.iter().map(|v| -v).collect())
        .collect();
    pareto_front_indices(&negated)
        .into_iter()
        .map(|i| points[i].clone())
        .collect()
}
