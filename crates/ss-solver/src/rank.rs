//! Numerical rank check of the steady-state Jacobian.

use nalgebra::DMatrix;
use ss_core::Real;
use tracing::warn;

/// Outcome of the rank check at the initial guess.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankDiagnostic {
    /// Number of unknowns (`ns + nx`).
    pub unknowns: usize,
    /// Numerical rank of the Jacobian, `None` when it has non-finite entries.
    pub rank: Option<usize>,
    /// Singular value threshold that was applied.
    pub threshold: Option<Real>,
}

impl RankDiagnostic {
    /// True when the steady state is not known to be locally determined.
    ///
    /// An unknown rank counts as indeterminate.
    pub fn is_indeterminate(&self) -> bool {
        self.rank.is_none_or(|rank| rank < self.unknowns)
    }
}

/// Singular values of `jac` above the rank threshold, with the threshold.
///
/// With `tolerance = None` the threshold is `max(m, n) * sigma_max * eps`.
/// Returns `None` when `jac` has a non-finite entry.
pub fn numerical_rank(jac: &DMatrix<Real>, tolerance: Option<Real>) -> Option<(usize, Real)> {
    if jac.is_empty() {
        return Some((0, tolerance.unwrap_or(0.0)));
    }
    if !jac.iter().all(|v| v.is_finite()) {
        return None;
    }
    let singular_values = jac.clone().svd(false, false).singular_values;
    let threshold = tolerance.unwrap_or_else(|| {
        let (m, n) = jac.shape();
        m.max(n) as Real * singular_values.max() * Real::EPSILON
    });
    let rank = singular_values.iter().filter(|&&s| s > threshold).count();
    Some((rank, threshold))
}

/// Compare the Jacobian's rank with the number of unknowns.
///
/// A deficient rank is logged and reported, never treated as an error.
pub fn diagnose_rank(
    jac: &DMatrix<Real>,
    unknowns: usize,
    tolerance: Option<Real>,
) -> RankDiagnostic {
    let Some((rank, threshold)) = numerical_rank(jac, tolerance) else {
        warn!(
            equations = unknowns,
            "The jacobian matrix has non-finite entries at the initial guess; its rank is unknown."
        );
        return RankDiagnostic {
            unknowns,
            rank: None,
            threshold: None,
        };
    };
    let diagnostic = RankDiagnostic {
        unknowns,
        rank: Some(rank),
        threshold: Some(threshold),
    };
    if rank < unknowns {
        warn!(
            equations = unknowns,
            rank,
            "There are {unknowns} equilibrium variables to find, but the jacobian matrix is only of rank {rank}. The solution is indeterminate."
        );
    }
    diagnostic
}
