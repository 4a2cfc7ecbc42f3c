//! Levenberg-Marquardt solver for nonlinear least squares.
//!
//! Minimizes `0.5 * ||r(x)||^2` with a finite-difference Jacobian. Works for
//! square and over-determined (tall) systems alike.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::JacobianScheme;
use core::fmt;
use nalgebra::DVector;
use ss_core::Real;
use tracing::{debug, info, warn};

/// Floor for the Marquardt scaling diagonal.
const MIN_DIAGONAL: Real = 1e-12;

/// Minimum gain ratio for accepting a step.
const ACCEPT_RATIO: Real = 1e-4;

/// Levenberg-Marquardt configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct LmConfig {
    /// Maximum iterations (accepted steps)
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: Real,
    /// Relative tolerance for residual norm (against the initial norm)
    pub rel_tol: Real,
    /// Relative step size below which the iteration is considered stuck
    pub step_tol: Real,
    /// Starting damping factor
    pub initial_damping: Real,
    /// Damping beyond which no further step is attempted
    pub max_damping: Real,
    /// Scheme for the Jacobian estimated at each iterate
    pub jacobian: JacobianScheme,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            abs_tol: 1e-10,
            rel_tol: 1e-12,
            step_tol: 1e-14,
            initial_damping: 1e-3,
            max_damping: 1e16,
            jacobian: JacobianScheme::Forward,
        }
    }
}

/// Terminal state of the iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LmStatus {
    /// Residual norm met the tolerance.
    Converged,
    /// Iteration budget exhausted.
    MaxIterationsExceeded,
    /// No acceptable step could be found, or steps became negligible
    /// while the residual was still above tolerance.
    StepStagnated,
}

impl LmStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, LmStatus::Converged)
    }
}

impl fmt::Display for LmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LmStatus::Converged => "converged",
            LmStatus::MaxIterationsExceeded => "maximum iterations exceeded",
            LmStatus::StepStagnated => "step stagnated",
        };
        f.write_str(s)
    }
}

/// Levenberg-Marquardt result: the best iterate and how the run ended.
#[derive(Clone, Debug)]
pub struct LmResult {
    /// Solution vector
    pub x: DVector<Real>,
    /// Final residual norm
    pub residual_norm: Real,
    /// Number of accepted steps
    pub iterations: usize,
    /// Terminal state
    pub status: LmStatus,
}

/// Solve `min 0.5 * ||r(x)||^2` starting from `x0`.
///
/// Each iteration solves the damped normal equations
/// `(J^T J + lambda * diag(J^T J)) dx = -J^T r` and accepts `dx` when the
/// actual reduction of the cost is a sufficient fraction of the reduction
/// predicted by the linear model. Damping is updated with Nielsen's rule.
///
/// Failing to converge is not an error: the status says how the run ended.
/// Errors come from the residual function or from a non-finite residual at
/// `x0`.
pub fn levenberg_marquardt<F>(
    x0: DVector<Real>,
    residual_fn: F,
    config: &LmConfig,
) -> SolverResult<LmResult>
where
    F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::Numeric {
            what: "residual at the initial guess is not finite".to_string(),
        });
    }
    let mut r_norm = r.norm();
    let r0_norm = r_norm;
    let converged = |norm: Real| norm <= config.abs_tol || norm <= config.rel_tol * r0_norm;

    let mut lambda = config.initial_damping;
    let mut nu = 2.0;
    let mut iterations = 0;

    let status = loop {
        if converged(r_norm) {
            break LmStatus::Converged;
        }
        if iterations >= config.max_iterations {
            break LmStatus::MaxIterationsExceeded;
        }

        let jac = config.jacobian.jacobian_at(&x, &r, &residual_fn)?;
        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let gradient = &jt * &r;
        let scale = jtj.diagonal().map(|d| d.max(MIN_DIAGONAL));
        let cost = 0.5 * r_norm * r_norm;

        let mut accepted = None;
        while lambda <= config.max_damping {
            let mut damped = jtj.clone();
            for (i, s) in scale.iter().enumerate() {
                damped[(i, i)] += lambda * s;
            }

            let Some(cholesky) = damped.cholesky() else {
                lambda *= nu;
                nu *= 2.0;
                continue;
            };
            let step = cholesky.solve(&(-&gradient));

            let predicted = -gradient.dot(&step) - 0.5 * (&jac * &step).norm_squared();
            let x_trial = &x + &step;
            let r_trial = residual_fn(&x_trial)?;
            let actual = cost - 0.5 * r_trial.norm_squared();

            let finite = r_trial.iter().all(|v| v.is_finite());
            if finite && predicted > 0.0 && actual / predicted > ACCEPT_RATIO {
                let rho = actual / predicted;
                lambda *= (1.0 / 3.0_f64).max(1.0 - (2.0 * rho - 1.0).powi(3));
                nu = 2.0;
                accepted = Some((step, x_trial, r_trial));
                break;
            }

            debug!(iteration = iterations, lambda, "step rejected");
            lambda *= nu;
            nu *= 2.0;
        }

        let Some((step, x_new, r_new)) = accepted else {
            break LmStatus::StepStagnated;
        };

        x = x_new;
        r = r_new;
        r_norm = r.norm();
        iterations += 1;
        debug!(iteration = iterations, residual_norm = r_norm, lambda, "step accepted");

        if !converged(r_norm) && step.norm() <= config.step_tol * (x.norm() + config.step_tol) {
            break LmStatus::StepStagnated;
        }
    };

    if status.is_converged() {
        info!(iterations, residual_norm = r_norm, "Levenberg-Marquardt converged");
    } else {
        warn!(
            iterations,
            residual_norm = r_norm,
            %status,
            "Levenberg-Marquardt did not converge"
        );
    }

    Ok(LmResult {
        x,
        residual_norm: r_norm,
        iterations,
        status,
    })
}
