//! High-level steady-state interface.

use crate::error::{SolverError, SolverResult};
use crate::force::ForceSpec;
use crate::jacobian::JacobianScheme;
use crate::levenberg::{LmConfig, LmStatus, levenberg_marquardt};
use crate::rank::{RankDiagnostic, diagnose_rank};
use crate::residual::SteadyStateEquations;
use nalgebra::DMatrix;
use ss_core::{Model, Real};
use tracing::debug;

/// Steady-state solver configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SteadyStateConfig {
    /// Root solver settings
    pub solver: LmConfig,
    /// Scheme for the Jacobian at the calibrated guess (rank check and
    /// [`steady_state_jacobian`])
    pub diagnostic_jacobian: JacobianScheme,
    /// Singular value threshold for the rank check; `None` picks
    /// `max(m, n) * sigma_max * eps`
    pub rank_tolerance: Option<Real>,
}

/// How the solve went.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveReport {
    pub status: LmStatus,
    /// Residual norm at the returned point
    pub residual_norm: Real,
    /// Accepted solver steps
    pub iterations: usize,
    /// Rank check at the calibrated guess
    pub rank: RankDiagnostic,
}

/// Steady-state states and controls, with the solve report.
///
/// When `report.status` is not converged, the vectors hold the best iterate
/// found rather than a root.
#[derive(Clone, Debug, PartialEq)]
pub struct SteadyState {
    pub states: Vec<Real>,
    pub controls: Vec<Real>,
    pub report: SolveReport,
}

impl SteadyState {
    pub fn is_converged(&self) -> bool {
        self.report.status.is_converged()
    }

    /// True when the rank check found the steady state locally indeterminate,
    /// or could not compute the rank.
    pub fn is_indeterminate(&self) -> bool {
        self.report.rank.is_indeterminate()
    }

    pub fn residual_norm(&self) -> Real {
        self.report.residual_norm
    }

    /// Keep converged results, turn anything else into an error.
    pub fn into_converged(self) -> SolverResult<SteadyState> {
        if self.is_converged() {
            Ok(self)
        } else {
            Err(SolverError::ConvergenceFailed {
                what: format!(
                    "{} after {} iterations, residual = {}",
                    self.report.status, self.report.iterations, self.report.residual_norm
                ),
            })
        }
    }
}

/// Find the steady state with the default configuration.
///
/// `shocks = None` is the zero shock vector. `force` optionally pins states.
pub fn find_steady_state<M: Model + ?Sized>(
    model: &M,
    shocks: Option<&[Real]>,
    force: Option<&ForceSpec>,
) -> SolverResult<SteadyState> {
    find_steady_state_with_config(model, shocks, force, &SteadyStateConfig::default())
}

/// Find the steady state `(s, x)` with `S(s, x, e, p) = s` and
/// `r(s, x, s, x, p) = 0`.
///
/// This function:
/// 1. Validates calibration, shocks and force specification
/// 2. Builds the residual and estimates its Jacobian at the calibrated guess
/// 3. Checks the Jacobian's rank (a deficient rank is reported, not fatal)
/// 4. Runs Levenberg-Marquardt from the calibrated guess
/// 5. Splits the result into states and controls
///
/// Non-convergence is reported in [`SteadyState::report`]; use
/// [`SteadyState::into_converged`] to treat it as an error.
pub fn find_steady_state_with_config<M: Model + ?Sized>(
    model: &M,
    shocks: Option<&[Real]>,
    force: Option<&ForceSpec>,
    config: &SteadyStateConfig,
) -> SolverResult<SteadyState> {
    let equations = SteadyStateEquations::new(model, shocks, force)?;
    let z0 = equations.initial_guess();
    debug!(
        unknowns = equations.unknowns(),
        equations = equations.equations(),
        pinned = equations.constraints().len(),
        "solving for steady state"
    );

    let residual_fn = |z: &nalgebra::DVector<Real>| equations.residual(z);

    let jac = config.diagnostic_jacobian.jacobian(&z0, residual_fn)?;
    let rank = diagnose_rank(&jac, equations.unknowns(), config.rank_tolerance);

    let result = levenberg_marquardt(z0, residual_fn, &config.solver)?;
    let (states, controls) = equations.split(&result.x);

    Ok(SteadyState {
        states,
        controls,
        report: SolveReport {
            status: result.status,
            residual_norm: result.residual_norm,
            iterations: result.iterations,
            rank,
        },
    })
}

/// Jacobian of the steady-state residual at the calibrated guess.
///
/// Nothing is solved. Rows follow the residual layout (transition gaps,
/// arbitrage residuals, pinned states); columns follow `[states, controls]`.
pub fn steady_state_jacobian<M: Model + ?Sized>(
    model: &M,
    shocks: Option<&[Real]>,
    force: Option<&ForceSpec>,
) -> SolverResult<DMatrix<Real>> {
    steady_state_jacobian_with_config(model, shocks, force, &SteadyStateConfig::default())
}

pub fn steady_state_jacobian_with_config<M: Model + ?Sized>(
    model: &M,
    shocks: Option<&[Real]>,
    force: Option<&ForceSpec>,
    config: &SteadyStateConfig,
) -> SolverResult<DMatrix<Real>> {
    let equations = SteadyStateEquations::new(model, shocks, force)?;
    let z0 = equations.initial_guess();
    config
        .diagnostic_jacobian
        .jacobian(&z0, |z: &nalgebra::DVector<Real>| equations.residual(z))
}
