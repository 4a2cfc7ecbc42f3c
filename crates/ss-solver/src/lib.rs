//! Steady-state solver for discrete-time dynamic models.
//!
//! Finds states `s` and controls `x` such that the transition is stationary,
//! `S(s, x, e, p) = s`, and the arbitrage conditions hold, `r(s, x, s, x, p) = 0`,
//! for fixed shocks `e` and parameters `p`. Selected states can be pinned to
//! given values, which is how models with a unit root are handled.
//!
//! The residual is assembled from the model's functions, its Jacobian is
//! estimated by finite differences for a rank check, and a Levenberg-Marquardt
//! iteration drives it to zero starting from the calibration.

pub mod error;
pub mod force;
pub mod jacobian;
pub mod levenberg;
pub mod rank;
pub mod residual;
pub mod solve;

pub use error::{SolverError, SolverResult};
pub use force::{Constraint, Constraints, ForceSpec};
pub use jacobian::JacobianScheme;
pub use levenberg::{LmConfig, LmResult, LmStatus, levenberg_marquardt};
pub use rank::{RankDiagnostic, diagnose_rank, numerical_rank};
pub use residual::SteadyStateEquations;
pub use solve::{
    SolveReport, SteadyState, SteadyStateConfig, find_steady_state,
    find_steady_state_with_config, steady_state_jacobian, steady_state_jacobian_with_config,
};
