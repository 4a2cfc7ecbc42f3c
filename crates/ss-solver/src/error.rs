//! Error types for steady-state solving.

use ss_core::SsError;
use thiserror::Error;

/// Errors that can occur while assembling or solving the steady-state system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Invalid constraint: {what}")]
    InvalidConstraint { what: String },

    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error(transparent)]
    Model(#[from] SsError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub(crate) fn shape(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        SolverError::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}
