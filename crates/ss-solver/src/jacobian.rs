//! Finite difference Jacobian computation.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use ss_core::Real;

/// Differencing scheme used to estimate Jacobians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JacobianScheme {
    /// One extra evaluation per column, error O(h).
    #[default]
    Forward,
    /// Two extra evaluations per column, error O(h^2).
    Central,
}

impl JacobianScheme {
    /// Relative step: `sqrt(eps)` for forward, `cbrt(eps)` for central.
    pub fn relative_step(&self) -> Real {
        match self {
            JacobianScheme::Forward => Real::EPSILON.sqrt(),
            JacobianScheme::Central => Real::EPSILON.cbrt(),
        }
    }

    pub fn jacobian<F>(&self, x: &DVector<Real>, f: F) -> SolverResult<DMatrix<Real>>
    where
        F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>>,
    {
        let epsilon = self.relative_step();
        match self {
            JacobianScheme::Forward => finite_difference_jacobian(x, f, epsilon),
            JacobianScheme::Central => central_difference_jacobian(x, f, epsilon),
        }
    }

    /// Like [`JacobianScheme::jacobian`], reusing a known value `f_x = f(x)`.
    pub fn jacobian_at<F>(
        &self,
        x: &DVector<Real>,
        f_x: &DVector<Real>,
        f: F,
    ) -> SolverResult<DMatrix<Real>>
    where
        F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>>,
    {
        let epsilon = self.relative_step();
        match self {
            JacobianScheme::Forward => forward_difference_from(x, f_x, f, epsilon),
            JacobianScheme::Central => central_difference_jacobian(x, f, epsilon),
        }
    }
}

/// Step for coordinate `xj`, scaled by `max(|xj|, 1)`.
///
/// The step is rounded so that `xj + dx` is exactly representable.
fn step_for(xj: Real, epsilon: Real) -> Real {
    let dx = epsilon * xj.abs().max(1.0);
    (xj + dx) - xj
}

fn check_rows(f_value: &DVector<Real>, m: usize) -> SolverResult<()> {
    if f_value.len() != m {
        return Err(SolverError::shape("residual length", m, f_value.len()));
    }
    Ok(())
}

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by dx and computes (f(x+dx) - f(x))/dx.
/// A column that comes out non-finite is retried as a backward difference.
pub fn finite_difference_jacobian<F>(
    x: &DVector<Real>,
    f: F,
    epsilon: Real,
) -> SolverResult<DMatrix<Real>>
where
    F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>>,
{
    let f_x = f(x)?;
    forward_difference_from(x, &f_x, &f, epsilon)
}

/// Forward differences around a point whose function value is already known.
pub fn forward_difference_from<F>(
    x: &DVector<Real>,
    f_x: &DVector<Real>,
    f: F,
    epsilon: Real,
) -> SolverResult<DMatrix<Real>>
where
    F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>>,
{
    let n = x.len();
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);
    let mut x_perturbed = x.clone();

    for j in 0..n {
        let dx = step_for(x[j], epsilon);
        x_perturbed[j] = x[j] + dx;

        let f_perturbed = f(&x_perturbed)?;
        check_rows(&f_perturbed, m)?;
        let mut column = (f_perturbed - f_x) / dx;

        if !is_finite(&column) {
            column = backward_column(&mut x_perturbed, x, f_x, &f, j, dx)?;
        }
        jac.set_column(j, &column);

        x_perturbed[j] = x[j];
    }

    Ok(jac)
}

fn is_finite(v: &DVector<Real>) -> bool {
    v.iter().all(|vi| vi.is_finite())
}

/// `(f(x) - f(x - dx e_j)) / dx`, for columns whose forward point leaves the
/// function's domain. Leaves `x_shifted[j]` at `x[j] - dx`.
fn backward_column<F>(
    x_shifted: &mut DVector<Real>,
    x: &DVector<Real>,
    f_x: &DVector<Real>,
    f: &F,
    j: usize,
    dx: Real,
) -> SolverResult<DVector<Real>>
where
    F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>>,
{
    x_shifted[j] = x[j] - dx;
    let f_minus = f(&*x_shifted)?;
    check_rows(&f_minus, f_x.len())?;
    Ok((f_x - f_minus) / dx)
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
///
/// Falls back to a one-sided difference when one of the two points is not finite.
pub fn central_difference_jacobian<F>(
    x: &DVector<Real>,
    f: F,
    epsilon: Real,
) -> SolverResult<DMatrix<Real>>
where
    F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);
    let mut x_shifted = x.clone();

    for j in 0..n {
        let dx = step_for(x[j], epsilon);

        x_shifted[j] = x[j] + dx;
        let f_plus = f(&x_shifted)?;
        check_rows(&f_plus, m)?;

        x_shifted[j] = x[j] - dx;
        let f_minus = f(&x_shifted)?;
        check_rows(&f_minus, m)?;

        // On a domain edge only one side may be usable.
        let column = if is_finite(&f_plus) && is_finite(&f_minus) {
            (f_plus - f_minus) / (2.0 * dx)
        } else if is_finite(&f_plus) {
            (f_plus - &f_x) / dx
        } else {
            (&f_x - f_minus) / dx
        };
        jac.set_column(j, &column);
        x_shifted[j] = x[j];
    }

    Ok(jac)
}
