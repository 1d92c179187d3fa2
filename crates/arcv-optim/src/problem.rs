//! Least-squares problem description.
//!
//! A problem maps a parameter vector to a residual vector. The Jacobian is
//! optional: the default implementation uses central finite differences.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Relative step used by the central-difference Jacobian.
const FD_RELATIVE_STEP: f64 = 1e-6;

/// Errors that can occur when evaluating a least-squares problem.
#[derive(Debug, Error, PartialEq)]
pub enum ProblemError {
    /// A vector or matrix has an unexpected dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A residual evaluated to NaN or infinity.
    #[error("Residual {index} is not finite")]
    NonFiniteResidual {
        /// Index of the offending residual
        index: usize,
    },

    /// Problem-specific evaluation failure.
    #[error("Residual evaluation failed: {0}")]
    Evaluation(String),
}

/// A non-linear least-squares problem `min_x ‖r(x)‖²`.
pub trait LeastSquaresProblem {
    /// Number of residuals returned by [`LeastSquaresProblem::residuals`].
    fn num_residuals(&self) -> usize;

    /// Evaluate the residual vector at `params`.
    fn residuals(&self, params: &DVector<f64>) -> Result<DVector<f64>, ProblemError>;

    /// Evaluate the Jacobian `∂r/∂x` at `params`, shape (num_residuals, params.len()).
    ///
    /// Defaults to central finite differences. Override it with an analytic
    /// Jacobian or with a finite-difference scheme that exploits sparsity.
    fn jacobian(&self, params: &DVector<f64>) -> Result<DMatrix<f64>, ProblemError> {
        finite_difference_jacobian(self, params)
    }
}

/// Step used to differentiate a parameter with value `x`.
pub fn central_difference_step(x: f64) -> f64 {
    FD_RELATIVE_STEP * x.abs().max(1.0)
}

/// Dense central-difference Jacobian of `problem` at `params`.
pub fn finite_difference_jacobian<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    params: &DVector<f64>,
) -> Result<DMatrix<f64>, ProblemError> {
    let m = problem.num_residuals();
    let n = params.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);

    let mut x = params.clone();
    for j in 0..n {
        let x0 = x[j];
        let h = central_difference_step(x0);

        x[j] = x0 + h;
        let r_plus = problem.residuals(&x)?;
        x[j] = x0 - h;
        let r_minus = problem.residuals(&x)?;
        x[j] = x0;

        if r_plus.len() != m || r_minus.len() != m {
            return Err(ProblemError::DimensionMismatch {
                expected: m,
                actual: r_plus.len().min(r_minus.len()),
            });
        }

        let inv_2h = 1.0 / (2.0 * h);
        for i in 0..m {
            jac[(i, j)] = (r_plus[i] - r_minus[i]) * inv_2h;
        }
    }

    Ok(jac)
}
