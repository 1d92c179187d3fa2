//! Levenberg-Marquardt optimizer for non-linear least squares optimization
//!
//! The Levenberg-Marquardt algorithm is a trust-region method that combines
//! the advantages of gradient descent and Gauss-Newton methods. It solves
//! the damped normal equations: (J^T J + λ diag(J^T J)) δ = -J^T r

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::problem::{LeastSquaresProblem, ProblemError};

/// Errors that can occur during optimization.
#[derive(Debug, Error, PartialEq)]
pub enum OptimizerError {
    /// Problem-related error
    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),

    /// The problem has no parameters to optimize.
    #[error("Problem has no parameters")]
    EmptyProblem,

    /// Numerical instability detected
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Result of an optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerResult {
    /// Cost (sum of squared residuals) at the initial parameters
    pub initial_cost: f64,
    /// Final cost (sum of squared residuals)
    pub final_cost: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Reason for termination
    pub termination_reason: TerminationReason,
}

impl OptimizerResult {
    /// Whether the optimizer stopped on one of its convergence criteria.
    pub fn converged(&self) -> bool {
        matches!(
            self.termination_reason,
            TerminationReason::CostConverged
                | TerminationReason::GradientConverged
                | TerminationReason::StepConverged
        )
    }
}

/// Reason why the optimizer terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Converged: relative cost change below tolerance
    CostConverged,
    /// Converged: gradient norm below tolerance
    GradientConverged,
    /// Converged: step norm below tolerance
    StepConverged,
    /// Maximum iterations reached
    MaxIterations,
    /// Lambda exceeded maximum (no further decrease possible)
    LambdaMaxExceeded,
}

/// Levenberg-Marquardt optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevenbergMarquardt {
    /// Initial damping parameter
    pub lambda_init: f64,
    /// Maximum damping parameter
    pub lambda_max: f64,
    /// Factor for lambda adaptation
    pub lambda_factor: f64,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Convergence threshold for the relative cost change
    pub cost_tolerance: f64,
    /// Convergence threshold for the gradient infinity norm
    pub gradient_tolerance: f64,
    /// Convergence threshold for the step norm relative to the parameter norm
    pub step_tolerance: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            lambda_init: 1e-3,
            lambda_max: 1e10,
            lambda_factor: 10.0,
            max_iterations: 50,
            cost_tolerance: 1e-12,
            gradient_tolerance: 1e-12,
            step_tolerance: 1e-12,
        }
    }
}

impl LevenbergMarquardt {
    /// Smallest value used for a diagonal entry of the damping matrix.
    const MIN_DIAGONAL: f64 = 1e-9;

    /// Smallest damping value after a successful step.
    const LAMBDA_MIN: f64 = 1e-15;

    /// Create a new optimizer with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Optimize the given problem in place.
    ///
    /// # Arguments
    ///
    /// * `problem` - The optimization problem to solve
    /// * `params` - Initial parameters, overwritten with the best parameters found
    ///
    /// # Returns
    ///
    /// Optimization result containing initial and final cost, iterations, and termination reason.
    ///
    /// # Errors
    ///
    /// Returns an error if the problem is empty or if its residuals or Jacobian
    /// cannot be evaluated at the initial parameters.
    pub fn optimize<P: LeastSquaresProblem + ?Sized>(
        &self,
        problem: &P,
        params: &mut DVector<f64>,
    ) -> Result<OptimizerResult, OptimizerError> {
        if params.is_empty() {
            return Err(OptimizerError::EmptyProblem);
        }

        let mut residuals = Self::evaluate(problem, params)?;
        let mut cost = residuals.norm_squared();
        let initial_cost = cost;

        let (mut jtj, mut jtr) = Self::build_normal_equations(problem, params, &residuals)?;

        let mut lambda = self.lambda_init;
        let mut iterations = 0;

        let finish = |cost: f64, iterations: usize, reason: TerminationReason| {
            log::debug!(
                "LM finished after {} iterations: cost {:.6e} -> {:.6e} ({:?})",
                iterations,
                initial_cost,
                cost,
                reason
            );
            Ok(OptimizerResult {
                initial_cost,
                final_cost: cost,
                iterations,
                termination_reason: reason,
            })
        };

        loop {
            if jtr.amax() < self.gradient_tolerance {
                return finish(cost, iterations, TerminationReason::GradientConverged);
            }

            if iterations >= self.max_iterations {
                return finish(cost, iterations, TerminationReason::MaxIterations);
            }
            iterations += 1;

            let Some(delta) = Self::solve_damped_system(&jtj, &jtr, lambda) else {
                // singular even with damping
                lambda *= self.lambda_factor;
                if lambda > self.lambda_max {
                    return finish(cost, iterations, TerminationReason::LambdaMaxExceeded);
                }
                continue;
            };

            if delta.norm() <= self.step_tolerance * (params.norm() + self.step_tolerance) {
                return finish(cost, iterations, TerminationReason::StepConverged);
            }

            let candidate = &*params + &delta;
            let candidate_residuals = match Self::evaluate(problem, &candidate) {
                Ok(r) => Some(r),
                Err(ProblemError::NonFiniteResidual { .. }) => None,
                Err(e) => return Err(e.into()),
            };

            match candidate_residuals {
                Some(r) if r.norm_squared() < cost => {
                    let new_cost = r.norm_squared();
                    let relative_change = (cost - new_cost) / cost;

                    *params = candidate;
                    residuals = r;
                    cost = new_cost;
                    lambda = (lambda / self.lambda_factor).max(Self::LAMBDA_MIN);

                    log::debug!(
                        "LM iteration {}: cost {:.6e}, lambda {:.1e}",
                        iterations,
                        cost,
                        lambda
                    );

                    if relative_change < self.cost_tolerance {
                        return finish(cost, iterations, TerminationReason::CostConverged);
                    }

                    (jtj, jtr) = Self::build_normal_equations(problem, params, &residuals)?;
                }
                _ => {
                    // reject the step and increase damping
                    lambda *= self.lambda_factor;
                    if lambda > self.lambda_max {
                        return finish(cost, iterations, TerminationReason::LambdaMaxExceeded);
                    }
                }
            }
        }
    }

    /// Evaluate residuals and check their dimension and finiteness.
    fn evaluate<P: LeastSquaresProblem + ?Sized>(
        problem: &P,
        params: &DVector<f64>,
    ) -> Result<DVector<f64>, ProblemError> {
        let r = problem.residuals(params)?;
        if r.len() != problem.num_residuals() {
            return Err(ProblemError::DimensionMismatch {
                expected: problem.num_residuals(),
                actual: r.len(),
            });
        }
        if let Some(index) = r.iter().position(|v| !v.is_finite()) {
            return Err(ProblemError::NonFiniteResidual { index });
        }
        Ok(r)
    }

    /// Build the normal equations J^T J and J^T r.
    fn build_normal_equations<P: LeastSquaresProblem + ?Sized>(
        problem: &P,
        params: &DVector<f64>,
        residuals: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DVector<f64>), OptimizerError> {
        let jac = problem.jacobian(params)?;
        if jac.nrows() != residuals.len() {
            return Err(ProblemError::DimensionMismatch {
                expected: residuals.len(),
                actual: jac.nrows(),
            }
            .into());
        }
        if jac.ncols() != params.len() {
            return Err(ProblemError::DimensionMismatch {
                expected: params.len(),
                actual: jac.ncols(),
            }
            .into());
        }
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(OptimizerError::NumericalInstability(
                "Jacobian contains non-finite values".to_string(),
            ));
        }

        Ok((jac.tr_mul(&jac), jac.tr_mul(residuals)))
    }

    /// Solve the damped system (J^T J + λ diag(J^T J)) δ = -J^T r.
    fn solve_damped_system(
        jtj: &DMatrix<f64>,
        jtr: &DVector<f64>,
        lambda: f64,
    ) -> Option<DVector<f64>> {
        let mut h = jtj.clone();
        for i in 0..h.nrows() {
            h[(i, i)] += lambda * jtj[(i, i)].max(Self::MIN_DIAGONAL);
        }

        let rhs = -jtr;
        let delta = match h.clone().cholesky() {
            Some(chol) => chol.solve(&rhs),
            None => h.lu().solve(&rhs)?,
        };

        delta.iter().all(|v| v.is_finite()).then_some(delta)
    }
}
