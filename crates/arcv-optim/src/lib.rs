#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The optimizer is decoupled from any camera model: callers describe their
//! problem through [`LeastSquaresProblem`] and the solver only ever sees a
//! parameter vector, a residual vector and a Jacobian.
//!
//! ```rust
//! use arcv_optim::{LeastSquaresProblem, LevenbergMarquardt, ProblemError};
//! use nalgebra::DVector;
//!
//! // Fit y = a * x + b to three points.
//! struct Line;
//!
//! impl LeastSquaresProblem for Line {
//!     fn num_residuals(&self) -> usize {
//!         3
//!     }
//!
//!     fn residuals(&self, p: &DVector<f64>) -> Result<DVector<f64>, ProblemError> {
//!         let xs = [0.0, 1.0, 2.0];
//!         let ys = [1.0, 3.0, 5.0];
//!         Ok(DVector::from_iterator(
//!             3,
//!             xs.iter().zip(ys.iter()).map(|(x, y)| p[0] * x + p[1] - y),
//!         ))
//!     }
//! }
//!
//! let mut params = DVector::from_vec(vec![0.0, 0.0]);
//! let result = LevenbergMarquardt::default().optimize(&Line, &mut params)?;
//! assert!(result.final_cost < 1e-12);
//! assert!((params[0] - 2.0).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod levenberg_marquardt;
mod problem;

pub use levenberg_marquardt::{
    LevenbergMarquardt, OptimizerError, OptimizerResult, TerminationReason,
};
pub use problem::{
    central_difference_step, finite_difference_jacobian, LeastSquaresProblem, ProblemError,
};
