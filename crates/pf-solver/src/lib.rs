//! Newton solver for segment equilibrium problems.
//!
//! A [`NonlinearSystem`] maps a flat unknown vector to a residual vector of
//! the same length. [`solve_system`] drives the residual norm to tolerance
//! with a backtracking line search, optional box bounds and a damped
//! least-squares step when the Jacobian is singular.
//!
//! Non-convergence is not an error: the result carries `converged = false`
//! and the best iterate so the caller can decide what to do with it.

pub mod error;
pub mod jacobian;
pub mod newton;
pub mod problem;

pub use error::{SolverError, SolverResult};
pub use jacobian::{central_difference_jacobian, finite_difference_jacobian};
pub use newton::{NewtonConfig, NewtonResult, newton_solve, solve_system};
pub use problem::{Bounds, NonlinearSystem};
