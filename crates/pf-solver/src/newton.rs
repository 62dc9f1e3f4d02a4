//! Newton solver with backtracking line search.

use crate::error::{SolverError, SolverResult};
use crate::problem::{Bounds, NonlinearSystem};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

/// Newton solver configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance on the residual infinity norm
    pub abs_tol: f64,
    /// Relative tolerance against the initial residual norm
    pub rel_tol: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Relative perturbation for finite-difference Jacobians
    pub fd_epsilon: f64,
    /// Levenberg-Marquardt damping used when the Jacobian is singular
    pub damping: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-9,
            rel_tol: 0.0,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
            fd_epsilon: 1e-7,
            damping: 1e-6,
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug, PartialEq)]
pub struct NewtonResult {
    /// Last iterate (the solution when converged)
    pub x: DVector<f64>,
    /// Residual at `x`
    pub residuals: DVector<f64>,
    /// Infinity norm of `residuals`
    pub residual_norm: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn inf_norm(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

fn ensure_finite(v: &DVector<f64>, what: &str) -> SolverResult<()> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(SolverError::Numeric {
            what: format!("non-finite {what}"),
        })
    }
}

/// Newton direction, falling back to damped least squares when LU fails.
fn newton_step(jac: &DMatrix<f64>, r: &DVector<f64>, damping: f64) -> SolverResult<DVector<f64>> {
    let rhs = -r;
    if let Some(dx) = jac.clone().lu().solve(&rhs) {
        if dx.iter().all(|v| v.is_finite()) {
            return Ok(dx);
        }
    }

    debug!("singular Jacobian, taking damped least-squares step");
    let jt = jac.transpose();
    let scale = jac.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    let n = jac.ncols();
    let normal = &jt * jac + DMatrix::identity(n, n) * (damping * scale * scale);
    normal
        .cholesky()
        .map(|c| c.solve(&(&jt * rhs)))
        .ok_or_else(|| SolverError::Numeric {
            what: "damped least-squares step failed".to_string(),
        })
}

/// Solve `system` from `x0`.
///
/// Returns `Err` only for setup and evaluation failures; running out of
/// iterations or stalling in the line search yields `converged = false`.
pub fn solve_system<S: NonlinearSystem + ?Sized>(
    system: &mut S,
    x0: DVector<f64>,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult> {
    let n = system.dimension();
    if x0.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!("initial guess has {} entries, system has {}", x0.len(), n),
        });
    }
    let bounds = system.bounds().unwrap_or_else(|| Bounds::unbounded(n));

    let mut x = x0;
    bounds.project(&mut x);
    let mut r = system.residuals(&x)?;
    ensure_finite(&r, "initial residual")?;
    if r.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!("{} residuals for {} unknowns", r.len(), n),
        });
    }
    let mut r_norm = inf_norm(&r);
    let r0_norm = r_norm;

    for iter in 0..config.max_iterations {
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            debug!(iterations = iter, residual = r_norm, "newton converged");
            return Ok(NewtonResult {
                x,
                residuals: r,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        let jac = system.jacobian(&x, &r, config.fd_epsilon)?;
        let dx = newton_step(&jac, &r, config.damping)?;

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..=config.max_line_search_iters {
            let mut x_new = &x + alpha * &dx;
            bounds.project(&mut x_new);
            let r_new = system.residuals(&x_new)?;
            let r_new_norm = inf_norm(&r_new);
            if r_new.iter().all(|v| v.is_finite()) && r_new_norm < r_norm {
                accepted = Some((x_new, r_new, r_new_norm));
                break;
            }
            alpha *= config.line_search_beta;
        }

        match accepted {
            Some((x_new, r_new, r_new_norm)) => {
                trace!(iteration = iter, alpha, residual = r_new_norm, "newton step");
                x = x_new;
                r = r_new;
                r_norm = r_new_norm;
            }
            None => {
                debug!(iteration = iter, residual = r_norm, "line search stalled");
                // Leave the system evaluated at the best iterate
                r = system.residuals(&x)?;
                return Ok(NewtonResult {
                    x,
                    residuals: r,
                    residual_norm: r_norm,
                    iterations: iter + 1,
                    converged: false,
                });
            }
        }
    }

    let converged = r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm;
    Ok(NewtonResult {
        x,
        residuals: r,
        residual_norm: r_norm,
        iterations: config.max_iterations,
        converged,
    })
}

struct ClosureSystem<F, J> {
    n: usize,
    residual_fn: F,
    jacobian_fn: J,
}

impl<F, J> NonlinearSystem for ClosureSystem<F, J>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: FnMut(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    fn dimension(&self) -> usize {
        self.n
    }

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        (self.residual_fn)(x)
    }

    fn jacobian(
        &mut self,
        x: &DVector<f64>,
        _r: &DVector<f64>,
        _epsilon: f64,
    ) -> SolverResult<DMatrix<f64>> {
        (self.jacobian_fn)(x)
    }
}

/// Closure form of [`solve_system`] with an analytic Jacobian.
pub fn newton_solve<F, J>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: FnMut(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    let mut system = ClosureSystem {
        n: x0.len(),
        residual_fn,
        jacobian_fn,
    };
    solve_system(&mut system, x0, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn simple_quadratic() {
        // x^2 - 4 = 0 from x = 3
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        };
        let jacobian = |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, 2.0 * x[0]))
        };
        let result =
            newton_solve(DVector::from_element(1, 3.0), residual, jacobian, &NewtonConfig::default())
                .unwrap();
        assert!(result.converged);
        assert_relative_eq!(result.x[0], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn singular_jacobian_uses_damped_step() {
        // Rank-deficient: only x0 + x1 is determined
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] + x[1] - 2.0, x[0] + x[1] - 2.0]))
        };
        let jacobian =
            |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> { Ok(DMatrix::from_element(2, 2, 1.0)) };
        let result = newton_solve(
            DVector::from_vec(vec![0.0, 0.0]),
            residual,
            jacobian,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert!(result.converged);
        assert_relative_eq!(result.x[0] + result.x[1], 2.0, epsilon = 1e-8);
    }

    #[test]
    fn exhausted_iterations_report_not_converged() {
        // No real root
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] + 1.0))
        };
        let jacobian = |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, 2.0 * x[0]))
        };
        let config = NewtonConfig {
            max_iterations: 5,
            ..NewtonConfig::default()
        };
        let result = newton_solve(DVector::from_element(1, 1.0), residual, jacobian, &config).unwrap();
        assert!(!result.converged);
        assert!(result.residual_norm >= 1.0);
    }

    #[test]
    fn wrong_dimension_is_setup_error() {
        let residual = |_: &DVector<f64>| -> SolverResult<DVector<f64>> { Ok(DVector::zeros(2)) };
        let jacobian = |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> { Ok(DMatrix::zeros(2, 2)) };
        let err = newton_solve(DVector::zeros(1), residual, jacobian, &NewtonConfig::default())
            .unwrap_err();
        assert!(matches!(err, SolverError::ProblemSetup { .. }));
    }
}
