//! Finite difference Jacobian computation.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};

/// Forward-difference Jacobian around `x` given `f_x = f(x)`.
///
/// Column j perturbs x[j] by `epsilon * max(|x[j]|, 1)`.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    mut f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let m = f_x.len();
    let mut jac = DMatrix::zeros(m, n);

    let mut x_perturbed = x.clone();
    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] = x[j] + dx;
        let f_perturbed = f(&x_perturbed)?;
        x_perturbed[j] = x[j];

        let df = (f_perturbed - f_x) / dx;
        jac.set_column(j, &df);
    }

    Ok(jac)
}

/// Central-difference Jacobian (twice the evaluations, second-order accurate).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    mut f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let mut jac: Option<DMatrix<f64>> = None;

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;

        let df = (f_plus - f_minus) / (2.0 * dx);
        jac.get_or_insert_with(|| DMatrix::zeros(df.len(), n))
            .set_column(j, &df);
    }

    Ok(jac.unwrap_or_else(|| DMatrix::zeros(0, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn jacobian_linear() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, 2.0 * x[0]))
        };
        let x = DVector::from_element(1, 3.0);
        let fx = DVector::from_element(1, 6.0);
        let jac = finite_difference_jacobian(&x, &fx, f, 1e-7).unwrap();
        assert_relative_eq!(jac[(0, 0)], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn jacobian_coupled() {
        // f = (x0 * x1, x0 + 3 x1)
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] * x[1], x[0] + 3.0 * x[1]]))
        };
        let x = DVector::from_vec(vec![2.0, 5.0]);
        let jac = central_difference_jacobian(&x, f, 1e-6).unwrap();
        assert_relative_eq!(jac[(0, 0)], 5.0, epsilon = 1e-6);
        assert_relative_eq!(jac[(0, 1)], 2.0, epsilon = 1e-6);
        assert_relative_eq!(jac[(1, 0)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(jac[(1, 1)], 3.0, epsilon = 1e-6);
    }
}
