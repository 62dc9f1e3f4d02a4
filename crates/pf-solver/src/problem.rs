//! Problem definition for Newton solves.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::finite_difference_jacobian;
use nalgebra::{DMatrix, DVector};

/// Box bounds on the unknown vector. Infinite entries leave a side open.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl Bounds {
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> SolverResult<Self> {
        if lower.len() != upper.len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "bound lengths differ: {} lower, {} upper",
                    lower.len(),
                    upper.len()
                ),
            });
        }
        if lower.iter().zip(upper.iter()).any(|(lo, hi)| lo > hi) {
            return Err(SolverError::ProblemSetup {
                what: "lower bound above upper bound".to_string(),
            });
        }
        Ok(Self { lower, upper })
    }

    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: DVector::from_element(n, f64::NEG_INFINITY),
            upper: DVector::from_element(n, f64::INFINITY),
        }
    }

    /// Clamp `x` into the box in place.
    pub fn project(&self, x: &mut DVector<f64>) {
        for i in 0..x.len().min(self.lower.len()) {
            x[i] = x[i].max(self.lower[i]).min(self.upper[i]);
        }
    }
}

/// Square nonlinear system `r(x) = 0`.
///
/// `residuals` takes `&mut self` because evaluating a segment writes its
/// condition arrays.
pub trait NonlinearSystem {
    fn dimension(&self) -> usize;

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;

    /// Jacobian at `x` given `r = residuals(x)`. Defaults to forward
    /// differences.
    fn jacobian(
        &mut self,
        x: &DVector<f64>,
        r: &DVector<f64>,
        epsilon: f64,
    ) -> SolverResult<DMatrix<f64>> {
        finite_difference_jacobian(x, r, |y| self.residuals(y), epsilon)
    }

    fn bounds(&self) -> Option<Bounds> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_clamps() {
        let b = Bounds::new(
            DVector::from_vec(vec![0.0, f64::NEG_INFINITY]),
            DVector::from_vec(vec![1.0, 2.0]),
        )
        .unwrap();
        let mut x = DVector::from_vec(vec![-3.0, 5.0]);
        b.project(&mut x);
        assert_eq!(x.as_slice(), &[0.0, 2.0]);
    }

    #[test]
    fn inverted_bounds_rejected() {
        let r = Bounds::new(DVector::from_element(1, 2.0), DVector::from_element(1, 1.0));
        assert!(r.is_err());
    }
}
