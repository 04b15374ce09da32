//! Linear least squares solver.
//!
//! The curve fitter solves one small linear problem per iteration: the damped
//! Gauss-Newton step
//!
//! ```text
//! minimize ‖J δ - r‖² + λ ‖D δ‖²
//! ```
//!
//! written as an augmented system `[J; √λ D] δ = [r; 0]`. With at most five
//! columns an SVD is cheap, and it tolerates the near-collinear Jacobian columns the
//! logistic produces far from the inflection point.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped normal-equation step `(JᵀJ + λ D²) δ = Jᵀ r`.
///
/// `scale` holds the diagonal of `D`.
pub fn solve_damped_step(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let (n, p) = jac.shape();
    let mut aug = DMatrix::<f64>::zeros(n + p, p);
    let mut rhs = DVector::<f64>::zeros(n + p);

    aug.view_mut((0, 0), (n, p)).copy_from(jac);
    rhs.rows_mut(0, n).copy_from(residuals);

    let root = lambda.max(0.0).sqrt();
    for j in 0..p {
        aug[(n + j, j)] = root * scale[j];
    }

    solve_least_squares(&aug, &rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn damping_shrinks_the_step() {
        let j = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 1.0]);
        let r = DVector::from_row_slice(&[3.0, 3.0, 3.0]);
        let free = solve_damped_step(&j, &r, &[1.0], 0.0).unwrap();
        let damped = solve_damped_step(&j, &r, &[1.0], 3.0).unwrap();
        assert!((free[0] - 3.0).abs() < 1e-10);
        // (3 + 3) δ = 9
        assert!((damped[0] - 1.5).abs() < 1e-10);
    }
}
