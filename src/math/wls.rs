//! Weighted least squares solver.
//!
//! Each IRLS iteration solves a problem of the form:
//!
//! ```text
//! minimize Σ w_i (z_i - x_i^T β)^2
//! ```
//!
//! for the working response `z` and working weights `w` of the current
//! iteration.
//!
//! Implementation choices:
//! - Rows of the design are scaled by `sqrt(w_i)`; callers scale the working
//!   response the same way, turning the problem into ordinary least squares.
//! - We use SVD to solve the least-squares problem robustly even when the
//!   design matrix is tall (more rows than columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - The parameter dimension is tiny (1–7 columns), so SVD cost is negligible
//!   next to building the design matrix.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Solve a least squares problem using SVD.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, AppError> {
    // SVD solve with a relaxed tolerance ladder. Near-collinear columns can
    // appear during IRLS when working weights collapse toward zero, so we
    // accept progressively looser tolerances before giving up.
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Ok(beta);
            }
        }
    }

    Err(AppError::numeric(
        "Weighted least-squares system is too ill-conditioned to solve.",
    ))
}

/// Scale design rows by `sqrt(w_i)` in place.
///
/// # Panics
/// Panics if dimensions disagree; callers size these together.
pub fn apply_sqrt_weights(x: &mut DMatrix<f64>, weights: &[f64]) {
    let n = x.nrows();
    assert_eq!(n, weights.len());

    for i in 0..n {
        let sw = weights[i].max(0.0).sqrt();
        for j in 0..x.ncols() {
            x[(i, j)] *= sw;
        }
    }
}
