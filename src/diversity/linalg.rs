//! Small dense linear-algebra helpers for the Mahalanobis metric.
//!
//! Only what the kernel needs: the sample covariance of a matrix whose
//! columns are variables, and the inverse of a covariance matrix.

use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array2, Axis};

use crate::error::DiversityError;

/// Smallest share of a feature's variance that must remain unexplained by
/// the preceding features for the matrix to count as invertible.
const RESIDUAL_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Tolerance when checking that a matrix is symmetric, relative to its
/// unit-diagonal form.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Computes the unbiased sample covariance of `data`, treating columns
/// as variables and rows as observations.
///
/// The result is `D x D` for an `N x D` input, normalized by `N - 1`.
///
/// # Errors
///
/// Returns `DiversityError::SingularCovariance` when fewer than two rows
/// are supplied, since the estimator is undefined.
pub fn covariance(data: &Array2<f64>) -> Result<Array2<f64>, DiversityError> {
    let n = data.nrows();
    if n < 2 {
        return Err(DiversityError::SingularCovariance(format!(
            "covariance needs at least 2 observations, got {}",
            n
        )));
    }

    let mean = data
        .mean_axis(Axis(0))
        .ok_or_else(|| DiversityError::SingularCovariance("empty sample".to_string()))?;
    let centered = data - &mean;

    Ok(centered.t().dot(&centered) / (n as f64 - 1.0))
}

/// Inverts a symmetric positive definite matrix such as a covariance.
///
/// The matrix is first rescaled to unit diagonal (a correlation matrix),
/// so the rank test below does not depend on the units of each feature.
/// The rescaled matrix is factored with a Cholesky decomposition and the
/// inverse is scaled back.
///
/// # Errors
///
/// - `DiversityError::ShapeMismatch` if the matrix is empty, not square or
///   not symmetric.
/// - `DiversityError::SingularCovariance` if it has a non-finite entry, a
///   non-positive diagonal entry, or a row that is (numerically) a linear
///   combination of the others.
pub fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>, DiversityError> {
    let n = matrix.nrows();
    if n != matrix.ncols() || n == 0 {
        return Err(DiversityError::shape(
            "matrix inversion",
            "a non-empty square matrix",
            format!("{}x{}", matrix.nrows(), matrix.ncols()),
        ));
    }

    if let Some(value) = matrix.iter().find(|v| !v.is_finite()) {
        return Err(DiversityError::SingularCovariance(format!(
            "matrix has non-finite entry {}",
            value
        )));
    }

    let mut scales = Vec::with_capacity(n);
    for i in 0..n {
        let variance = matrix[[i, i]];
        if variance <= 0.0 {
            return Err(DiversityError::SingularCovariance(format!(
                "diagonal entry {} is {}",
                i, variance
            )));
        }
        scales.push(variance.sqrt().recip());
    }

    let correlation = DMatrix::from_fn(n, n, |i, j| matrix[[i, j]] * scales[i] * scales[j]);
    for i in 0..n {
        for j in (i + 1)..n {
            if (correlation[(i, j)] - correlation[(j, i)]).abs() > SYMMETRY_TOLERANCE {
                return Err(DiversityError::shape(
                    "matrix inversion",
                    "a symmetric matrix",
                    format!("entries ({}, {}) and ({}, {}) differ", i, j, j, i),
                ));
            }
        }
    }

    let cholesky = Cholesky::new(correlation).ok_or_else(|| {
        DiversityError::SingularCovariance("matrix is not positive definite".to_string())
    })?;

    // Squared Cholesky diagonal is the variance left after regressing each
    // feature on the ones before it
    if let Some((feature, residual)) = cholesky
        .l_dirty()
        .diagonal()
        .iter()
        .map(|l| l * l)
        .enumerate()
        .find(|(_, residual)| *residual < RESIDUAL_VARIANCE_TOLERANCE)
    {
        return Err(DiversityError::SingularCovariance(format!(
            "feature {} is a linear combination of the others (residual variance {:.3e})",
            feature, residual
        )));
    }

    let inverse = cholesky.inverse();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        inverse[(i, j)] * scales[i] * scales[j]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "Expected {}, got {}", y, x);
        }
    }

    #[test]
    fn test_covariance_matches_unbiased_estimator() {
        let data = array![[1.0, 2.0], [2.0, 4.0], [3.0, 7.0]];
        let cov = covariance(&data).expect("covariance");

        // var(x) = 1, var(y) = 6.333.., cov(x, y) = 2.5
        let expected = array![[1.0, 2.5], [2.5, 19.0 / 3.0]];
        assert_close(&cov, &expected, 1e-12);
    }

    #[test]
    fn test_covariance_single_row() {
        let data = array![[1.0, 2.0]];
        assert!(matches!(
            covariance(&data),
            Err(DiversityError::SingularCovariance(_))
        ));
    }

    #[test]
    fn test_invert_identity() {
        let eye = Array2::<f64>::eye(3);
        let inv = invert(&eye).expect("identity is invertible");
        assert_close(&inv, &eye, 1e-12);
    }

    #[test]
    fn test_invert_mixed_feature_scales() {
        // Variances twelve orders of magnitude apart are still well conditioned
        let data = array![[1e4, 1e-3], [-1e4, -1e-3], [1e4, -1e-3], [-1e4, 1e-3]];
        let cov = covariance(&data).expect("covariance");
        let inv = invert(&cov).expect("diagonal covariance is invertible");

        assert!((inv[[0, 0]] * cov[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((inv[[1, 1]] * cov[[1, 1]] - 1.0).abs() < 1e-12);
        assert!(inv[[0, 1]].abs() < 1e-12);
    }

    #[test]
    fn test_invert_rejects_non_finite() {
        let m = array![[f64::NAN, 0.0], [0.0, 1.0]];
        assert!(matches!(
            invert(&m),
            Err(DiversityError::SingularCovariance(_))
        ));

        let m = array![[1.0, f64::INFINITY], [f64::INFINITY, 1.0]];
        assert!(matches!(
            invert(&m),
            Err(DiversityError::SingularCovariance(_))
        ));
    }

    #[test]
    fn test_invert_non_symmetric() {
        let m = array![[2.0, 1.0], [0.0, 2.0]];
        assert!(matches!(
            invert(&m),
            Err(DiversityError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_invert_symmetric_is_symmetric() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let inv = invert(&m).expect("invertible");
        assert_close(&inv, &inv.t().to_owned(), 1e-12);
        assert_close(&m.dot(&inv), &Array2::eye(3), 1e-12);
    }

    #[test]
    fn test_invert_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            invert(&m),
            Err(DiversityError::SingularCovariance(_))
        ));
    }

    #[test]
    fn test_invert_zero_matrix() {
        let m = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            invert(&m),
            Err(DiversityError::SingularCovariance(_))
        ));
    }

    #[test]
    fn test_invert_non_square() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            invert(&m),
            Err(DiversityError::ShapeMismatch { .. })
        ));
    }
}
