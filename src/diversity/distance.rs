//! Pairwise distance kernel.
//!
//! Computes all-pairs distances between two sample sets under a selectable
//! [`Metric`]. The output is addressed as `[row-of-b, row-of-a]`: for
//! `a` with `N` rows and `b` with `M` rows the result is `M x N` and
//! `out[[j, i]]` is the distance between `a.row(i)` and `b.row(j)`.
//! The diversity aggregator sums columns of this matrix, so the layout is
//! part of the contract.

use ndarray::{concatenate, Array2, ArrayView1, Axis};
use tracing::debug;

use crate::error::DiversityError;

use super::linalg::{covariance, invert};
use super::metric::Metric;

/// Computes the all-pairs distance matrix between `a` and `b`.
///
/// # Arguments
///
/// * `a` - First sample set, `N x D`.
/// * `b` - Second sample set, `M x D`.
/// * `metric` - Metric to apply to every pair.
///
/// # Returns
///
/// An `M x N` matrix with `out[[j, i]] = d(a[i], b[j])`. All entries are
/// non-negative and never NaN.
///
/// # Errors
///
/// - `DiversityError::ShapeMismatch` if either set is empty, has zero
///   columns, or the column counts differ.
/// - `DiversityError::NonFiniteInput` if either set contains NaN or an
///   infinity.
/// - `DiversityError::SingularCovariance` for [`Metric::Mahalanobis`] when
///   the pooled sample has no more rows than features, or its covariance
///   cannot be inverted.
///
/// # Example
///
/// ```
/// use eda_score::diversity::{distance, Metric};
/// use ndarray::array;
///
/// let a = array![[0.0, 0.0], [3.0, 4.0]];
/// let dist = distance(&a, &a, Metric::Euclidean).unwrap();
/// assert_eq!(dist[[1, 0]], 5.0);
/// ```
pub fn distance(
    a: &Array2<f64>,
    b: &Array2<f64>,
    metric: Metric,
) -> Result<Array2<f64>, DiversityError> {
    validate_pair(a, b)?;

    debug!(
        metric = %metric,
        a_rows = a.nrows(),
        b_rows = b.nrows(),
        features = a.ncols(),
        "Computing distance matrix"
    );

    match metric {
        Metric::Euclidean => Ok(pairwise(a, b, euclidean_distance)),
        Metric::Cosine => Ok(pairwise(a, b, cosine_distance)),
        Metric::Mahalanobis => {
            let inverse_covariance = pooled_inverse_covariance(a, b)?;
            Ok(pairwise(a, b, |x, y| {
                mahalanobis_distance(x, y, &inverse_covariance)
            }))
        }
    }
}

/// Euclidean (L2) distance between two rows.
///
/// Differences are scaled by their largest magnitude before squaring, so
/// rows near the top of the `f64` range do not overflow.
pub fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let scale = a
        .iter()
        .zip(b.iter())
        .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()));
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }

    scale
        * a.iter()
            .zip(b.iter())
            .map(|(x, y)| ((x - y) / scale).powi(2))
            .sum::<f64>()
            .sqrt()
}

/// Cosine distance `1 - cos(a, b)` between two rows.
///
/// When either row has zero norm the angle is undefined; the distance is
/// then `1.0`, the value for orthogonal vectors. Each row is scaled by its
/// largest magnitude before the products are taken, and the result is
/// clamped to `[0, 2]` so rounding never yields a negative distance.
pub fn cosine_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    if scale_a == 0.0 || scale_b == 0.0 {
        return 1.0;
    }

    let a = a.mapv(|v| v / scale_a);
    let b = b.mapv(|v| v / scale_b);
    let dot = dot_product(a.view(), b.view());
    let norm_a = dot_product(a.view(), a.view()).sqrt();
    let norm_b = dot_product(b.view(), b.view()).sqrt();

    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}

/// Mahalanobis distance between two rows under a precomputed inverse
/// covariance matrix.
///
/// Computes `sqrt(d · VI · dᵗ)` with `d = a - b`. A quadratic form that
/// rounds slightly below zero is treated as zero.
pub fn mahalanobis_distance(
    a: ArrayView1<f64>,
    b: ArrayView1<f64>,
    inverse_covariance: &Array2<f64>,
) -> f64 {
    let diff = &a - &b;
    let quadratic = diff.dot(&inverse_covariance.dot(&diff));
    if quadratic < 0.0 {
        0.0
    } else {
        quadratic.sqrt()
    }
}

/// Inverse of the feature covariance of `a` stacked over `b`.
fn pooled_inverse_covariance(
    a: &Array2<f64>,
    b: &Array2<f64>,
) -> Result<Array2<f64>, DiversityError> {
    let rows = a.nrows() + b.nrows();
    let features = a.ncols();
    if rows <= features {
        return Err(DiversityError::SingularCovariance(format!(
            "pooled sample has {} rows for {} features; need more rows than features",
            rows, features
        )));
    }

    let pooled = concatenate(Axis(0), &[a.view(), b.view()])
        .map_err(|e| DiversityError::shape("pooled sample", features, e))?;

    invert(&covariance(&pooled)?)
}

/// Fills an `M x N` matrix with `f(a[i], b[j])` at `[j, i]`.
fn pairwise<F>(a: &Array2<f64>, b: &Array2<f64>, f: F) -> Array2<f64>
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64,
{
    let mut out = Array2::<f64>::zeros((b.nrows(), a.nrows()));

    for (i, row_a) in a.outer_iter().enumerate() {
        for (j, row_b) in b.outer_iter().enumerate() {
            out[[j, i]] = f(row_a, row_b);
        }
    }

    out
}

fn dot_product(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn max_abs(row: ArrayView1<f64>) -> f64 {
    row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

fn validate_pair(a: &Array2<f64>, b: &Array2<f64>) -> Result<(), DiversityError> {
    if a.ncols() == 0 {
        return Err(DiversityError::shape(
            "distance",
            "at least 1 feature",
            "0 features",
        ));
    }
    if a.ncols() != b.ncols() {
        return Err(DiversityError::shape(
            "distance",
            format!("{} features", a.ncols()),
            format!("{} features", b.ncols()),
        ));
    }
    if a.nrows() == 0 || b.nrows() == 0 {
        return Err(DiversityError::shape(
            "distance",
            "at least 1 row in each sample set",
            format!("{} and {} rows", a.nrows(), b.nrows()),
        ));
    }
    for (name, set) in [("a", a), ("b", b)] {
        if let Some((index, _)) = set
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(DiversityError::NonFiniteInput(format!(
                "row {} of {} contains a non-finite value",
                index / set.ncols(),
                name
            )));
        }
    }
    Ok(())
}
