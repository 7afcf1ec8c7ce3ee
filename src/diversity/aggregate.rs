//! Closeness-weighted diversity scores.
//!
//! Turns the self-distance matrix of a batch into one score per sample.
//! A sample's closeness is the reciprocal of its summed distance to every
//! sample in the batch; its score is the batch's total closeness divided
//! by twice its own. Isolated samples score high, samples inside dense
//! neighborhoods score low. Scores are relative to the batch they were
//! computed from.

use ndarray::{Array1, Array2, Axis};
use tracing::debug;

use crate::error::DiversityError;

use super::distance::distance;
use super::metric::Metric;

/// Computes the diversity score of every row in `data`.
///
/// # Arguments
///
/// * `data` - The batch to score, `N x D`.
/// * `metric` - Metric used for the self-distance matrix.
///
/// # Returns
///
/// A vector of `N` positive, finite scores.
///
/// # Errors
///
/// - `DiversityError::DegenerateBatch` if the batch has fewer than two rows,
///   or some sample has zero total distance to the batch.
/// - Any error from [`distance`] for the chosen metric.
///
/// # Example
///
/// ```
/// use eda_score::diversity::{diversity, Metric};
/// use ndarray::array;
///
/// let batch = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
/// let scores = diversity(&batch, Metric::Euclidean).unwrap();
/// assert!(scores[0] < scores[1]);
/// ```
pub fn diversity(data: &Array2<f64>, metric: Metric) -> Result<Array1<f64>, DiversityError> {
    if data.nrows() <= 1 {
        return Err(DiversityError::DegenerateBatch(format!(
            "diversity needs at least 2 samples, got {}",
            data.nrows()
        )));
    }

    let dist = distance(data, data, metric)?;
    let closeness = closeness(&dist)?;
    let total: f64 = closeness.sum();

    debug!(
        metric = %metric,
        samples = data.nrows(),
        total_closeness = total,
        "Computed diversity scores"
    );

    Ok(closeness.mapv(|c| total / (2.0 * c)))
}

/// Computes per-column closeness `1 / sum(dist[:, i])` of a distance matrix.
///
/// # Errors
///
/// Returns `DiversityError::DegenerateBatch` if a column sums to zero or
/// to a non-finite value.
pub fn closeness(dist: &Array2<f64>) -> Result<Array1<f64>, DiversityError> {
    let column_sums = dist.sum_axis(Axis(0));

    if let Some((index, sum)) = column_sums
        .iter()
        .enumerate()
        .find(|(_, sum)| **sum == 0.0 || !sum.is_finite())
    {
        return Err(DiversityError::DegenerateBatch(format!(
            "sample {} has total distance {} to the batch",
            index, sum
        )));
    }

    Ok(column_sums.mapv(|sum| 1.0 / sum))
}

/// Multiplies diversity scores element-wise with per-sample probabilities.
///
/// # Errors
///
/// Returns `DiversityError::ShapeMismatch` if the lengths differ.
pub fn fuse(
    diversity: &Array1<f64>,
    probability: &Array1<f64>,
) -> Result<Array1<f64>, DiversityError> {
    if diversity.len() != probability.len() {
        return Err(DiversityError::shape(
            "score fusion",
            format!("{} probabilities", diversity.len()),
            probability.len(),
        ));
    }

    Ok(diversity * probability)
}
