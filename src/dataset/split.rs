//! Shuffled train/test splitting.
//!
//! Splits follow the usual convention: the test side receives
//! `ceil(test_fraction * n)` rows and the train side the remainder. Row
//! order within each side is the shuffled order.

use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::DatasetError;

/// Splits the rows of `data` into shuffled `(train, test)` matrices.
///
/// # Arguments
///
/// * `data` - Rows to split.
/// * `test_fraction` - Share of rows for the test side, strictly in `(0, 1)`.
/// * `rng` - Random number generator driving the shuffle.
///
/// # Errors
///
/// Returns `DatasetError::InvalidSplit` if the fraction is out of range
/// or either side would be empty.
pub fn train_test_split(
    data: &Array2<f64>,
    test_fraction: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(Array2<f64>, Array2<f64>), DatasetError> {
    let n = data.nrows();
    let (train_count, test_count) = split_counts(n, test_fraction)?;

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let train = data.select(Axis(0), &indices[..train_count]);
    let test = data.select(Axis(0), &indices[train_count..train_count + test_count]);

    Ok((train, test))
}

/// Keeps a random `fraction` of the rows of `data`.
///
/// This is the test side of [`train_test_split`], used to sub-sample a
/// population down to a target size.
pub fn take_fraction(
    data: &Array2<f64>,
    fraction: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Array2<f64>, DatasetError> {
    let (_, kept) = train_test_split(data, fraction, rng)?;
    Ok(kept)
}

/// Returns `(train_count, test_count)` for `n` rows.
fn split_counts(n: usize, test_fraction: f64) -> Result<(usize, usize), DatasetError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DatasetError::InvalidSplit(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let test_count = (test_fraction * n as f64).ceil() as usize;
    let train_count = n.saturating_sub(test_count);

    if test_count == 0 || train_count == 0 {
        return Err(DatasetError::InvalidSplit(format!(
            "splitting {} rows with test fraction {} leaves an empty side",
            n, test_fraction
        )));
    }

    Ok((train_count, test_count))
}
