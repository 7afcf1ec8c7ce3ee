//! Gaussian Naive Bayes with fixed class priors.
//!
//! Each feature is modeled as an independent normal distribution per
//! class. Class priors are supplied by the caller rather than estimated
//! from label frequencies, so the same training set can be scored under
//! different prior beliefs.

use ndarray::{Array1, Array2, Axis};
use tracing::debug;

use crate::error::ClassifierError;

/// Default share of the largest feature variance added to every variance.
pub const DEFAULT_VAR_SMOOTHING: f64 = 1e-9;

/// Tolerance when checking that priors sum to one.
const PRIOR_SUM_TOLERANCE: f64 = 1e-8;

/// Per-class parameters learned by [`GaussianNaiveBayes::fit`].
#[derive(Debug, Clone)]
struct FittedModel {
    /// Feature means, one row per class.
    means: Array2<f64>,
    /// Smoothed feature variances, one row per class.
    variances: Array2<f64>,
}

/// Gaussian Naive Bayes classifier.
///
/// # Example
///
/// ```
/// use eda_score::classifier::GaussianNaiveBayes;
/// use ndarray::array;
///
/// let x = array![[0.0], [0.2], [5.0], [5.2]];
/// let labels = vec![0, 0, 1, 1];
///
/// let mut model = GaussianNaiveBayes::new(vec![0.5, 0.5]);
/// model.fit(&x, &labels).unwrap();
///
/// let proba = model.predict_proba(&array![[0.1], [5.1]]).unwrap();
/// assert!(proba[[0, 0]] > 0.99);
/// assert!(proba[[1, 1]] > 0.99);
/// ```
#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    priors: Vec<f64>,
    var_smoothing: f64,
    model: Option<FittedModel>,
}

impl GaussianNaiveBayes {
    /// Creates an unfitted classifier with one prior per class.
    ///
    /// The number of classes is `priors.len()`; labels passed to
    /// [`fit`](Self::fit) must lie in `0..priors.len()`.
    pub fn new(priors: Vec<f64>) -> Self {
        Self {
            priors,
            var_smoothing: DEFAULT_VAR_SMOOTHING,
            model: None,
        }
    }

    /// Sets the variance smoothing factor.
    pub fn with_var_smoothing(mut self, var_smoothing: f64) -> Self {
        self.var_smoothing = var_smoothing;
        self
    }

    /// Returns the class priors.
    pub fn priors(&self) -> &[f64] {
        &self.priors
    }

    /// Returns the number of classes.
    pub fn class_count(&self) -> usize {
        self.priors.len()
    }

    /// Returns true once [`fit`](Self::fit) has succeeded.
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Estimates per-class feature means and variances.
    ///
    /// # Errors
    ///
    /// - `ClassifierError::InvalidPriors` for empty, negative, non-finite
    ///   priors or priors not summing to one.
    /// - `ClassifierError::InvalidSmoothing` unless `var_smoothing` is
    ///   positive and finite.
    /// - `ClassifierError::ShapeMismatch` if `labels` and `x` disagree on
    ///   row count, or `x` has no columns.
    /// - `ClassifierError::LabelOutOfRange` for a label `>= class_count()`.
    /// - `ClassifierError::EmptyClass` if a class has no rows.
    pub fn fit(&mut self, x: &Array2<f64>, labels: &[usize]) -> Result<(), ClassifierError> {
        self.validate_parameters()?;

        if x.nrows() != labels.len() {
            return Err(ClassifierError::ShapeMismatch {
                context: "labels".to_string(),
                expected: x.nrows(),
                actual: labels.len(),
            });
        }
        if x.ncols() == 0 {
            return Err(ClassifierError::ShapeMismatch {
                context: "features".to_string(),
                expected: 1,
                actual: 0,
            });
        }

        let classes = self.class_count();
        if let Some(&label) = labels.iter().find(|&&label| label >= classes) {
            return Err(ClassifierError::LabelOutOfRange { label, classes });
        }

        let features = x.ncols();
        let mut means = Array2::<f64>::zeros((classes, features));
        let mut variances = Array2::<f64>::zeros((classes, features));

        for class in 0..classes {
            let rows: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, label)| **label == class)
                .map(|(row, _)| row)
                .collect();

            let class_x = x.select(Axis(0), &rows);
            let mean = class_x
                .mean_axis(Axis(0))
                .ok_or(ClassifierError::EmptyClass(class))?;
            means.row_mut(class).assign(&mean);
            variances
                .row_mut(class)
                .assign(&class_x.var_axis(Axis(0), 0.0));
        }

        let max_variance = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(*v));
        let mut epsilon = self.var_smoothing * max_variance;
        if epsilon <= 0.0 {
            // Every feature is constant; fall back to an absolute floor
            epsilon = self.var_smoothing;
        }
        variances.mapv_inplace(|v| v + epsilon);

        debug!(
            classes,
            features,
            rows = x.nrows(),
            epsilon,
            "Fitted Gaussian Naive Bayes"
        );

        self.model = Some(FittedModel { means, variances });
        Ok(())
    }

    /// Returns log posterior probabilities, `n x class_count()`.
    ///
    /// # Errors
    ///
    /// - `ClassifierError::NotFitted` before a successful fit.
    /// - `ClassifierError::ShapeMismatch` if the column count differs from
    ///   the training data.
    pub fn predict_log_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::NotFitted)?;
        let features = model.means.ncols();
        if x.ncols() != features {
            return Err(ClassifierError::ShapeMismatch {
                context: "features".to_string(),
                expected: features,
                actual: x.ncols(),
            });
        }

        let mut joint = self.joint_log_likelihood(model, x);

        for mut row in joint.rows_mut() {
            let normalizer = log_sum_exp(row.iter().copied());
            row.mapv_inplace(|v| v - normalizer);
        }

        Ok(joint)
    }

    /// Returns posterior probabilities, `n x class_count()`. Each row sums
    /// to one.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        Ok(self.predict_log_proba(x)?.mapv(f64::exp))
    }

    /// Returns the posterior probability of a single class for every row.
    ///
    /// # Errors
    ///
    /// `ClassifierError::LabelOutOfRange` if `class >= class_count()`, plus
    /// the errors of [`predict_proba`](Self::predict_proba).
    pub fn class_probability(
        &self,
        x: &Array2<f64>,
        class: usize,
    ) -> Result<Array1<f64>, ClassifierError> {
        if class >= self.class_count() {
            return Err(ClassifierError::LabelOutOfRange {
                label: class,
                classes: self.class_count(),
            });
        }
        Ok(self.predict_proba(x)?.column(class).to_owned())
    }

    fn joint_log_likelihood(&self, model: &FittedModel, x: &Array2<f64>) -> Array2<f64> {
        let classes = self.class_count();
        let mut joint = Array2::<f64>::zeros((x.nrows(), classes));

        for class in 0..classes {
            let means = model.means.row(class);
            let variances = model.variances.row(class);
            let log_norm: f64 = variances
                .iter()
                .map(|v| -0.5 * (2.0 * std::f64::consts::PI * v).ln())
                .sum();
            let log_prior = self.priors[class].ln();

            for (i, sample) in x.outer_iter().enumerate() {
                let mahalanobis: f64 = sample
                    .iter()
                    .zip(means.iter())
                    .zip(variances.iter())
                    .map(|((value, mean), variance)| (value - mean).powi(2) / variance)
                    .sum();
                joint[[i, class]] = log_prior + log_norm - 0.5 * mahalanobis;
            }
        }

        joint
    }

    fn validate_parameters(&self) -> Result<(), ClassifierError> {
        if self.priors.is_empty() {
            return Err(ClassifierError::InvalidPriors(
                "at least one class prior is required".to_string(),
            ));
        }
        if self.priors.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ClassifierError::InvalidPriors(format!(
                "priors must be finite and non-negative, got {:?}",
                self.priors
            )));
        }
        let sum: f64 = self.priors.iter().sum();
        if (sum - 1.0).abs() > PRIOR_SUM_TOLERANCE {
            return Err(ClassifierError::InvalidPriors(format!(
                "priors must sum to 1, got {}",
                sum
            )));
        }
        if !(self.var_smoothing > 0.0 && self.var_smoothing.is_finite()) {
            return Err(ClassifierError::InvalidSmoothing(self.var_smoothing));
        }
        Ok(())
    }
}

/// Numerically stable `ln(sum(exp(values)))`.
fn log_sum_exp(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.map(|v| (v - max).exp()).sum::<f64>().ln()
}
